//! Content patterns and the rules built on them: importance scoring, tag
//! extraction and kind classification.

use regex_lite::Regex;
use std::sync::LazyLock;

use crate::entry::{MemoryKind, MemoryRole};

pub const TAG_PERSONAL_INFO: &str = "personal_info";
pub const TAG_PET_NAMING: &str = "pet_naming";
pub const TAG_EMOTION: &str = "emotion";
pub const TAG_STUDY: &str = "study";
pub const TAG_ACHIEVEMENT: &str = "achievement";

pub const MIN_IMPORTANCE: u8 = 1;
pub const MAX_IMPORTANCE: u8 = 5;

const PERSONAL_INFO_SCORE: u8 = 5;
const EMOTIONAL_SCORE: u8 = 4;
const LONG_MESSAGE_SCORE: u8 = 3;
const QUESTION_SCORE: u8 = 2;

/// Messages longer than this many characters count as "long".
const LONG_MESSAGE_CHARS: usize = 50;

// A captured name stops at whitespace or punctuation.
const NAME_CHAR: &str = r"[^\s，。,.!！?？、~～:：;；]";

fn compile(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("memory pattern is valid"))
        .collect()
}

pub(crate) static USER_NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        format!("我叫({NAME_CHAR}{{1,8}})"),
        format!("我是({NAME_CHAR}{{1,8}})"),
        format!("我的名字是({NAME_CHAR}{{1,8}})"),
        format!("叫我({NAME_CHAR}{{1,8}})"),
        r"(?i)\bmy name is ([a-z][a-z'-]{0,15})".to_string(),
        r"(?i)\bcall me ([a-z][a-z'-]{0,15})".to_string(),
    ])
});

pub(crate) static PET_NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        format!("给你取名(?:叫)?({NAME_CHAR}{{1,10}})"),
        format!("你叫({NAME_CHAR}{{1,10}})"),
        format!("你的名字是({NAME_CHAR}{{1,10}})"),
        r"(?i)\byour name is ([a-z][a-z'-]{0,15})".to_string(),
    ])
});

pub(crate) static FAVORITE_APP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        "我喜欢用(.{2,15}?)学习".to_string(),
        "我在用(.{2,15}?)背单词".to_string(),
    ])
});

pub(crate) static MOOD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        "我(很开心|开心|高兴|快乐)".to_string(),
        "我(很难过|难过|伤心|不开心)".to_string(),
        "我(很累|累了|好累)".to_string(),
        "我(很烦|烦躁|心烦)".to_string(),
        r"(?i)\bi(?:'m| am) (?:so |very )?(happy|sad|tired|upset|stressed)\b".to_string(),
    ])
});

const STUDY_KEYWORDS: [&str; 3] = ["学习", "背单词", "study"];
const ACHIEVEMENT_KEYWORDS: [&str; 4] = ["成就", "解锁", "achievement", "unlocked"];

fn any_match(patterns: &[Regex], content: &str) -> bool {
    patterns.iter().any(|p| p.is_match(content))
}

fn contains_any(content: &str, keywords: &[&str]) -> bool {
    let lower = content.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

/// Score how much an entry matters, 1..=5.
///
/// Base 1, plus 1 for user turns. Self-identification jumps straight to 5;
/// emotion, length and questions raise the score to at least 4, 3 and 2.
pub fn calculate_importance(role: MemoryRole, content: &str) -> u8 {
    let mut score = MIN_IMPORTANCE;
    if role == MemoryRole::User {
        score += 1;
    }

    if any_match(&USER_NAME_PATTERNS, content) {
        return PERSONAL_INFO_SCORE;
    }
    if any_match(&MOOD_PATTERNS, content) {
        score = score.max(EMOTIONAL_SCORE);
    }
    if content.chars().count() > LONG_MESSAGE_CHARS {
        score = score.max(LONG_MESSAGE_SCORE);
    }
    if content.contains('?') || content.contains('？') {
        score = score.max(QUESTION_SCORE);
    }

    score.clamp(MIN_IMPORTANCE, MAX_IMPORTANCE)
}

/// Tags for an entry, in a fixed order, without duplicates.
pub fn extract_tags(content: &str) -> Vec<String> {
    let mut tags = Vec::new();
    if any_match(&USER_NAME_PATTERNS, content) {
        tags.push(TAG_PERSONAL_INFO.to_string());
    }
    if any_match(&PET_NAME_PATTERNS, content) {
        tags.push(TAG_PET_NAMING.to_string());
    }
    if any_match(&MOOD_PATTERNS, content) {
        tags.push(TAG_EMOTION.to_string());
    }
    if contains_any(content, &STUDY_KEYWORDS) {
        tags.push(TAG_STUDY.to_string());
    }
    if contains_any(content, &ACHIEVEMENT_KEYWORDS) {
        tags.push(TAG_ACHIEVEMENT.to_string());
    }
    tags
}

/// Derive the kind from tags: identity facts first, then emotion, then
/// study/achievement events.
pub fn classify_kind(tags: &[String]) -> MemoryKind {
    let has = |t: &str| tags.iter().any(|tag| tag == t);
    if has(TAG_PERSONAL_INFO) || has(TAG_PET_NAMING) {
        MemoryKind::Fact
    } else if has(TAG_EMOTION) {
        MemoryKind::Emotion
    } else if has(TAG_ACHIEVEMENT) || has(TAG_STUDY) {
        MemoryKind::Event
    } else {
        MemoryKind::Conversation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_identification_is_maximal() {
        assert_eq!(calculate_importance(MemoryRole::User, "我叫小明"), 5);
        assert_eq!(calculate_importance(MemoryRole::Pet, "叫我阿花吧"), 5);
        assert_eq!(calculate_importance(MemoryRole::User, "Hi, my name is Alice"), 5);
    }

    #[test]
    fn emotion_long_and_question_escalate() {
        assert_eq!(calculate_importance(MemoryRole::User, "今天我好累"), 4);
        assert_eq!(calculate_importance(MemoryRole::Pet, &"长".repeat(51)), 3);
        assert_eq!(calculate_importance(MemoryRole::Pet, &"长".repeat(50)), 1);
        assert_eq!(calculate_importance(MemoryRole::Pet, "在吗？"), 2);
        assert_eq!(calculate_importance(MemoryRole::User, "hello"), 2);
        assert_eq!(calculate_importance(MemoryRole::System, "tick"), 1);
    }

    #[test]
    fn importance_stays_in_range() {
        let samples = [
            "",
            "?",
            "我很开心？我叫小红",
            "I'm so happy today, can you tell?",
            &"x".repeat(500),
        ];
        for role in [MemoryRole::User, MemoryRole::Pet, MemoryRole::System] {
            for s in samples {
                let i = calculate_importance(role, s);
                assert!((MIN_IMPORTANCE..=MAX_IMPORTANCE).contains(&i));
            }
        }
    }

    #[test]
    fn tags_follow_patterns() {
        assert_eq!(extract_tags("我叫小明"), vec![TAG_PERSONAL_INFO]);
        assert_eq!(extract_tags("给你取名团子"), vec![TAG_PET_NAMING]);
        assert_eq!(
            extract_tags("我很开心，解锁了学习成就"),
            vec![TAG_EMOTION, TAG_STUDY, TAG_ACHIEVEMENT]
        );
        assert!(extract_tags("今天天气不错").is_empty());
    }

    #[test]
    fn kind_priority() {
        let tags = |ts: &[&str]| ts.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        assert_eq!(
            classify_kind(&tags(&[TAG_EMOTION, TAG_PERSONAL_INFO])),
            MemoryKind::Fact
        );
        assert_eq!(classify_kind(&tags(&[TAG_STUDY, TAG_EMOTION])), MemoryKind::Emotion);
        assert_eq!(classify_kind(&tags(&[TAG_ACHIEVEMENT])), MemoryKind::Event);
        assert_eq!(classify_kind(&[]), MemoryKind::Conversation);
    }
}
