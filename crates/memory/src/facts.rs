//! The fact sheet: a small set of durable facts pulled out of user turns.

use chrono::NaiveDate;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::importance::{
    FAVORITE_APP_PATTERNS, MOOD_PATTERNS, PET_NAME_PATTERNS, USER_NAME_PATTERNS,
};

const MAX_USER_NAME_CHARS: usize = 8;
const MAX_PET_NAME_CHARS: usize = 10;
const MAX_APP_NAME_CHARS: usize = 15;

/// Facts known about the user and the pet. Only ever holds values that
/// were actually said.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactSheet {
    pub user_name: Option<String>,
    pub pet_name: Option<String>,
    pub favorite_app: Option<String>,
    pub last_mood: Option<String>,
    pub first_meet_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_chats: u64,
}

/// A fact learned from a single turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedFact {
    UserName(String),
    PetName(String),
    FavoriteApp(String),
    Mood(String),
}

impl ExtractedFact {
    /// The knowledge triple this fact implies, if any.
    pub fn as_triple(&self) -> Option<(&'static str, &'static str, &str)> {
        match self {
            ExtractedFact::UserName(name) => Some(("user", "named", name)),
            ExtractedFact::PetName(name) => Some(("pet", "named", name)),
            ExtractedFact::FavoriteApp(app) => Some(("user", "studies_with", app)),
            ExtractedFact::Mood(_) => None,
        }
    }
}

impl FactSheet {
    /// Number of facts currently known.
    pub fn known_count(&self) -> usize {
        [
            self.user_name.is_some(),
            self.pet_name.is_some(),
            self.favorite_app.is_some(),
            self.last_mood.is_some(),
            self.first_meet_date.is_some(),
        ]
        .into_iter()
        .filter(|known| *known)
        .count()
    }

    /// One-line summary for status displays.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(name) = &self.user_name {
            parts.push(format!("用户名: {name}"));
        }
        if let Some(name) = &self.pet_name {
            parts.push(format!("宠物名: {name}"));
        }
        if let Some(app) = &self.favorite_app {
            parts.push(format!("常用学习App: {app}"));
        }
        if self.total_chats > 0 {
            parts.push(format!("累计对话: {}次", self.total_chats));
        }
        if parts.is_empty() {
            "暂无记忆".to_string()
        } else {
            parts.join(", ")
        }
    }

    /// Pull facts out of a user turn and apply them. Returns what was learned.
    ///
    /// Also counts the turn and records the first-meet date once.
    pub fn absorb(&mut self, content: &str, today: NaiveDate) -> Vec<ExtractedFact> {
        let learned = extract_facts(content);
        for fact in &learned {
            match fact {
                ExtractedFact::UserName(name) => self.user_name = Some(name.clone()),
                ExtractedFact::PetName(name) => self.pet_name = Some(name.clone()),
                ExtractedFact::FavoriteApp(app) => self.favorite_app = Some(app.clone()),
                ExtractedFact::Mood(mood) => self.last_mood = Some(mood.clone()),
            }
        }
        self.total_chats += 1;
        if self.first_meet_date.is_none() {
            self.first_meet_date = Some(today);
        }
        learned
    }
}

fn first_capture(patterns: &[Regex], content: &str, max_chars: usize) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        let captured = pattern.captures(content)?.get(1)?.as_str();
        let name: String = captured
            .trim()
            .chars()
            .filter(|c| !matches!(c, '。' | '，' | ',' | '.'))
            .collect();
        let len = name.chars().count();
        (len > 0 && len <= max_chars).then_some(name)
    })
}

fn is_question(content: &str) -> bool {
    content.contains('?') || content.contains('？') || content.contains("什么")
}

/// Facts stated in `content`, at most one per kind.
///
/// Naming patterns are ignored in questions so "你叫什么名字？" does not
/// rename the pet.
pub fn extract_facts(content: &str) -> Vec<ExtractedFact> {
    let mut facts = Vec::new();
    let question = is_question(content);

    if !question {
        if let Some(name) = first_capture(&USER_NAME_PATTERNS, content, MAX_USER_NAME_CHARS) {
            facts.push(ExtractedFact::UserName(name));
        }
        if let Some(name) = first_capture(&PET_NAME_PATTERNS, content, MAX_PET_NAME_CHARS) {
            facts.push(ExtractedFact::PetName(name));
        }
    }
    if let Some(app) = first_capture(&FAVORITE_APP_PATTERNS, content, MAX_APP_NAME_CHARS) {
        facts.push(ExtractedFact::FavoriteApp(app));
    }
    if let Some(mood) = first_capture(&MOOD_PATTERNS, content, MAX_APP_NAME_CHARS) {
        facts.push(ExtractedFact::Mood(mood));
    }
    facts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn user_name_stops_at_punctuation() {
        assert_eq!(
            extract_facts("我叫小明，很高兴认识你"),
            vec![ExtractedFact::UserName("小明".into())]
        );
        assert_eq!(
            extract_facts("call me Bob."),
            vec![ExtractedFact::UserName("Bob".into())]
        );
    }

    #[test]
    fn pet_name_and_app() {
        assert_eq!(
            extract_facts("给你取名团子"),
            vec![ExtractedFact::PetName("团子".into())]
        );
        assert_eq!(
            extract_facts("我在用墨墨背单词"),
            vec![ExtractedFact::FavoriteApp("墨墨".into())]
        );
    }

    #[test]
    fn questions_do_not_rename() {
        assert!(extract_facts("你叫什么名字？").is_empty());
        assert!(extract_facts("what is your name?").is_empty());
    }

    #[test]
    fn absorb_counts_and_dates_once() {
        let mut sheet = FactSheet::default();
        sheet.absorb("我叫小明", day());
        let later = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let learned = sheet.absorb("我好累", later);

        assert_eq!(sheet.user_name.as_deref(), Some("小明"));
        assert_eq!(sheet.last_mood.as_deref(), Some("好累"));
        assert_eq!(sheet.first_meet_date, Some(day()));
        assert_eq!(sheet.total_chats, 2);
        assert_eq!(learned, vec![ExtractedFact::Mood("好累".into())]);
        assert_eq!(sheet.known_count(), 3);
    }

    #[test]
    fn triples_for_identity_facts_only() {
        assert_eq!(
            ExtractedFact::PetName("团子".into()).as_triple(),
            Some(("pet", "named", "团子"))
        );
        assert_eq!(ExtractedFact::Mood("开心".into()).as_triple(), None);
    }

    #[test]
    fn summary_reads_known_facts() {
        let mut sheet = FactSheet::default();
        assert_eq!(sheet.summary(), "暂无记忆");
        sheet.absorb("我叫小明", day());
        assert!(sheet.summary().contains("小明"));
        assert!(sheet.summary().contains("累计对话: 1次"));
    }
}
