//! Local replies used when the ladder says not to dispatch.
//!
//! Level 2 picks a phrase by event type and mood bucket, level 3 returns a
//! fixed reply by mood alone.

use petmind_core::{Emotion, PetAction, PetReply, ReplySource};
use rand::seq::IndexedRandom;

/// Mood bucket for template selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodBucket {
    High,
    Mid,
    Low,
}

impl MoodBucket {
    /// `> 60` high, `> 30` mid, else low.
    pub fn from_mood(mood: u32) -> Self {
        if mood > 60 {
            MoodBucket::High
        } else if mood > 30 {
            MoodBucket::Mid
        } else {
            MoodBucket::Low
        }
    }
}

struct TemplateSet {
    event_type: &'static str,
    high: &'static [&'static str],
    mid: &'static [&'static str],
    low: &'static [&'static str],
}

impl TemplateSet {
    fn phrases(&self, bucket: MoodBucket) -> &'static [&'static str] {
        match bucket {
            MoodBucket::High => self.high,
            MoodBucket::Mid => self.mid,
            MoodBucket::Low => self.low,
        }
    }
}

const DEFAULT_SET: TemplateSet = TemplateSet {
    event_type: "default",
    high: &["嘿嘿~", "💕"],
    mid: &["嗯？"],
    low: &["..."],
};

const TEMPLATES: &[TemplateSet] = &[
    TemplateSet {
        event_type: "TAP",
        high: &["嘿嘿~", "怎么啦？", "在呢！", "想我了？💕"],
        mid: &["干嘛？", "嗯？", "有事？"],
        low: &["别戳了...", "心情不好...", "哼！💢"],
    },
    TemplateSet {
        event_type: "DOUBLE_TAP",
        high: &["双击打开菜单~", "来玩吗？🎮"],
        mid: &["要做什么？"],
        low: &["...有事？"],
    },
    TemplateSet {
        event_type: "LONG_PRESS",
        high: &["别按太久啦~", "痒痒的！😆"],
        mid: &["够了够了", "松开啦"],
        low: &["...松手", "不舒服"],
    },
    TemplateSet {
        event_type: "THROW",
        high: &["呜哇！别甩我！", "好晕～", "我会飞！🌪️"],
        mid: &["喂！", "小心点！"],
        low: &["...你是不是讨厌我", "😢"],
    },
    TemplateSet {
        event_type: "SWIPE",
        high: &["嘿！躲开～", "好快！⚡"],
        mid: &["干嘛滑我？"],
        low: &["别闹..."],
    },
    TemplateSet {
        event_type: "GREETING",
        high: &["早上好！今天也要加油哦！☀️", "嗨～想我了吗？"],
        mid: &["嗯...早", "又见面了"],
        low: &["...早"],
    },
    TemplateSet {
        event_type: "STUDY_REWARD",
        high: &["太棒了！继续保持！🎉", "好样的！奖励一个摸头～"],
        mid: &["还不错", "继续吧"],
        low: &["终于学了点..."],
    },
    TemplateSet {
        event_type: "FISH_WARNING",
        high: &["适当休息一下吧～", "玩够了吗？"],
        mid: &["该学习了...", "少玩一会儿"],
        low: &["又在摸鱼！💢", "去学习！"],
    },
];

/// Level-2 reply: a random phrase for `(event_type, mood bucket)`.
/// Unknown event types use the default set.
pub fn template_reply(event_type: &str, mood: u32) -> PetReply {
    let bucket = MoodBucket::from_mood(mood);
    let set = TEMPLATES
        .iter()
        .find(|set| set.event_type == event_type)
        .unwrap_or(&DEFAULT_SET);
    let text = set
        .phrases(bucket)
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or("...");

    let (emotion, action, bubble_color) = match bucket {
        MoodBucket::High => (Emotion::Happy, PetAction::Jump, "#4CAF50"),
        MoodBucket::Mid => (Emotion::Neutral, PetAction::Idle, "#667eea"),
        MoodBucket::Low => (Emotion::Sad, PetAction::Idle, "#F44336"),
    };

    PetReply {
        text: text.to_string(),
        emotion,
        action,
        duration_ms: 1000,
        bubble_color: bubble_color.to_string(),
        source: ReplySource::Template,
    }
}

/// Level-3 reply: fixed by mood alone.
pub fn static_reply(mood: u32) -> PetReply {
    let (text, emotion, action, duration_ms, bubble_color) = if mood > 70 {
        ("嘿嘿~", Emotion::Happy, PetAction::Jump, 1000, "#4CAF50")
    } else if mood > 40 {
        ("...", Emotion::Neutral, PetAction::Idle, 800, "#9E9E9E")
    } else if mood > 20 {
        ("呜...", Emotion::Sad, PetAction::Hide, 1500, "#2196F3")
    } else {
        ("哼！", Emotion::Angry, PetAction::Shake, 1200, "#F44336")
    };

    PetReply {
        text: text.to_string(),
        emotion,
        action,
        duration_ms,
        bubble_color: bubble_color.to_string(),
        source: ReplySource::Static,
    }
}
