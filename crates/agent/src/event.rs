//! Inbound interaction events.

use petmind_behavior::InteractionKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A touch gesture recognised by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gesture {
    Tap,
    DoubleTap,
    LongPress,
    Throw,
    Swipe,
}

impl Gesture {
    pub const ALL: [Gesture; 5] = [
        Gesture::Tap,
        Gesture::DoubleTap,
        Gesture::LongPress,
        Gesture::Throw,
        Gesture::Swipe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::Tap => "TAP",
            Gesture::DoubleTap => "DOUBLE_TAP",
            Gesture::LongPress => "LONG_PRESS",
            Gesture::Throw => "THROW",
            Gesture::Swipe => "SWIPE",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Gesture::Tap => "轻轻戳了你一下",
            Gesture::DoubleTap => "双击了你",
            Gesture::LongPress => "长按着你",
            Gesture::Throw => "把你甩了出去",
            Gesture::Swipe => "从你身上划过",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gesture {
    type Err = String;

    /// Accepts `tap`, `double_tap`, `double-tap`, `DOUBLE_TAP`, ...
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Gesture::ALL
            .into_iter()
            .find(|g| g.as_str() == normalized)
            .ok_or_else(|| {
                format!("unknown gesture '{s}' (expected tap, double_tap, long_press, throw or swipe)")
            })
    }
}

/// Something the pet should respond to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractionEvent {
    Gesture { gesture: Gesture },
    Chat { message: String },
    Greeting,
    StudyReward { minutes: u32 },
    FishWarning { app: String },
}

impl InteractionEvent {
    pub fn gesture(gesture: Gesture) -> Self {
        InteractionEvent::Gesture { gesture }
    }

    pub fn chat(message: impl Into<String>) -> Self {
        InteractionEvent::Chat {
            message: message.into(),
        }
    }

    /// Key used for local template selection.
    pub fn event_type(&self) -> &'static str {
        match self {
            InteractionEvent::Gesture { gesture } => gesture.as_str(),
            InteractionEvent::Chat { .. } => "CHAT",
            InteractionEvent::Greeting => "GREETING",
            InteractionEvent::StudyReward { .. } => "STUDY_REWARD",
            InteractionEvent::FishWarning { .. } => "FISH_WARNING",
        }
    }

    /// Short description of what the user did, used by the compact and
    /// minimal prompts.
    pub fn action(&self) -> String {
        match self {
            InteractionEvent::Gesture { gesture } => gesture.description().to_string(),
            InteractionEvent::Chat { message } => format!("说：{message}"),
            InteractionEvent::Greeting => "打开了应用".to_string(),
            InteractionEvent::StudyReward { minutes } => format!("刚刚学习了{minutes}分钟"),
            InteractionEvent::FishWarning { app } => format!("正在用{app}摸鱼"),
        }
    }

    /// The user turn sent to the dispatcher and written to memory.
    pub fn user_message(&self) -> String {
        match self {
            InteractionEvent::Gesture { gesture } => {
                format!("[手势: {}] 用户{}", gesture.as_str(), gesture.description())
            }
            InteractionEvent::Chat { message } => message.clone(),
            other => format!("用户{}", other.action()),
        }
    }

    /// Whether the event counts as the user interacting with the pet, and
    /// in what way.
    pub fn interaction_kind(&self) -> Option<InteractionKind> {
        match self {
            InteractionEvent::Gesture {
                gesture: Gesture::Throw | Gesture::Swipe,
            } => Some(InteractionKind::Playing),
            InteractionEvent::Gesture { .. } => Some(InteractionKind::BeingTouched),
            InteractionEvent::Chat { .. } => Some(InteractionKind::Chatting),
            _ => None,
        }
    }

    /// Memory tag recorded with the user turn.
    pub fn memory_event_type(&self) -> Option<&'static str> {
        match self {
            InteractionEvent::Chat { .. } => None,
            other => Some(other.event_type()),
        }
    }
}
