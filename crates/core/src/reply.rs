//! The structured reply schema shared by the dispatcher contract, the local
//! fallbacks and the presentation sink.

use serde::{Deserialize, Serialize};

/// Shortest animation the sink accepts, in milliseconds.
pub const MIN_DURATION_MS: u32 = 500;
/// Longest animation the sink accepts, in milliseconds.
pub const MAX_DURATION_MS: u32 = 3000;
/// Used when a reply carries no usable duration.
pub const DEFAULT_DURATION_MS: u32 = 1000;

/// Facial expression requested by a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Surprised,
    Sleepy,
    Proud,
    Shy,
    Excited,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 9] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Surprised,
        Emotion::Sleepy,
        Emotion::Proud,
        Emotion::Shy,
        Emotion::Excited,
        Emotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Surprised => "surprised",
            Emotion::Sleepy => "sleepy",
            Emotion::Proud => "proud",
            Emotion::Shy => "shy",
            Emotion::Excited => "excited",
            Emotion::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

/// Body animation requested by a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PetAction {
    Idle,
    Jump,
    Wave,
    Hide,
    Spin,
    Shake,
    Nod,
    Sleep,
    Celebrate,
    Scared,
    Shy,
}

impl PetAction {
    pub const ALL: [PetAction; 11] = [
        PetAction::Idle,
        PetAction::Jump,
        PetAction::Wave,
        PetAction::Hide,
        PetAction::Spin,
        PetAction::Shake,
        PetAction::Nod,
        PetAction::Sleep,
        PetAction::Celebrate,
        PetAction::Scared,
        PetAction::Shy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PetAction::Idle => "idle",
            PetAction::Jump => "jump",
            PetAction::Wave => "wave",
            PetAction::Hide => "hide",
            PetAction::Spin => "spin",
            PetAction::Shake => "shake",
            PetAction::Nod => "nod",
            PetAction::Sleep => "sleep",
            PetAction::Celebrate => "celebrate",
            PetAction::Scared => "scared",
            PetAction::Shy => "shy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

/// Where a reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    /// Structured block parsed from the dispatcher reply.
    Dispatcher,
    /// Dispatcher replied but the structured block was unusable; fields inferred from keywords.
    Heuristic,
    /// Local template keyed by event type and mood.
    Template,
    /// Static canned text keyed by mood.
    Static,
}

impl ReplySource {
    pub fn is_degraded(&self) -> bool {
        matches!(self, ReplySource::Template | ReplySource::Static)
    }
}

/// A validated reply, ready for the presentation sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetReply {
    pub text: String,
    pub emotion: Emotion,
    pub action: PetAction,
    pub duration_ms: u32,
    pub bubble_color: String,
    pub source: ReplySource,
}

impl PetReply {
    /// Whether `color` is a strict `#RRGGBB` hex colour.
    pub fn is_valid_color(color: &str) -> bool {
        let bytes = color.as_bytes();
        bytes.len() == 7 && bytes[0] == b'#' && bytes[1..].iter().all(u8::is_ascii_hexdigit)
    }
}

/// The rendering collaborator. Receives every reply; returns nothing.
pub trait PresentationSink: Send + Sync {
    fn present(&self, reply: &PetReply);
}

/// A sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl PresentationSink for NullSink {
    fn present(&self, _reply: &PetReply) {}
}
