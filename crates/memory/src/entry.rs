//! Memory entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryRole {
    User,
    Pet,
    System,
}

impl MemoryRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryRole::User => "user",
            MemoryRole::Pet => "pet",
            MemoryRole::System => "system",
        }
    }
}

/// Coarse category of an entry, derived from its tags unless the caller
/// says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Fact,
    Event,
    Emotion,
    Conversation,
}

/// A single remembered turn. Never edited after creation; pruning only
/// removes whole entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub role: MemoryRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// 1..=5
    pub importance: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    pub kind: MemoryKind,
    /// The interaction that produced this turn (tap, chat, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

/// Caller-supplied extras for [`crate::MemoryStore::add_memory`].
#[derive(Debug, Clone, Default)]
pub struct MemoryMetadata {
    /// Overrides the tag-derived kind.
    pub kind: Option<MemoryKind>,
    pub event_type: Option<String>,
    /// Appended after the extracted tags.
    pub extra_tags: Vec<String>,
}

impl MemoryMetadata {
    pub fn for_event(event_type: impl Into<String>) -> Self {
        Self {
            event_type: Some(event_type.into()),
            ..Self::default()
        }
    }
}
