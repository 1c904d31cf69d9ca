//! Dispatcher trait: the abstraction over the external text-generation service.
//!
//! A Dispatcher takes an assembled [`PromptBundle`] and returns the raw reply
//! text. It knows nothing about the degradation ladder, reply parsing or
//! memory; those live in the agent crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// The role of a turn in the dispatched history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::System => "system",
        }
    }
}

/// A single history turn sent alongside the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Everything the dispatcher needs for one request. Built per event, never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptBundle {
    /// Persona, context sections and output-format instruction.
    pub system_prompt: String,

    /// The current user turn.
    pub user_message: String,

    /// Prior turns, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<ChatTurn>,

    /// Rough token estimate (see the assembler's heuristic).
    #[serde(default)]
    pub estimated_tokens: usize,
}

/// The core Dispatcher trait.
///
/// Implementations may reject with any [`DispatchError`]; the ladder
/// classifies it via [`DispatchError::classify`].
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// A human-readable name (e.g. "openai_compat", "mock").
    fn name(&self) -> &str;

    /// Send one request and return the raw reply text.
    async fn send(&self, bundle: &PromptBundle) -> Result<String, DispatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_turn_serializes_lowercase_role() {
        let turn = ChatTurn::assistant("hi");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"assistant\""));
    }

    #[test]
    fn bundle_skips_empty_history() {
        let bundle = PromptBundle {
            system_prompt: "sys".into(),
            user_message: "hello".into(),
            history: vec![],
            estimated_tokens: 4,
        };
        let json = serde_json::to_string(&bundle).unwrap();
        assert!(!json.contains("history"));
    }
}
