//! Turning raw dispatcher text into a [`PetReply`].
//!
//! The structured path looks for a `{...}` block and validates every field.
//! When that fails the heuristic path keeps the text and infers emotion and
//! action from keywords. A parse failure is not a dispatcher failure: the
//! dispatcher did answer.

use petmind_config::ReplyConfig;
use petmind_core::reply::{DEFAULT_DURATION_MS, MAX_DURATION_MS, MIN_DURATION_MS};
use petmind_core::{Emotion, PetAction, PetReply, ReplySource};
use regex_lite::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

static STRUCTURED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").expect("structured block pattern is valid"));

static HAPPY_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"开心|嘿嘿|哈哈|好耶|棒").expect("happy pattern is valid"));

static ANGRY_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"生气|愤怒|讨厌|💢").expect("angry pattern is valid"));

static SAD_WORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"伤心|难过|呜|😢").expect("sad pattern is valid"));

/// Why the structured path gave up.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no structured block in reply")]
    NoStructuredBlock,

    #[error("structured block is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct RawReply {
    #[serde(default)]
    text: Option<serde_json::Value>,
    #[serde(default)]
    emotion: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    duration: Option<serde_json::Value>,
    #[serde(default)]
    bubble_color: Option<String>,
}

pub struct ReplyParser {
    max_text_chars: usize,
    default_color: String,
}

impl ReplyParser {
    pub fn new(config: &ReplyConfig) -> Self {
        Self {
            max_text_chars: config.max_text_chars,
            default_color: config.default_bubble_color.clone(),
        }
    }

    /// Structured parse, falling back to keyword inference. Never fails.
    pub fn parse(&self, raw: &str) -> PetReply {
        match self.parse_structured(raw) {
            Ok(reply) => reply,
            Err(e) => {
                debug!(error = %e, "Structured reply unusable, inferring from text");
                self.parse_heuristic(raw)
            }
        }
    }

    pub fn parse_structured(&self, raw: &str) -> Result<PetReply, ParseError> {
        let block = STRUCTURED_BLOCK
            .find(raw)
            .ok_or(ParseError::NoStructuredBlock)?;
        let parsed: RawReply = serde_json::from_str(block.as_str())?;

        let text = match parsed.text {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => "...".to_string(),
        };

        Ok(PetReply {
            text: self.truncate(text.trim()),
            emotion: parsed
                .emotion
                .as_deref()
                .and_then(Emotion::parse)
                .unwrap_or(Emotion::Neutral),
            action: parsed
                .action
                .as_deref()
                .and_then(PetAction::parse)
                .unwrap_or(PetAction::Idle),
            duration_ms: clamp_duration(parsed.duration.as_ref()),
            bubble_color: parsed
                .bubble_color
                .filter(|c| PetReply::is_valid_color(c))
                .unwrap_or_else(|| self.default_color.clone()),
            source: ReplySource::Dispatcher,
        })
    }

    pub fn parse_heuristic(&self, raw: &str) -> PetReply {
        let (emotion, action, color) = if HAPPY_WORDS.is_match(raw) {
            (Emotion::Happy, PetAction::Jump, "#4CAF50")
        } else if ANGRY_WORDS.is_match(raw) {
            (Emotion::Angry, PetAction::Shake, "#F44336")
        } else if SAD_WORDS.is_match(raw) {
            (Emotion::Sad, PetAction::Hide, "#2196F3")
        } else {
            (Emotion::Neutral, PetAction::Idle, self.default_color.as_str())
        };

        let trimmed = raw.trim();
        let text = if trimmed.is_empty() {
            "...".to_string()
        } else {
            self.truncate(trimmed)
        };

        PetReply {
            text,
            emotion,
            action,
            duration_ms: DEFAULT_DURATION_MS,
            bubble_color: color.to_string(),
            source: ReplySource::Heuristic,
        }
    }

    fn truncate(&self, text: &str) -> String {
        text.chars().take(self.max_text_chars).collect()
    }
}

/// Numbers and numeric strings are clamped into range; anything else,
/// including zero, gets the default.
fn clamp_duration(value: Option<&serde_json::Value>) -> u32 {
    let ms = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match ms {
        Some(ms) if ms.is_finite() && ms != 0.0 => {
            ms.clamp(MIN_DURATION_MS as f64, MAX_DURATION_MS as f64) as u32
        }
        _ => DEFAULT_DURATION_MS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ReplyParser {
        ReplyParser::new(&ReplyConfig::default())
    }

    #[test]
    fn structured_reply_inside_chatter() {
        let raw = r##"好的！{"text":"嘿嘿，再摸一下~","emotion":"happy","action":"jump","duration":800,"bubble_color":"#4CAF50"} 以上"##;
        let reply = parser().parse(raw);
        assert_eq!(reply.text, "嘿嘿，再摸一下~");
        assert_eq!(reply.emotion, Emotion::Happy);
        assert_eq!(reply.action, PetAction::Jump);
        assert_eq!(reply.duration_ms, 800);
        assert_eq!(reply.bubble_color, "#4CAF50");
        assert_eq!(reply.source, ReplySource::Dispatcher);
    }

    #[test]
    fn invalid_fields_are_replaced() {
        let raw = r#"{"text":"hi","emotion":"furious","action":"dance","duration":99999,"bubble_color":"red"}"#;
        let reply = parser().parse(raw);
        assert_eq!(reply.emotion, Emotion::Neutral);
        assert_eq!(reply.action, PetAction::Idle);
        assert_eq!(reply.duration_ms, MAX_DURATION_MS);
        assert_eq!(reply.bubble_color, "#667eea");
    }

    #[test]
    fn duration_edge_cases() {
        let p = parser();
        let d = |raw: &str| p.parse(raw).duration_ms;
        assert_eq!(d(r#"{"text":"a","duration":100}"#), MIN_DURATION_MS);
        assert_eq!(d(r#"{"text":"a","duration":"1500"}"#), 1500);
        assert_eq!(d(r#"{"text":"a","duration":0}"#), DEFAULT_DURATION_MS);
        assert_eq!(d(r#"{"text":"a"}"#), DEFAULT_DURATION_MS);
    }

    #[test]
    fn long_text_is_truncated() {
        let raw = format!(r#"{{"text":"{}"}}"#, "好".repeat(80));
        let reply = parser().parse(&raw);
        assert_eq!(reply.text.chars().count(), 50);
    }

    #[test]
    fn missing_text_becomes_ellipsis() {
        let reply = parser().parse(r#"{"emotion":"shy"}"#);
        assert_eq!(reply.text, "...");
        assert_eq!(reply.emotion, Emotion::Shy);
    }

    #[test]
    fn plain_text_falls_back_to_keywords() {
        let p = parser();

        let happy = p.parse("哈哈，今天也要加油");
        assert_eq!(happy.source, ReplySource::Heuristic);
        assert_eq!(happy.emotion, Emotion::Happy);
        assert_eq!(happy.action, PetAction::Jump);
        assert_eq!(happy.text, "哈哈，今天也要加油");

        let angry = p.parse("又在摸鱼，讨厌💢");
        assert_eq!(angry.emotion, Emotion::Angry);
        assert_eq!(angry.action, PetAction::Shake);

        let sad = p.parse("呜呜");
        assert_eq!(sad.emotion, Emotion::Sad);
        assert_eq!(sad.bubble_color, "#2196F3");

        let plain = p.parse("ok");
        assert_eq!(plain.emotion, Emotion::Neutral);
        assert_eq!(plain.bubble_color, "#667eea");
    }

    #[test]
    fn broken_json_uses_heuristic_on_whole_text() {
        let reply = parser().parse(r#"{"text": "开心", "emotion": }"#);
        assert_eq!(reply.source, ReplySource::Heuristic);
        assert_eq!(reply.emotion, Emotion::Happy);
        assert!(matches!(
            parser().parse_structured("{oops}"),
            Err(ParseError::InvalidJson(_))
        ));
        assert!(matches!(
            parser().parse_structured("no braces"),
            Err(ParseError::NoStructuredBlock)
        ));
    }

    #[test]
    fn empty_reply_still_renders() {
        let reply = parser().parse("   ");
        assert_eq!(reply.text, "...");
        assert_eq!(reply.duration_ms, DEFAULT_DURATION_MS);
    }
}
