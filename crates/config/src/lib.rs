//! Configuration loading, validation, and management for PetMind.
//!
//! Loads configuration from `~/.petmind/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use petmind_core::PetReply;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.petmind/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// External text-generation service
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Degradation ladder timings and thresholds
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Conversational memory and retrieval
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Behavior tick and sub-state thresholds
    #[serde(default)]
    pub behavior: BehaviorConfig,

    /// Sleep cycle
    #[serde(default)]
    pub sleep: SleepConfig,

    /// Reply validation
    #[serde(default)]
    pub reply: ReplyConfig,

    /// Pet persona
    #[serde(default)]
    pub persona: PersonaConfig,

    /// Where persisted records live
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// OpenAI-compatible base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// At most this many history turns are sent
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    /// Total character budget for system prompt + history + user turn
    #[serde(default = "default_char_budget")]
    pub char_budget: usize,

    /// Each history message is cut to this many characters
    #[serde(default = "default_message_char_limit")]
    pub message_char_limit: usize,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    200
}
fn default_history_turns() -> usize {
    10
}
fn default_char_budget() -> usize {
    3000
}
fn default_message_char_limit() -> usize {
    500
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            history_turns: default_history_turns(),
            char_budget: default_char_budget(),
            message_char_limit: default_message_char_limit(),
        }
    }
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for DispatcherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("history_turns", &self.history_turns)
            .field("char_budget", &self.char_budget)
            .field("message_char_limit", &self.message_char_limit)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Level 0 request budget
    #[serde(default = "default_full_timeout_ms")]
    pub full_timeout_ms: u64,

    /// Level 1 request budget
    #[serde(default = "default_compact_timeout_ms")]
    pub compact_timeout_ms: u64,

    /// Consecutive unclassified failures before stepping down
    #[serde(default = "default_error_threshold")]
    pub error_threshold: u32,

    /// Quiet period after the last failure before a success steps back up
    #[serde(default = "default_recovery_secs")]
    pub recovery_secs: u64,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Persist ladder stats under `fallback_stats`
    #[serde(default = "default_true")]
    pub persist_stats: bool,
}

fn default_full_timeout_ms() -> u64 {
    8000
}
fn default_compact_timeout_ms() -> u64 {
    5000
}
fn default_error_threshold() -> u32 {
    3
}
fn default_recovery_secs() -> u64 {
    300
}
fn default_history_limit() -> usize {
    20
}
fn default_true() -> bool {
    true
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            full_timeout_ms: default_full_timeout_ms(),
            compact_timeout_ms: default_compact_timeout_ms(),
            error_threshold: default_error_threshold(),
            recovery_secs: default_recovery_secs(),
            history_limit: default_history_limit(),
            persist_stats: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Entries kept after pruning
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Turns returned by `history_for_dispatch`
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,

    #[serde(default = "default_half_life_days")]
    pub half_life_days: f64,

    #[serde(default = "default_min_decay_weight")]
    pub min_decay_weight: f64,

    /// Minimum importance for an entry to appear in the memory prompt
    #[serde(default = "default_prompt_importance_threshold")]
    pub prompt_importance_threshold: u8,

    #[serde(default = "default_prompt_recent_limit")]
    pub prompt_recent_limit: usize,

    /// Entry content is cut to this many characters in the memory prompt
    #[serde(default = "default_prompt_content_chars")]
    pub prompt_content_chars: usize,
}

fn default_capacity() -> usize {
    100
}
fn default_max_context_messages() -> usize {
    10
}
fn default_half_life_days() -> f64 {
    7.0
}
fn default_min_decay_weight() -> f64 {
    0.1
}
fn default_prompt_importance_threshold() -> u8 {
    3
}
fn default_prompt_recent_limit() -> usize {
    5
}
fn default_prompt_content_chars() -> usize {
    50
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            max_context_messages: default_max_context_messages(),
            half_life_days: default_half_life_days(),
            min_decay_weight: default_min_decay_weight(),
            prompt_importance_threshold: default_prompt_importance_threshold(),
            prompt_recent_limit: default_prompt_recent_limit(),
            prompt_content_chars: default_prompt_content_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Seconds between behavior ticks
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// An interaction younger than this keeps the pet in INTERACTION
    #[serde(default = "default_interaction_window_secs")]
    pub interaction_window_secs: i64,

    /// Idle minutes before the IDLE sub-state turns bored
    #[serde(default = "default_bored_after_minutes")]
    pub bored_after_minutes: u32,
}

fn default_tick_secs() -> u64 {
    5
}
fn default_interaction_window_secs() -> i64 {
    5
}
fn default_bored_after_minutes() -> u32 {
    10
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            interaction_window_secs: default_interaction_window_secs(),
            bored_after_minutes: default_bored_after_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SleepConfig {
    #[serde(default = "default_night_start_hour")]
    pub night_start_hour: u32,

    #[serde(default = "default_night_end_hour")]
    pub night_end_hour: u32,

    /// Inactivity that sends the pet to sleep regardless of the hour
    #[serde(default = "default_idle_sleep_minutes")]
    pub idle_sleep_minutes: u32,

    #[serde(default = "default_deep_sleep_after_minutes")]
    pub deep_sleep_after_minutes: i64,

    /// Minimum sleep before an interaction may wake the pet
    #[serde(default = "default_interaction_wake_min_minutes")]
    pub interaction_wake_min_minutes: i64,

    /// Safety cutoff
    #[serde(default = "default_max_sleep_hours")]
    pub max_sleep_hours: i64,

    /// Minimum sleep before the morning check wakes the pet
    #[serde(default = "default_morning_wake_min_minutes")]
    pub morning_wake_min_minutes: i64,

    /// Mood points recovered per minute slept
    #[serde(default = "default_mood_recovery_rate")]
    pub mood_recovery_rate: f64,

    #[serde(default = "default_mood_recovery_cap")]
    pub mood_recovery_cap: u32,

    #[serde(default = "default_wake_check_secs")]
    pub wake_check_secs: u64,

    /// Knowledge triples kept by the deep-sleep consolidation job
    #[serde(default = "default_triple_retention")]
    pub triple_retention: usize,

    #[serde(default = "default_dream_interval_secs")]
    pub dream_interval_secs: u64,
}

fn default_night_start_hour() -> u32 {
    23
}
fn default_night_end_hour() -> u32 {
    6
}
fn default_idle_sleep_minutes() -> u32 {
    30
}
fn default_deep_sleep_after_minutes() -> i64 {
    30
}
fn default_interaction_wake_min_minutes() -> i64 {
    10
}
fn default_max_sleep_hours() -> i64 {
    8
}
fn default_morning_wake_min_minutes() -> i64 {
    60
}
fn default_mood_recovery_rate() -> f64 {
    1.0
}
fn default_mood_recovery_cap() -> u32 {
    30
}
fn default_wake_check_secs() -> u64 {
    60
}
fn default_triple_retention() -> usize {
    100
}
fn default_dream_interval_secs() -> u64 {
    300
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            night_start_hour: default_night_start_hour(),
            night_end_hour: default_night_end_hour(),
            idle_sleep_minutes: default_idle_sleep_minutes(),
            deep_sleep_after_minutes: default_deep_sleep_after_minutes(),
            interaction_wake_min_minutes: default_interaction_wake_min_minutes(),
            max_sleep_hours: default_max_sleep_hours(),
            morning_wake_min_minutes: default_morning_wake_min_minutes(),
            mood_recovery_rate: default_mood_recovery_rate(),
            mood_recovery_cap: default_mood_recovery_cap(),
            wake_check_secs: default_wake_check_secs(),
            triple_retention: default_triple_retention(),
            dream_interval_secs: default_dream_interval_secs(),
        }
    }
}

impl SleepConfig {
    /// Whether `hour` falls inside the night window. Handles windows that
    /// wrap past midnight (the default 23..6 does).
    pub fn is_night_hour(&self, hour: u32) -> bool {
        let (start, end) = (self.night_start_hour, self.night_end_hour);
        if start == end {
            false
        } else if start > end {
            hour >= start || hour < end
        } else {
            hour >= start && hour < end
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyConfig {
    /// Reply text is truncated to this many characters
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,

    #[serde(default = "default_bubble_color")]
    pub default_bubble_color: String,
}

fn default_max_text_chars() -> usize {
    50
}
fn default_bubble_color() -> String {
    "#667eea".into()
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            max_text_chars: default_max_text_chars(),
            default_bubble_color: default_bubble_color(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_pet_name")]
    pub pet_name: String,

    /// Personality descriptor used when the host supplies none
    #[serde(default = "default_persona_description")]
    pub description: String,
}

fn default_pet_name() -> String {
    "小桌宠".into()
}
fn default_persona_description() -> String {
    "活泼、有点调皮、关心主人学习的桌面宠物".into()
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            pet_name: default_pet_name(),
            description: default_persona_description(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for persisted records (default: `~/.petmind/state`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("state"))
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.petmind/config.toml).
    ///
    /// Also checks environment variables:
    /// - `PETMIND_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `PETMIND_API_URL`
    /// - `PETMIND_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.dispatcher.api_key.is_none() {
            self.dispatcher.api_key = std::env::var("PETMIND_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .filter(|k| !k.trim().is_empty());
        }

        if let Ok(url) = std::env::var("PETMIND_API_URL") {
            self.dispatcher.api_url = url;
        }

        if let Ok(model) = std::env::var("PETMIND_MODEL") {
            self.dispatcher.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".petmind")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: &str| Err(ConfigError::ValidationError(msg.into()));

        if !(0.0..=2.0).contains(&self.dispatcher.temperature) {
            return fail("dispatcher.temperature must be between 0.0 and 2.0");
        }
        if self.fallback.full_timeout_ms == 0 || self.fallback.compact_timeout_ms == 0 {
            return fail("fallback timeouts must be > 0");
        }
        if self.fallback.full_timeout_ms < self.fallback.compact_timeout_ms {
            return fail("fallback.full_timeout_ms must be >= fallback.compact_timeout_ms");
        }
        if self.fallback.error_threshold == 0 {
            return fail("fallback.error_threshold must be > 0");
        }
        if self.memory.capacity == 0 {
            return fail("memory.capacity must be > 0");
        }
        if self.memory.half_life_days <= 0.0 {
            return fail("memory.half_life_days must be > 0");
        }
        if self.memory.min_decay_weight <= 0.0 || self.memory.min_decay_weight > 1.0 {
            return fail("memory.min_decay_weight must be in (0, 1]");
        }
        if !(1..=5).contains(&self.memory.prompt_importance_threshold) {
            return fail("memory.prompt_importance_threshold must be in 1..=5");
        }
        if self.sleep.night_start_hour > 23 || self.sleep.night_end_hour > 23 {
            return fail("sleep hours must be in 0..24");
        }
        if self.sleep.mood_recovery_rate < 0.0 {
            return fail("sleep.mood_recovery_rate must be >= 0");
        }
        if self.behavior.tick_secs == 0 || self.sleep.wake_check_secs == 0 {
            return fail("tick intervals must be > 0");
        }
        if self.reply.max_text_chars == 0 {
            return fail("reply.max_text_chars must be > 0");
        }
        if !PetReply::is_valid_color(&self.reply.default_bubble_color) {
            return fail("reply.default_bubble_color must look like #RRGGBB");
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.dispatcher.api_key.is_some()
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for petmind_core::Error {
    fn from(e: ConfigError) -> Self {
        petmind_core::Error::Config {
            message: e.to_string(),
        }
    }
}
