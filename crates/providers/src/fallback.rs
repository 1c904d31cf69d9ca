//! Degradation ladder: decides how much the dispatcher is trusted.
//!
//! | Level | Meaning                               | Budget      |
//! |-------|---------------------------------------|-------------|
//! | 0     | full prompt (memory, history, persona) | 8000 ms     |
//! | 1     | compact prompt                        | 5000 ms     |
//! | 2     | local template by event and mood      | no network  |
//! | 3     | static reply by mood                  | no network  |
//!
//! Failures push the level up, successes after a quiet period bring it
//! back down one step at a time.

use chrono::{DateTime, Duration, Utc};
use petmind_config::FallbackConfig;
use petmind_core::storage::{load_json_or_warn, save_json};
use petmind_core::{Clock, DispatchError, FailureClass, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Persistence key for ladder stats.
pub const FALLBACK_STATS_KEY: &str = "fallback_stats";

/// One rung of the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DegradationLevel {
    #[default]
    Full,
    Compact,
    Template,
    Static,
}

impl DegradationLevel {
    pub const MAX: u8 = 3;

    /// Clamps anything above 3.
    pub fn from_u8(level: u8) -> Self {
        match level {
            0 => Self::Full,
            1 => Self::Compact,
            2 => Self::Template,
            _ => Self::Static,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Full => 0,
            Self::Compact => 1,
            Self::Template => 2,
            Self::Static => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Compact => "compact",
            Self::Template => "template",
            Self::Static => "static",
        }
    }

    /// Levels 2 and 3 never touch the network.
    pub fn uses_network(self) -> bool {
        self < Self::Template
    }

    fn step_down(self) -> Self {
        Self::from_u8(self.as_u8().saturating_add(1).min(Self::MAX))
    }

    fn step_up(self) -> Self {
        Self::from_u8(self.as_u8().saturating_sub(1))
    }
}

impl fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_u8(), self.name())
    }
}

impl Serialize for DegradationLevel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for DegradationLevel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u8::deserialize(deserializer).map(Self::from_u8)
    }
}

/// Why the level moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeReason {
    Network,
    Timeout,
    ErrorThreshold,
    Recovered,
    Manual,
    Reset,
}

impl ChangeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeReason::Network => "network",
            ChangeReason::Timeout => "timeout",
            ChangeReason::ErrorThreshold => "error_threshold",
            ChangeReason::Recovered => "recovered",
            ChangeReason::Manual => "manual",
            ChangeReason::Reset => "reset",
        }
    }
}

/// A level change, returned to the caller so it can be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChange {
    pub from: DegradationLevel,
    pub to: DegradationLevel,
    pub reason: ChangeReason,
}

/// A recorded failure, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub at: DateTime<Utc>,
    /// Level at the time of the failure.
    pub level: DegradationLevel,
    pub class: FailureClass,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LadderState {
    level: DegradationLevel,
    consecutive_errors: u32,
    last_error_at: Option<DateTime<Utc>>,
    last_success_at: Option<DateTime<Utc>>,
    #[serde(default)]
    total_failures: u64,
    #[serde(default)]
    total_successes: u64,
    #[serde(default)]
    history: VecDeque<FailureRecord>,
}

/// Snapshot for status output.
#[derive(Debug, Clone, Serialize)]
pub struct FallbackStats {
    pub level: DegradationLevel,
    pub consecutive_errors: u32,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub total_failures: u64,
    pub total_successes: u64,
    /// Up to five most recent failures, oldest first.
    pub recent_failures: Vec<FailureRecord>,
}

pub struct FallbackController {
    config: FallbackConfig,
    clock: Arc<dyn Clock>,
    persistence: Option<Arc<dyn KeyValueStore>>,
    state: LadderState,
}

impl FallbackController {
    pub fn new(config: FallbackConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            persistence: None,
            state: LadderState::default(),
        }
    }

    /// Restores saved stats when `persist_stats` is on.
    pub fn with_persistence(
        config: FallbackConfig,
        clock: Arc<dyn Clock>,
        persistence: Arc<dyn KeyValueStore>,
    ) -> Self {
        let state = if config.persist_stats {
            load_json_or_warn(persistence.as_ref(), FALLBACK_STATS_KEY).unwrap_or_default()
        } else {
            LadderState::default()
        };
        Self {
            config,
            clock,
            persistence: Some(persistence),
            state,
        }
    }

    pub fn level(&self) -> DegradationLevel {
        self.state.level
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.state.consecutive_errors
    }

    pub fn is_degraded(&self) -> bool {
        self.state.level > DegradationLevel::Full
    }

    /// Time budget for a dispatch at the current level, `None` when the
    /// level does not dispatch at all.
    pub fn timeout(&self) -> Option<std::time::Duration> {
        let ms = match self.state.level {
            DegradationLevel::Full => self.config.full_timeout_ms,
            DegradationLevel::Compact => self.config.compact_timeout_ms,
            DegradationLevel::Template | DegradationLevel::Static => return None,
        };
        Some(std::time::Duration::from_millis(ms))
    }

    pub fn record_success(&mut self) -> Option<LevelChange> {
        let now = self.clock.now();
        self.state.consecutive_errors = 0;
        self.state.last_success_at = Some(now);
        self.state.total_successes += 1;

        let recovery = Duration::seconds(self.config.recovery_secs as i64);
        let quiet_long_enough = self
            .state
            .last_error_at
            .is_none_or(|at| now - at > recovery);

        let change = if self.is_degraded() && quiet_long_enough {
            self.move_to(self.state.level.step_up(), ChangeReason::Recovered)
        } else {
            None
        };
        self.save();
        change
    }

    pub fn record_failure(&mut self, error: &DispatchError) -> Option<LevelChange> {
        let now = self.clock.now();
        let class = error.classify();
        self.state.last_error_at = Some(now);
        self.state.total_failures += 1;
        self.state.history.push_back(FailureRecord {
            at: now,
            level: self.state.level,
            class,
            error: error.to_string(),
        });
        while self.state.history.len() > self.config.history_limit {
            self.state.history.pop_front();
        }

        let change = match class {
            // Connectivity is gone, dispatching again is pointless. This
            // also applies from level 3.
            FailureClass::Network => {
                self.move_to(DegradationLevel::Template, ChangeReason::Network)
            }
            FailureClass::Timeout => {
                self.move_to(self.state.level.step_down(), ChangeReason::Timeout)
            }
            FailureClass::Other => {
                self.state.consecutive_errors += 1;
                if self.state.consecutive_errors >= self.config.error_threshold {
                    self.state.consecutive_errors = 0;
                    self.move_to(self.state.level.step_down(), ChangeReason::ErrorThreshold)
                } else {
                    debug!(
                        consecutive = self.state.consecutive_errors,
                        threshold = self.config.error_threshold,
                        "Dispatcher error counted"
                    );
                    None
                }
            }
        };
        self.save();
        change
    }

    /// Back to full service with a clean counter.
    pub fn reset(&mut self) -> Option<LevelChange> {
        self.state.consecutive_errors = 0;
        let change = self.move_to(DegradationLevel::Full, ChangeReason::Reset);
        self.save();
        change
    }

    /// Force a level; values above 3 clamp to 3.
    pub fn set_level(&mut self, level: u8) -> Option<LevelChange> {
        let change = self.move_to(DegradationLevel::from_u8(level), ChangeReason::Manual);
        self.save();
        change
    }

    /// One step towards full service.
    pub fn upgrade(&mut self) -> Option<LevelChange> {
        self.set_level(self.state.level.step_up().as_u8())
    }

    /// One step towards static replies.
    pub fn downgrade(&mut self) -> Option<LevelChange> {
        self.set_level(self.state.level.step_down().as_u8())
    }

    pub fn history(&self) -> impl Iterator<Item = &FailureRecord> {
        self.state.history.iter()
    }

    pub fn stats(&self) -> FallbackStats {
        let skip = self.state.history.len().saturating_sub(5);
        FallbackStats {
            level: self.state.level,
            consecutive_errors: self.state.consecutive_errors,
            last_error_at: self.state.last_error_at,
            last_success_at: self.state.last_success_at,
            total_failures: self.state.total_failures,
            total_successes: self.state.total_successes,
            recent_failures: self.state.history.iter().skip(skip).cloned().collect(),
        }
    }

    fn move_to(&mut self, to: DegradationLevel, reason: ChangeReason) -> Option<LevelChange> {
        let from = self.state.level;
        if from == to {
            return None;
        }
        self.state.level = to;
        info!(from = %from, to = %to, reason = reason.as_str(), "Degradation level changed");
        Some(LevelChange { from, to, reason })
    }

    fn save(&self) {
        if !self.config.persist_stats {
            return;
        }
        let Some(store) = &self.persistence else {
            return;
        };
        if let Err(e) = save_json(store.as_ref(), FALLBACK_STATS_KEY, &self.state) {
            warn!(error = %e, "Failed to persist fallback stats");
        }
    }
}
