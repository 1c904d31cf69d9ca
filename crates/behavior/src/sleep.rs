//! Sleep cycle: when to fall asleep, when to wake up, deep sleep and the
//! mood recovered by sleeping.

use chrono::{DateTime, Duration, Utc};
use petmind_config::SleepConfig;
use petmind_core::storage::{load_json_or_warn, save_json};
use petmind_core::{KeyValueStore, Sensors};
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Persistence key for an in-progress sleep.
pub const SLEEP_STATE_KEY: &str = "pet_sleep_state";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepReason {
    NightTime,
    IdleTimeout,
    Manual,
}

impl SleepReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SleepReason::NightTime => "night_time",
            SleepReason::IdleTimeout => "idle_timeout",
            SleepReason::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeReason {
    Manual,
    Interaction,
    Morning,
    MaxDuration,
}

impl WakeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            WakeReason::Manual => "manual",
            WakeReason::Interaction => "interaction",
            WakeReason::Morning => "morning",
            WakeReason::MaxDuration => "max_duration",
        }
    }
}

/// What a finished sleep amounted to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WakeReport {
    pub reason: WakeReason,
    pub slept_minutes: i64,
    /// Mood points the host should add back.
    pub mood_recovered: u32,
}

/// A dream shown while the pet sleeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dream {
    pub emoji: &'static str,
    pub content: &'static str,
}

const DREAMS: [Dream; 7] = [
    Dream { emoji: "🌈", content: "梦到彩虹..." },
    Dream { emoji: "🍖", content: "梦到美食..." },
    Dream { emoji: "📚", content: "梦到主人在学习..." },
    Dream { emoji: "🎮", content: "梦到和主人玩..." },
    Dream { emoji: "☁️", content: "在云上飘..." },
    Dream { emoji: "🌙", content: "数星星..." },
    Dream { emoji: "💭", content: "模糊的梦..." },
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SleepRecord {
    sleeping_since: Option<DateTime<Utc>>,
    #[serde(default)]
    deep: bool,
    #[serde(default)]
    consolidated: bool,
}

pub struct SleepCycle {
    config: SleepConfig,
    persistence: Option<Arc<dyn KeyValueStore>>,
    record: SleepRecord,
}

impl SleepCycle {
    pub fn new(config: SleepConfig) -> Self {
        Self {
            config,
            persistence: None,
            record: SleepRecord::default(),
        }
    }

    /// Restore an in-progress sleep from `persistence`, if one was saved.
    pub fn with_persistence(config: SleepConfig, persistence: Arc<dyn KeyValueStore>) -> Self {
        let record: SleepRecord =
            load_json_or_warn(persistence.as_ref(), SLEEP_STATE_KEY).unwrap_or_default();
        if let Some(since) = record.sleeping_since {
            info!(%since, deep = record.deep, "Restored sleep state");
        }
        Self {
            config,
            persistence: Some(persistence),
            record,
        }
    }

    pub fn config(&self) -> &SleepConfig {
        &self.config
    }

    pub fn is_sleeping(&self) -> bool {
        self.record.sleeping_since.is_some()
    }

    pub fn is_deep(&self) -> bool {
        self.record.deep
    }

    pub fn sleeping_since(&self) -> Option<DateTime<Utc>> {
        self.record.sleeping_since
    }

    pub fn slept_for(&self, now: DateTime<Utc>) -> Duration {
        self.record
            .sleeping_since
            .map(|since| now - since)
            .unwrap_or_else(Duration::zero)
    }

    pub fn is_night(&self, hour: u32) -> bool {
        self.config.is_night_hour(hour)
    }

    /// Why the pet should fall asleep now, if it should.
    pub fn should_sleep(&self, sensors: &Sensors, hour: u32) -> Option<SleepReason> {
        if self.is_sleeping() {
            None
        } else if self.is_night(hour) {
            Some(SleepReason::NightTime)
        } else if sensors.inactive_minutes > self.config.idle_sleep_minutes {
            Some(SleepReason::IdleTimeout)
        } else {
            None
        }
    }

    /// Begin a new sleep session. No-op when already asleep.
    pub fn start(&mut self, now: DateTime<Utc>, reason: SleepReason) -> bool {
        if self.is_sleeping() {
            return false;
        }
        self.record = SleepRecord {
            sleeping_since: Some(now),
            deep: false,
            consolidated: false,
        };
        info!(reason = reason.as_str(), "Falling asleep");
        self.save();
        true
    }

    /// Wake rule checked periodically: morning once slept long enough, or
    /// the safety cutoff.
    pub fn check_wake(&self, now: DateTime<Utc>, hour: u32) -> Option<WakeReason> {
        if !self.is_sleeping() {
            return None;
        }
        let slept = self.slept_for(now);
        if !self.is_night(hour) && slept >= Duration::minutes(self.config.morning_wake_min_minutes)
        {
            return Some(WakeReason::Morning);
        }
        if slept >= Duration::hours(self.config.max_sleep_hours) {
            return Some(WakeReason::MaxDuration);
        }
        None
    }

    /// Whether an interaction right now is allowed to wake the pet.
    pub fn interaction_can_wake(&self, now: DateTime<Utc>) -> bool {
        self.is_sleeping()
            && self.slept_for(now) >= Duration::minutes(self.config.interaction_wake_min_minutes)
    }

    /// Enter deep sleep once the light phase has lasted long enough.
    /// Returns true only on the transition.
    pub fn poll_deep_sleep(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_sleeping() || self.record.deep {
            return false;
        }
        if self.slept_for(now) < Duration::minutes(self.config.deep_sleep_after_minutes) {
            return false;
        }
        self.record.deep = true;
        debug!("Entering deep sleep");
        self.save();
        true
    }

    /// Claim the consolidation job for this session. Returns true at most
    /// once per sleep, and only while in deep sleep.
    pub fn take_consolidation(&mut self) -> bool {
        if !self.record.deep || self.record.consolidated {
            return false;
        }
        self.record.consolidated = true;
        self.save();
        true
    }

    /// End the current sleep. `None` when not sleeping.
    pub fn wake(&mut self, now: DateTime<Utc>, reason: WakeReason) -> Option<WakeReport> {
        self.record.sleeping_since?;
        let slept_minutes = self.slept_for(now).num_minutes().max(0);
        let mood_recovered = self.mood_recovery(slept_minutes);
        self.record = SleepRecord::default();
        self.clear();
        info!(reason = reason.as_str(), slept_minutes, mood_recovered, "Woke up");
        Some(WakeReport {
            reason,
            slept_minutes,
            mood_recovered,
        })
    }

    /// `min(floor(minutes × rate), cap)`
    pub fn mood_recovery(&self, slept_minutes: i64) -> u32 {
        let raw = (slept_minutes.max(0) as f64 * self.config.mood_recovery_rate).floor();
        (raw as u32).min(self.config.mood_recovery_cap)
    }

    /// A random dream while asleep.
    pub fn dream(&self) -> Option<Dream> {
        if !self.is_sleeping() {
            return None;
        }
        DREAMS.choose(&mut rand::rng()).copied()
    }

    fn save(&self) {
        let Some(store) = &self.persistence else {
            return;
        };
        if let Err(e) = save_json(store.as_ref(), SLEEP_STATE_KEY, &self.record) {
            warn!(error = %e, "Failed to persist sleep state");
        }
    }

    fn clear(&self) {
        let Some(store) = &self.persistence else {
            return;
        };
        if let Err(e) = store.remove(SLEEP_STATE_KEY) {
            warn!(error = %e, "Failed to clear sleep state");
        }
    }
}
