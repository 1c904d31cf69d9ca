//! How long the pet spends in each root state, with daily totals.

use chrono::{DateTime, NaiveDate, Utc};
use petmind_core::KeyValueStore;
use petmind_core::storage::{load_json_or_warn, save_json};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::state::{PetState, RootState};

/// Persistence key for duration stats.
pub const STATE_DURATION_KEY: &str = "pet_state_duration";

const HISTORY_LIMIT: usize = 100;
const PERSISTED_HISTORY: usize = 50;
const SUMMARY_RECENT: usize = 20;

/// One finished stay in a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub state: PetState,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl StateRecord {
    pub fn duration_secs(&self) -> i64 {
        (self.ended_at - self.started_at).num_seconds().max(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStateStats {
    pub date: NaiveDate,
    pub idle_minutes: f64,
    pub angry_minutes: f64,
    pub sleep_minutes: f64,
    pub interaction_count: u32,
}

impl DailyStateStats {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            idle_minutes: 0.0,
            angry_minutes: 0.0,
            sleep_minutes: 0.0,
            interaction_count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DurationSummary {
    pub total_records: usize,
    /// Most recent stays, oldest first, as (root, seconds).
    pub recent: Vec<(RootState, i64)>,
    pub today: DailyStateStats,
    pub average_secs: BTreeMap<RootState, i64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedDurations {
    history: Vec<StateRecord>,
    today: DailyStateStats,
}

#[derive(Debug, Clone, Copy)]
struct Current {
    state: PetState,
    started_at: DateTime<Utc>,
}

pub struct DurationTracker {
    persistence: Option<Arc<dyn KeyValueStore>>,
    current: Option<Current>,
    history: VecDeque<StateRecord>,
    today: DailyStateStats,
}

impl DurationTracker {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            persistence: None,
            current: None,
            history: VecDeque::new(),
            today: DailyStateStats::empty(today),
        }
    }

    pub fn with_persistence(today: NaiveDate, persistence: Arc<dyn KeyValueStore>) -> Self {
        let saved: Option<PersistedDurations> =
            load_json_or_warn(persistence.as_ref(), STATE_DURATION_KEY);
        let mut tracker = Self {
            persistence: Some(persistence),
            ..Self::new(today)
        };
        if let Some(saved) = saved {
            tracker.history = saved.history.into();
            tracker.today = saved.today;
            tracker.check_daily_reset(today);
        }
        tracker
    }

    /// Begin timing `state`, closing whatever was being timed.
    pub fn start_tracking(&mut self, state: PetState, now: DateTime<Utc>) {
        self.end_tracking(now);
        self.current = Some(Current {
            state,
            started_at: now,
        });
    }

    /// Close the current stay, if any, and fold it into the daily stats.
    pub fn end_tracking(&mut self, now: DateTime<Utc>) -> Option<StateRecord> {
        let current = self.current.take()?;
        let record = StateRecord {
            state: current.state,
            started_at: current.started_at,
            ended_at: now,
        };

        self.check_daily_reset(now.date_naive());
        let minutes = record.duration_secs() as f64 / 60.0;
        match record.state.root() {
            RootState::Idle => self.today.idle_minutes += minutes,
            RootState::Angry => self.today.angry_minutes += minutes,
            RootState::Sleeping => self.today.sleep_minutes += minutes,
            RootState::Interaction => self.today.interaction_count += 1,
            RootState::Working => {}
        }

        debug!(state = %record.state, secs = record.duration_secs(), "State stay ended");
        self.history.push_back(record.clone());
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.save();
        Some(record)
    }

    pub fn current_state(&self) -> Option<PetState> {
        self.current.map(|c| c.state)
    }

    pub fn current_duration_secs(&self, now: DateTime<Utc>) -> i64 {
        self.current
            .map(|c| (now - c.started_at).num_seconds().max(0))
            .unwrap_or(0)
    }

    pub fn history(&self) -> impl Iterator<Item = &StateRecord> {
        self.history.iter()
    }

    pub fn today(&self) -> &DailyStateStats {
        &self.today
    }

    /// Start a fresh day when the date has moved on.
    pub fn check_daily_reset(&mut self, today: NaiveDate) -> bool {
        if self.today.date == today {
            return false;
        }
        self.today = DailyStateStats::empty(today);
        self.save();
        true
    }

    pub fn summary(&self) -> DurationSummary {
        let skip = self.history.len().saturating_sub(SUMMARY_RECENT);
        let recent = self
            .history
            .iter()
            .skip(skip)
            .map(|r| (r.state.root(), r.duration_secs()))
            .collect();

        let mut totals: BTreeMap<RootState, (i64, i64)> = BTreeMap::new();
        for record in &self.history {
            let entry = totals.entry(record.state.root()).or_default();
            entry.0 += record.duration_secs();
            entry.1 += 1;
        }
        let average_secs = totals
            .into_iter()
            .map(|(root, (sum, count))| (root, sum / count.max(1)))
            .collect();

        DurationSummary {
            total_records: self.history.len(),
            recent,
            today: self.today.clone(),
            average_secs,
        }
    }

    fn save(&self) {
        let Some(store) = &self.persistence else {
            return;
        };
        let skip = self.history.len().saturating_sub(PERSISTED_HISTORY);
        let record = PersistedDurations {
            history: self.history.iter().skip(skip).cloned().collect(),
            today: self.today.clone(),
        };
        if let Err(e) = save_json(store.as_ref(), STATE_DURATION_KEY, &record) {
            warn!(error = %e, "Failed to persist state durations");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{IdleMood, InteractionKind, SleepDepth};
    use chrono::Duration;
    use petmind_core::{Clock, InMemoryStore, ManualClock};

    #[test]
    fn stays_accumulate_into_daily_stats() {
        let clock = ManualClock::at_hour(9);
        let mut tracker = DurationTracker::new(clock.now().date_naive());

        tracker.start_tracking(PetState::Idle(IdleMood::Normal), clock.now());
        clock.advance(Duration::minutes(10));
        tracker.start_tracking(PetState::Interaction(InteractionKind::Chatting), clock.now());
        clock.advance(Duration::seconds(30));
        tracker.start_tracking(PetState::Sleeping(SleepDepth::Light), clock.now());
        clock.advance(Duration::minutes(90));
        let last = tracker.end_tracking(clock.now()).unwrap();

        assert_eq!(last.duration_secs(), 90 * 60);
        let today = tracker.today();
        assert!((today.idle_minutes - 10.0).abs() < 1e-9);
        assert!((today.sleep_minutes - 90.0).abs() < 1e-9);
        assert_eq!(today.interaction_count, 1);
        assert!(tracker.current_state().is_none());
        assert!(tracker.end_tracking(clock.now()).is_none());

        let summary = tracker.summary();
        assert_eq!(summary.total_records, 3);
        assert_eq!(summary.average_secs[&RootState::Idle], 600);
        assert_eq!(summary.recent.last(), Some(&(RootState::Sleeping, 5400)));
    }

    #[test]
    fn new_day_resets_totals() {
        let clock = ManualClock::at_hour(23);
        let mut tracker = DurationTracker::new(clock.now().date_naive());
        tracker.start_tracking(PetState::Idle(IdleMood::Normal), clock.now());
        clock.advance(Duration::hours(2));
        tracker.end_tracking(clock.now());

        // The stay ended on the next day, so it counts there.
        assert_eq!(tracker.today().date, clock.now().date_naive());
        assert!((tracker.today().idle_minutes - 120.0).abs() < 1e-9);
        assert!(!tracker.check_daily_reset(clock.now().date_naive()));
    }

    #[test]
    fn history_is_bounded_and_persisted() {
        let clock = ManualClock::at_hour(9);
        let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
        let mut tracker = DurationTracker::with_persistence(clock.now().date_naive(), kv.clone());
        for _ in 0..120 {
            tracker.start_tracking(PetState::Idle(IdleMood::Bored), clock.now());
            clock.advance(Duration::seconds(5));
        }
        assert_eq!(tracker.history().count(), HISTORY_LIMIT);

        let reloaded = DurationTracker::with_persistence(clock.now().date_naive(), kv);
        assert_eq!(reloaded.history().count(), PERSISTED_HISTORY);
        assert_eq!(reloaded.today().idle_minutes, tracker.today().idle_minutes);
    }
}
