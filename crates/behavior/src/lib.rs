//! Pet behavior for petmind.
//!
//! - [`BehaviorStateMachine`]: two-level state machine driven by a
//!   priority rule list on every tick
//! - [`SleepCycle`]: falling asleep, deep sleep and wake rules
//! - [`DurationTracker`]: time spent per state and daily totals
//! - [`ReflectionJournal`]: daily summaries written during deep sleep

pub mod duration;
pub mod machine;
pub mod reflection;
pub mod sleep;
pub mod state;
pub mod tree;

pub use duration::{DailyStateStats, DurationSummary, DurationTracker, StateRecord};
pub use machine::{BehaviorEvent, BehaviorStateMachine, SleepCheck};
pub use reflection::{DailySummary, Insight, InsightKind, ReflectionJournal};
pub use sleep::{Dream, SleepCycle, SleepReason, WakeReason, WakeReport};
pub use state::{
    IdleMood, InteractionKind, PetState, RootState, SleepDepth, WarningLevel, WorkKind,
};
pub use tree::{Node, Status};
