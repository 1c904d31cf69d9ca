//! The behavior state machine.
//!
//! Every tick evaluates a fixed priority list of rules (a behavior tree
//! selector) against the latest sensor snapshot. All state changes, whether
//! from a tick, an interaction or an explicit request, go through a single
//! legality-checked commit. Observers read the resulting [`BehaviorEvent`]s
//! with [`BehaviorStateMachine::drain_events`]; nothing calls back into the
//! machine while it is mutating.

use chrono::{DateTime, Duration, Utc};
use petmind_config::{BehaviorConfig, SleepConfig};
use petmind_core::{Clock, KeyValueStore, Sensors};
use std::sync::Arc;
use tracing::{debug, info};

use crate::duration::DurationTracker;
use crate::sleep::{Dream, SleepCycle, SleepReason, WakeReason, WakeReport};
use crate::state::{
    IdleMood, InteractionKind, PetState, RootState, SleepDepth, WarningLevel, WorkKind,
};
use crate::tree::{self, Node};

const ANGRY_MOOD_BELOW: u32 = 20;
const HUNGRY_BELOW: u32 = 30;
const EXCITED_MOOD_ABOVE: u32 = 80;
const ANXIOUS_MOOD_BELOW: u32 = 40;
const SLEEPY_MOOD_BELOW: u32 = 60;
const MAX_WARNING_LEVEL: u8 = 3;

/// Something observable the machine did.
#[derive(Debug, Clone, PartialEq)]
pub enum BehaviorEvent {
    Transitioned { from: PetState, to: PetState },
    FellAsleep { reason: SleepReason },
    WokeUp(WakeReport),
    EnteredDeepSleep,
}

/// Outcome of the periodic sleep check.
#[derive(Debug, Clone, PartialEq)]
pub enum SleepCheck {
    Nothing,
    Woke(WakeReport),
    EnteredDeepSleep,
}

/// Mutable machine state; the context the decision tree runs against.
pub struct MachineCore {
    config: BehaviorConfig,
    clock: Arc<dyn Clock>,
    state: PetState,
    last_transition_at: DateTime<Utc>,
    last_interaction_at: Option<DateTime<Utc>>,
    warning_level: u8,
    sensors: Sensors,
    hour: u32,
    sleep: SleepCycle,
    durations: DurationTracker,
    events: Vec<BehaviorEvent>,
}

impl MachineCore {
    fn commit(&mut self, next: PetState) -> bool {
        let from = self.state;
        if !from.root().can_transition_to(next.root()) {
            debug!(from = %from, to = %next, "Transition rejected");
            return false;
        }
        if from == next {
            return true;
        }

        let now = self.clock.now();
        if from.is_sleeping() && !next.is_sleeping() {
            if let Some(report) = self.sleep.wake(now, WakeReason::Manual) {
                self.events.push(BehaviorEvent::WokeUp(report));
            }
        } else if next.is_sleeping() && !self.sleep.is_sleeping() {
            self.sleep.start(now, SleepReason::Manual);
            self.events.push(BehaviorEvent::FellAsleep {
                reason: SleepReason::Manual,
            });
        }

        if from.root() == RootState::Angry && next.root() != RootState::Angry {
            self.warning_level = 0;
        }
        if from.root() != next.root() {
            self.durations.start_tracking(next, now);
        }

        self.state = next;
        self.last_transition_at = now;
        info!(from = %from, to = %next, "Behavior transition");
        self.events.push(BehaviorEvent::Transitioned { from, to: next });
        true
    }

    fn begin_sleep(&mut self, reason: SleepReason) -> bool {
        if self.state.is_sleeping() || !self.state.root().can_transition_to(RootState::Sleeping) {
            return false;
        }
        let now = self.clock.now();
        self.sleep.start(now, reason);
        self.events.push(BehaviorEvent::FellAsleep { reason });
        self.commit(PetState::Sleeping(SleepDepth::Light))
    }

    fn wake_up(&mut self, reason: WakeReason) -> Option<WakeReport> {
        if !self.state.is_sleeping() {
            return None;
        }
        let report = self.sleep.wake(self.clock.now(), reason)?;
        self.events.push(BehaviorEvent::WokeUp(report.clone()));
        self.commit(PetState::Idle(IdleMood::Normal));
        Some(report)
    }

    fn interacted_recently(&self) -> bool {
        let window = Duration::seconds(self.config.interaction_window_secs);
        self.last_interaction_at
            .is_some_and(|at| self.clock.now() - at < window)
    }

    /// Second-level priority list for the IDLE sub-state.
    fn idle_mood(&self) -> IdleMood {
        let s = &self.sensors;
        if s.hunger < HUNGRY_BELOW {
            IdleMood::Hungry
        } else if s.mood > EXCITED_MOOD_ABOVE {
            IdleMood::Excited
        } else if s.mood < ANXIOUS_MOOD_BELOW {
            IdleMood::Anxious
        } else if s.inactive_minutes > self.config.bored_after_minutes {
            IdleMood::Bored
        } else if self.sleep.is_night(self.hour) && s.mood < SLEEPY_MOOD_BELOW {
            IdleMood::Sleepy
        } else {
            IdleMood::Normal
        }
    }
}

// Decision tree leaves.

fn is_sleeping(c: &MachineCore) -> bool {
    c.state.is_sleeping()
}

fn stay_asleep(_: &mut MachineCore) -> bool {
    true
}

fn should_sleep(c: &MachineCore) -> bool {
    c.sleep.should_sleep(&c.sensors, c.hour).is_some()
}

fn fall_asleep(c: &mut MachineCore) -> bool {
    match c.sleep.should_sleep(&c.sensors, c.hour) {
        Some(reason) => c.begin_sleep(reason),
        None => false,
    }
}

fn mood_critical(c: &MachineCore) -> bool {
    c.sensors.mood < ANGRY_MOOD_BELOW
}

fn enter_angry(c: &mut MachineCore) -> bool {
    if c.state.root() == RootState::Angry {
        return true;
    }
    let entered = c.commit(PetState::Angry(WarningLevel::L1));
    if entered {
        c.warning_level = 1;
    }
    entered
}

fn has_recent_interaction(c: &MachineCore) -> bool {
    c.interacted_recently()
}

fn stay_interacting(c: &mut MachineCore) -> bool {
    c.state.root() == RootState::Interaction
        || c.commit(PetState::Interaction(InteractionKind::BeingTouched))
}

fn is_monitoring(c: &MachineCore) -> bool {
    c.sensors.is_monitoring
}

fn enter_working(c: &mut MachineCore) -> bool {
    c.state.root() == RootState::Working || c.commit(PetState::Working(WorkKind::Monitoring))
}

fn enter_idle(c: &mut MachineCore) -> bool {
    let mood = c.idle_mood();
    c.commit(PetState::Idle(mood))
}

fn decision_tree() -> Node<MachineCore> {
    Node::selector(
        "root",
        vec![
            Node::sequence(
                "sleeping",
                vec![
                    Node::condition("is_sleeping", is_sleeping),
                    Node::action("stay_asleep", stay_asleep),
                ],
            ),
            Node::sequence(
                "bedtime",
                vec![
                    Node::condition("should_sleep", should_sleep),
                    Node::action("fall_asleep", fall_asleep),
                ],
            ),
            Node::sequence(
                "angry",
                vec![
                    Node::condition("mood_critical", mood_critical),
                    Node::action("enter_angry", enter_angry),
                ],
            ),
            Node::sequence(
                "interaction",
                vec![
                    Node::condition("has_recent_interaction", has_recent_interaction),
                    Node::action("stay_interacting", stay_interacting),
                ],
            ),
            Node::sequence(
                "working",
                vec![
                    Node::condition("is_monitoring", is_monitoring),
                    Node::action("enter_working", enter_working),
                ],
            ),
            Node::action("enter_idle", enter_idle),
        ],
    )
}

pub struct BehaviorStateMachine {
    tree: Node<MachineCore>,
    core: MachineCore,
}

impl BehaviorStateMachine {
    /// A machine without persistence, starting in IDLE/normal.
    pub fn new(behavior: BehaviorConfig, sleep: SleepConfig, clock: Arc<dyn Clock>) -> Self {
        let today = clock.now().date_naive();
        Self::assemble(
            behavior,
            SleepCycle::new(sleep),
            DurationTracker::new(today),
            clock,
        )
    }

    /// A machine that restores an in-progress sleep and duration stats.
    /// If a wake rule already holds for a restored sleep, the pet wakes
    /// straight away and the events are queued.
    pub fn with_persistence(
        behavior: BehaviorConfig,
        sleep: SleepConfig,
        clock: Arc<dyn Clock>,
        persistence: Arc<dyn KeyValueStore>,
    ) -> Self {
        let today = clock.now().date_naive();
        let mut machine = Self::assemble(
            behavior,
            SleepCycle::with_persistence(sleep, persistence.clone()),
            DurationTracker::with_persistence(today, persistence),
            clock,
        );
        if machine.core.state.is_sleeping() {
            machine.check_sleep();
        }
        machine
    }

    fn assemble(
        config: BehaviorConfig,
        sleep: SleepCycle,
        mut durations: DurationTracker,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let now = clock.now();
        let hour = clock.local_hour();
        let state = match (sleep.is_sleeping(), sleep.is_deep()) {
            (true, true) => PetState::Sleeping(SleepDepth::Deep),
            (true, false) => PetState::Sleeping(SleepDepth::Light),
            _ => PetState::default(),
        };
        durations.start_tracking(state, now);
        Self {
            tree: decision_tree(),
            core: MachineCore {
                config,
                clock,
                state,
                last_transition_at: now,
                last_interaction_at: None,
                warning_level: 0,
                sensors: Sensors::default(),
                hour,
                sleep,
                durations,
                events: Vec::new(),
            },
        }
    }

    pub fn state(&self) -> PetState {
        self.core.state
    }

    pub fn root(&self) -> RootState {
        self.core.state.root()
    }

    pub fn last_transition_at(&self) -> DateTime<Utc> {
        self.core.last_transition_at
    }

    /// 0 when not angry, else 1..=3.
    pub fn warning_level(&self) -> u8 {
        self.core.warning_level
    }

    pub fn sleep(&self) -> &SleepCycle {
        &self.core.sleep
    }

    pub fn durations(&self) -> &DurationTracker {
        &self.core.durations
    }

    /// Evaluate the rule list once against `sensors` and return the
    /// resulting state.
    pub fn tick(&mut self, sensors: &Sensors) -> PetState {
        self.core.sensors = sensors.clone();
        self.core.hour = self.core.clock.local_hour();
        tree::tick(&self.tree, &mut self.core);
        self.core.state
    }

    /// Legality-checked transition. Rejected transitions change nothing
    /// and return false.
    pub fn transition_to(&mut self, next: PetState) -> bool {
        self.core.commit(next)
    }

    /// Record a user interaction. A sleeping pet wakes only after it has
    /// slept long enough; returns whether the pet is now interacting.
    pub fn trigger_interaction(&mut self, kind: InteractionKind) -> bool {
        let now = self.core.clock.now();
        self.core.last_interaction_at = Some(now);

        if self.core.state.is_sleeping() {
            if !self.core.sleep.interaction_can_wake(now) {
                debug!("Interaction ignored, too soon to wake");
                return false;
            }
            if let Some(report) = self.core.sleep.wake(now, WakeReason::Interaction) {
                self.core.events.push(BehaviorEvent::WokeUp(report));
            }
        }
        self.core.commit(PetState::Interaction(kind))
    }

    /// Step the warning level up (max 3) and show it.
    pub fn escalate_warning(&mut self) -> bool {
        let level = (self.core.warning_level + 1).min(MAX_WARNING_LEVEL);
        let committed = self
            .core
            .commit(PetState::Angry(WarningLevel::from_number(level)));
        if committed {
            self.core.warning_level = level;
        }
        committed
    }

    /// Clear warnings and return to IDLE/normal.
    pub fn reset_warning(&mut self) -> bool {
        self.core.warning_level = 0;
        self.core.commit(PetState::Idle(IdleMood::Normal))
    }

    /// Put the pet to sleep on request.
    pub fn begin_sleep(&mut self, reason: SleepReason) -> bool {
        self.core.begin_sleep(reason)
    }

    pub fn wake_up(&mut self, reason: WakeReason) -> Option<WakeReport> {
        self.core.wake_up(reason)
    }

    /// Periodic sleep check: wake rules first, then the move into deep sleep.
    pub fn check_sleep(&mut self) -> SleepCheck {
        let now = self.core.clock.now();
        let hour = self.core.clock.local_hour();
        if let Some(reason) = self.core.sleep.check_wake(now, hour) {
            return match self.core.wake_up(reason) {
                Some(report) => SleepCheck::Woke(report),
                None => SleepCheck::Nothing,
            };
        }
        if self.core.state.is_sleeping() && self.core.sleep.poll_deep_sleep(now) {
            self.core.commit(PetState::Sleeping(SleepDepth::Deep));
            self.core.events.push(BehaviorEvent::EnteredDeepSleep);
            return SleepCheck::EnteredDeepSleep;
        }
        SleepCheck::Nothing
    }

    /// Claim this sleep's consolidation job (true at most once per sleep).
    pub fn take_consolidation(&mut self) -> bool {
        self.core.sleep.take_consolidation()
    }

    pub fn dream(&self) -> Option<Dream> {
        self.core.sleep.dream()
    }

    pub fn drain_events(&mut self) -> Vec<BehaviorEvent> {
        std::mem::take(&mut self.core.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petmind_core::{InMemoryStore, ManualClock};

    fn machine_at(hour: u32) -> (BehaviorStateMachine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_hour(hour));
        let machine = BehaviorStateMachine::new(
            BehaviorConfig::default(),
            SleepConfig::default(),
            clock.clone(),
        );
        (machine, clock)
    }

    fn sensors(mood: u32, hunger: u32) -> Sensors {
        Sensors {
            mood,
            hunger,
            ..Sensors::default()
        }
    }

    #[test]
    fn happy_idle_pet_is_excited() {
        let (mut m, _) = machine_at(10);
        assert_eq!(m.tick(&sensors(85, 90)), PetState::Idle(IdleMood::Excited));
    }

    #[test]
    fn idle_sub_state_priorities() {
        let (mut m, _) = machine_at(10);
        assert_eq!(m.tick(&sensors(85, 20)), PetState::Idle(IdleMood::Hungry));
        assert_eq!(m.tick(&sensors(30, 90)), PetState::Idle(IdleMood::Anxious));
        let bored = Sensors {
            inactive_minutes: 15,
            ..sensors(50, 90)
        };
        assert_eq!(m.tick(&bored), PetState::Idle(IdleMood::Bored));
        assert_eq!(m.tick(&sensors(50, 90)), PetState::Idle(IdleMood::Normal));
    }

    #[test]
    fn low_mood_makes_the_pet_angry() {
        let (mut m, _) = machine_at(10);
        assert_eq!(m.tick(&sensors(10, 90)), PetState::Angry(WarningLevel::L1));
        assert_eq!(m.warning_level(), 1);

        assert!(m.escalate_warning());
        assert!(m.escalate_warning());
        assert!(m.escalate_warning());
        assert_eq!(m.state(), PetState::Angry(WarningLevel::L3));
        assert_eq!(m.warning_level(), 3);

        // Staying angry keeps the escalated level.
        assert_eq!(m.tick(&sensors(10, 90)), PetState::Angry(WarningLevel::L3));

        assert!(m.reset_warning());
        assert_eq!(m.state(), PetState::Idle(IdleMood::Normal));
        assert_eq!(m.warning_level(), 0);
    }

    #[test]
    fn interaction_window_then_back_to_idle() {
        let (mut m, clock) = machine_at(10);
        assert!(m.trigger_interaction(InteractionKind::Chatting));
        assert_eq!(m.tick(&sensors(50, 90)), PetState::Interaction(InteractionKind::Chatting));

        clock.advance(Duration::seconds(6));
        assert_eq!(m.tick(&sensors(50, 90)), PetState::Idle(IdleMood::Normal));
    }

    #[test]
    fn monitoring_means_working() {
        let (mut m, _) = machine_at(10);
        let s = Sensors {
            is_monitoring: true,
            ..sensors(50, 90)
        };
        assert_eq!(m.tick(&s), PetState::Working(WorkKind::Monitoring));
    }

    #[test]
    fn illegal_transition_changes_nothing() {
        let (mut m, _) = machine_at(10);
        m.trigger_interaction(InteractionKind::Playing);
        m.drain_events();
        let before = m.last_transition_at();

        assert!(!m.transition_to(PetState::Working(WorkKind::Monitoring)));
        assert_eq!(m.state(), PetState::Interaction(InteractionKind::Playing));
        assert_eq!(m.last_transition_at(), before);
        assert!(m.drain_events().is_empty());

        // Self transitions are always fine.
        assert!(m.transition_to(PetState::Interaction(InteractionKind::Playing)));
    }

    #[test]
    fn night_tick_puts_idle_pet_to_sleep_and_keeps_it_there() {
        let (mut m, _) = machine_at(23);
        assert_eq!(m.tick(&sensors(50, 90)), PetState::Sleeping(SleepDepth::Light));
        let events = m.drain_events();
        assert!(events.contains(&BehaviorEvent::FellAsleep {
            reason: SleepReason::NightTime
        }));

        // Even a furious pet stays asleep.
        assert_eq!(m.tick(&sensors(5, 90)), PetState::Sleeping(SleepDepth::Light));
    }

    #[test]
    fn rejected_sleep_falls_through_to_later_rules() {
        let (mut m, _) = machine_at(23);
        m.transition_to(PetState::Working(WorkKind::Monitoring));
        let s = Sensors {
            is_monitoring: true,
            ..sensors(50, 90)
        };
        // WORKING cannot go straight to SLEEPING.
        assert_eq!(m.tick(&s), PetState::Working(WorkKind::Monitoring));
        // Once idle at night, the next tick sleeps.
        assert_eq!(m.tick(&sensors(50, 90)), PetState::Idle(IdleMood::Sleepy));
        assert_eq!(m.tick(&sensors(50, 90)), PetState::Sleeping(SleepDepth::Light));
    }

    #[test]
    fn interaction_wakes_only_after_ten_minutes() {
        let (mut m, clock) = machine_at(23);
        m.tick(&sensors(50, 90));
        m.drain_events();

        clock.advance(Duration::minutes(5));
        assert!(!m.trigger_interaction(InteractionKind::BeingTouched));
        assert!(m.state().is_sleeping());

        clock.advance(Duration::minutes(6));
        assert!(m.trigger_interaction(InteractionKind::BeingTouched));
        assert_eq!(m.state(), PetState::Interaction(InteractionKind::BeingTouched));
        let events = m.drain_events();
        let woke = events.iter().find_map(|e| match e {
            BehaviorEvent::WokeUp(r) => Some(r.clone()),
            _ => None,
        });
        let report = woke.unwrap();
        assert_eq!(report.reason, WakeReason::Interaction);
        assert_eq!(report.slept_minutes, 11);
        assert_eq!(report.mood_recovered, 11);
    }

    #[test]
    fn deep_sleep_then_morning_wake() {
        let (mut m, clock) = machine_at(1);
        m.tick(&sensors(50, 90));
        assert!(!m.take_consolidation());

        clock.advance(Duration::minutes(30));
        assert_eq!(m.check_sleep(), SleepCheck::EnteredDeepSleep);
        assert_eq!(m.state(), PetState::Sleeping(SleepDepth::Deep));
        assert!(m.take_consolidation());
        assert!(!m.take_consolidation());
        assert_eq!(m.check_sleep(), SleepCheck::Nothing);

        // 07:00
        clock.advance(Duration::hours(5) + Duration::minutes(30));
        match m.check_sleep() {
            SleepCheck::Woke(report) => {
                assert_eq!(report.reason, WakeReason::Morning);
                assert_eq!(report.mood_recovered, 30);
            }
            other => panic!("expected wake, got {other:?}"),
        }
        assert_eq!(m.state(), PetState::Idle(IdleMood::Normal));
    }

    #[test]
    fn manual_wake_and_sleep() {
        let (mut m, _) = machine_at(14);
        assert!(m.wake_up(WakeReason::Manual).is_none());
        assert!(m.begin_sleep(SleepReason::Manual));
        assert!(!m.begin_sleep(SleepReason::Manual));
        let report = m.wake_up(WakeReason::Manual).unwrap();
        assert_eq!(report.slept_minutes, 0);
        assert_eq!(m.root(), RootState::Idle);
        assert!(!m.sleep().is_sleeping());
    }

    #[test]
    fn restored_sleep_wakes_if_overdue() {
        let clock = Arc::new(ManualClock::at_hour(1));
        let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
        {
            let mut m = BehaviorStateMachine::with_persistence(
                BehaviorConfig::default(),
                SleepConfig::default(),
                clock.clone(),
                kv.clone(),
            );
            m.tick(&sensors(50, 90));
            assert!(m.state().is_sleeping());
        }

        let restored = BehaviorStateMachine::with_persistence(
            BehaviorConfig::default(),
            SleepConfig::default(),
            clock.clone(),
            kv.clone(),
        );
        assert_eq!(restored.state(), PetState::Sleeping(SleepDepth::Light));

        clock.advance(Duration::hours(9));
        let mut woke = BehaviorStateMachine::with_persistence(
            BehaviorConfig::default(),
            SleepConfig::default(),
            clock.clone(),
            kv,
        );
        assert_eq!(woke.root(), RootState::Idle);
        assert!(
            woke.drain_events()
                .iter()
                .any(|e| matches!(e, BehaviorEvent::WokeUp(_)))
        );
    }
}
