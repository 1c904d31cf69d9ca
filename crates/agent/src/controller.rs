//! The response controller: one entry point per interaction event.
//!
//! ```text
//! event ─► behavior.trigger_interaction
//!       ─► ladder level ≥ 2? ──yes──► local reply
//!                 │ no
//!                 ▼
//!          assemble bundle ─► dispatch (raced against the level budget)
//!                 │ ok                         │ err / timeout
//!                 ▼                            ▼
//!          parse, write memory,        record_failure, local reply at
//!          record_success              the new level (at least 2)
//! ```
//!
//! [`ResponseController::handle_event`] never fails. Whatever happens
//! downstream the caller gets a renderable [`PetReply`].

use petmind_behavior::{
    BehaviorEvent, BehaviorStateMachine, DailySummary, Dream, PetState, ReflectionJournal,
    SleepCheck, WakeReason, WakeReport,
};
use petmind_config::AppConfig;
use petmind_core::{
    Clock, DispatchError, Dispatcher, DomainEvent, EventBus, KeyValueStore, PetReply,
    PresentationSink, SensorSource, Sensors,
};
use petmind_memory::{MemoryMetadata, MemoryRole, MemoryStore};
use petmind_providers::{
    DegradationLevel, FallbackController, LevelChange, static_reply, template_reply,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::context::{AssemblyInput, ContextAssembler};
use crate::event::InteractionEvent;
use crate::parser::ReplyParser;

/// The host-supplied collaborators.
pub struct Collaborators {
    pub dispatcher: Arc<dyn Dispatcher>,
    pub sensors: Arc<dyn SensorSource>,
    pub sink: Arc<dyn PresentationSink>,
    pub clock: Arc<dyn Clock>,
    /// `None` keeps everything in memory.
    pub persistence: Option<Arc<dyn KeyValueStore>>,
    pub events: Arc<EventBus>,
}

/// What the deep-sleep consolidation job did.
#[derive(Debug, Clone)]
pub struct ConsolidationReport {
    pub summary: DailySummary,
    pub summary_written: bool,
    pub triples_removed: usize,
}

pub struct ResponseController {
    dispatcher: Arc<dyn Dispatcher>,
    sensors: Arc<dyn SensorSource>,
    sink: Arc<dyn PresentationSink>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
    fallback: FallbackController,
    memory: MemoryStore,
    behavior: BehaviorStateMachine,
    reflection: ReflectionJournal,
    assembler: ContextAssembler,
    parser: ReplyParser,
    history_turns: usize,
    triple_retention: usize,
}

impl ResponseController {
    pub fn new(config: &AppConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            dispatcher,
            sensors,
            sink,
            clock,
            persistence,
            events,
        } = collaborators;

        let (fallback, memory, behavior, reflection) = match persistence {
            Some(kv) => (
                FallbackController::with_persistence(
                    config.fallback.clone(),
                    clock.clone(),
                    kv.clone(),
                ),
                MemoryStore::with_persistence(config.memory.clone(), clock.clone(), kv.clone()),
                BehaviorStateMachine::with_persistence(
                    config.behavior.clone(),
                    config.sleep.clone(),
                    clock.clone(),
                    kv.clone(),
                ),
                ReflectionJournal::with_persistence(kv),
            ),
            None => (
                FallbackController::new(config.fallback.clone(), clock.clone()),
                MemoryStore::new(config.memory.clone(), clock.clone()),
                BehaviorStateMachine::new(
                    config.behavior.clone(),
                    config.sleep.clone(),
                    clock.clone(),
                ),
                ReflectionJournal::new(),
            ),
        };

        let mut controller = Self {
            dispatcher,
            sensors,
            sink,
            clock,
            events,
            fallback,
            memory,
            behavior,
            reflection,
            assembler: ContextAssembler::new(config.persona.clone(), &config.reply),
            parser: ReplyParser::new(&config.reply),
            history_turns: config.memory.max_context_messages,
            triple_retention: config.sleep.triple_retention,
        };
        // A restored sleep may have woken up during construction.
        controller.publish_behavior_events();
        controller
    }

    pub fn fallback(&self) -> &FallbackController {
        &self.fallback
    }

    pub fn fallback_mut(&mut self) -> &mut FallbackController {
        &mut self.fallback
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryStore {
        &mut self.memory
    }

    pub fn behavior(&self) -> &BehaviorStateMachine {
        &self.behavior
    }

    pub fn reflection(&self) -> &ReflectionJournal {
        &self.reflection
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn dispatcher_name(&self) -> &str {
        self.dispatcher.name()
    }

    /// Respond to one event. Always returns a reply, possibly degraded.
    pub async fn handle_event(&mut self, event: InteractionEvent) -> PetReply {
        let sensors = self.sensors.read();
        if let Some(kind) = event.interaction_kind() {
            self.behavior.trigger_interaction(kind);
        }
        self.publish_behavior_events();

        let level = self.fallback.level();
        let reply = match self.fallback.timeout() {
            Some(budget) => self.dispatch(&event, &sensors, level, budget).await,
            None => local_reply(level, &event, sensors.mood),
        };

        self.sink.present(&reply);
        self.events.publish(DomainEvent::ReplyProduced {
            event_type: event.event_type().to_string(),
            source: format!("{:?}", reply.source).to_lowercase(),
            level: self.fallback.level().as_u8(),
            timestamp: self.clock.now(),
        });
        reply
    }

    async fn dispatch(
        &mut self,
        event: &InteractionEvent,
        sensors: &Sensors,
        level: DegradationLevel,
        budget: Duration,
    ) -> PetReply {
        let bundle = {
            let full = level == DegradationLevel::Full;
            let memory_prompt = if full {
                self.memory.build_memory_prompt()
            } else {
                String::new()
            };
            let history = if full {
                self.memory.history_for_dispatch(self.history_turns)
            } else {
                Vec::new()
            };
            let input = AssemblyInput {
                event,
                sensors,
                state: self.behavior.state(),
                hour: self.clock.local_hour(),
                memory_prompt: &memory_prompt,
                history: &history,
            };
            self.assembler.build_for_level(level, &input)
        };

        debug!(
            level = level.as_u8(),
            tokens = bundle.estimated_tokens,
            budget_ms = budget.as_millis() as u64,
            dispatcher = self.dispatcher.name(),
            "Dispatching"
        );

        // The timeout drops the in-flight request, so a late reply can never
        // land after a fallback reply was produced.
        let outcome = match tokio::time::timeout(budget, self.dispatcher.send(&bundle)).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Timeout(format!(
                "no reply within {}ms",
                budget.as_millis()
            ))),
        };

        match outcome {
            Ok(raw) => {
                let reply = self.parser.parse(&raw);
                let user_metadata = event
                    .memory_event_type()
                    .map(MemoryMetadata::for_event)
                    .unwrap_or_default();
                self.memory
                    .add_memory(MemoryRole::User, &event.user_message(), user_metadata);
                self.memory
                    .add_memory(MemoryRole::Pet, &reply.text, MemoryMetadata::default());
                let change = self.fallback.record_success();
                self.publish_level_change(change);
                reply
            }
            Err(e) => {
                warn!(error = %e, level = level.as_u8(), "Dispatch failed, degrading");
                let change = self.fallback.record_failure(&e);
                self.publish_level_change(change);
                // Never a second network attempt within one event.
                let next = self.fallback.level().max(DegradationLevel::Template);
                local_reply(next, event, sensors.mood)
            }
        }
    }

    /// One behavior tick against fresh sensors.
    pub fn tick(&mut self) -> PetState {
        let sensors = self.sensors.read();
        let state = self.behavior.tick(&sensors);
        self.publish_behavior_events();
        state
    }

    /// The periodic sleep check. Runs consolidation once per deep sleep,
    /// including a deep sleep that was already reached while restoring.
    pub fn check_sleep(&mut self) -> Option<ConsolidationReport> {
        let check = self.behavior.check_sleep();
        self.publish_behavior_events();
        if matches!(check, SleepCheck::Woke(_)) || !self.behavior.sleep().is_deep() {
            return None;
        }
        if self.behavior.take_consolidation() {
            return Some(self.run_consolidation());
        }
        None
    }

    pub fn wake_up(&mut self, reason: WakeReason) -> Option<WakeReport> {
        let report = self.behavior.wake_up(reason);
        self.publish_behavior_events();
        report
    }

    /// Write the daily summary and trim the knowledge graph.
    pub fn run_consolidation(&mut self) -> ConsolidationReport {
        let sensors = self.sensors.read();
        let (summary, summary_written) = self
            .reflection
            .generate_daily_summary(&sensors, self.clock.now());
        let triples_removed = self.memory.trim_triples(self.triple_retention);

        info!(summary_written, triples_removed, "Consolidation finished");
        self.events.publish(DomainEvent::ConsolidationRan {
            summary_written,
            triples_removed,
            timestamp: self.clock.now(),
        });
        ConsolidationReport {
            summary,
            summary_written,
            triples_removed,
        }
    }

    /// A dream to show, when asleep.
    pub fn dream(&self) -> Option<Dream> {
        let dream = self.behavior.dream()?;
        self.events.publish(DomainEvent::Dreamed {
            emoji: dream.emoji.to_string(),
            content: dream.content.to_string(),
            timestamp: self.clock.now(),
        });
        Some(dream)
    }

    fn publish_level_change(&self, change: Option<LevelChange>) {
        if let Some(change) = change {
            self.events.publish(DomainEvent::LevelChanged {
                from: change.from.as_u8(),
                to: change.to.as_u8(),
                reason: change.reason.as_str().to_string(),
                timestamp: self.clock.now(),
            });
        }
    }

    fn publish_behavior_events(&mut self) {
        for event in self.behavior.drain_events() {
            let domain = match event {
                BehaviorEvent::Transitioned { from, to } => DomainEvent::StateChanged {
                    from: from.to_string(),
                    to: to.to_string(),
                    timestamp: self.clock.now(),
                },
                BehaviorEvent::FellAsleep { reason } => DomainEvent::SleepStarted {
                    reason: reason.as_str().to_string(),
                    timestamp: self.clock.now(),
                },
                BehaviorEvent::WokeUp(report) => DomainEvent::WokeUp {
                    reason: report.reason.as_str().to_string(),
                    slept_minutes: report.slept_minutes,
                    mood_recovered: report.mood_recovered,
                    timestamp: self.clock.now(),
                },
                // The depth change already shows up as a transition.
                BehaviorEvent::EnteredDeepSleep => continue,
            };
            self.events.publish(domain);
        }
    }
}

fn local_reply(level: DegradationLevel, event: &InteractionEvent, mood: u32) -> PetReply {
    match level {
        DegradationLevel::Static => static_reply(mood),
        _ => template_reply(event.event_type(), mood),
    }
}
