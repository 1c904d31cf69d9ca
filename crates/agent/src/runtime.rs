//! Background driver for a [`ResponseController`].
//!
//! One task owns the periodic work: behavior ticks, the sleep check and
//! dreams. Host events go through [`Companion::handle_event`] and share the
//! same lock, so a tick never interleaves with a half-handled event.

use petmind_config::AppConfig;
use petmind_core::{DomainEvent, EventBus, PetReply};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::controller::ResponseController;
use crate::event::InteractionEvent;

/// Periods of the background jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub tick: Duration,
    pub wake_check: Duration,
    pub dream: Duration,
}

impl Schedule {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            tick: Duration::from_secs(config.behavior.tick_secs.max(1)),
            wake_check: Duration::from_secs(config.sleep.wake_check_secs.max(1)),
            dream: Duration::from_secs(config.sleep.dream_interval_secs.max(1)),
        }
    }
}

pub struct Companion {
    controller: Arc<Mutex<ResponseController>>,
    events: Arc<EventBus>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Companion {
    /// Spawn the background loop. Must be called inside a tokio runtime.
    pub fn start(controller: ResponseController, schedule: Schedule) -> Self {
        let events = controller.events().clone();
        let controller = Arc::new(Mutex::new(controller));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(controller.clone(), schedule, shutdown_rx));
        info!(
            tick_secs = schedule.tick.as_secs(),
            wake_check_secs = schedule.wake_check.as_secs(),
            "Companion started"
        );
        Self {
            controller,
            events,
            shutdown_tx,
            task,
        }
    }

    pub async fn handle_event(&self, event: InteractionEvent) -> PetReply {
        self.controller.lock().await.handle_event(event).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.events.subscribe()
    }

    pub fn controller(&self) -> &Arc<Mutex<ResponseController>> {
        &self.controller
    }

    /// Stop the loop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Background loop ended abnormally");
        }
        info!("Companion stopped");
    }
}

async fn run(
    controller: Arc<Mutex<ResponseController>>,
    schedule: Schedule,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut tick = tokio::time::interval(schedule.tick);
    let mut wake_check = tokio::time::interval(schedule.wake_check);
    let mut dream = tokio::time::interval(schedule.dream);
    for interval in [&mut tick, &mut wake_check, &mut dream] {
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    }

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = tick.tick() => {
                let state = controller.lock().await.tick();
                debug!(state = %state, "Behavior tick");
            }
            _ = wake_check.tick() => {
                if let Some(report) = controller.lock().await.check_sleep() {
                    debug!(triples_removed = report.triples_removed, "Consolidated during sleep");
                }
            }
            _ = dream.tick() => {
                controller.lock().await.dream();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedDispatcher, controller_with};
    use petmind_behavior::RootState;

    fn fast_schedule() -> Schedule {
        Schedule {
            tick: Duration::from_secs(1),
            wake_check: Duration::from_secs(60),
            dream: Duration::from_secs(300),
        }
    }

    #[test]
    fn schedule_follows_config() {
        let s = Schedule::from_config(&AppConfig::default());
        assert_eq!(s.wake_check, Duration::from_secs(60));
        assert_eq!(s.dream, Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn loop_ticks_until_shutdown() {
        let dispatcher = Arc::new(ScriptedDispatcher::new(vec![]));
        let (controller, _, _) = controller_with(dispatcher, 1);
        let companion = Companion::start(controller, fast_schedule());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(
            companion.controller().lock().await.behavior().root(),
            RootState::Sleeping
        );
        companion.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn events_reach_subscribers() {
        let dispatcher = Arc::new(ScriptedDispatcher::new(vec![Ok(
            r#"{"text":"在呢","emotion":"happy","action":"wave"}"#.into(),
        )]));
        let (controller, _, _) = controller_with(dispatcher, 14);
        let companion = Companion::start(controller, fast_schedule());
        let mut rx = companion.subscribe();

        let reply = companion
            .handle_event(InteractionEvent::chat("在吗"))
            .await;
        assert_eq!(reply.text, "在呢");

        let mut produced = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event.as_ref(), DomainEvent::ReplyProduced { .. }) {
                produced = true;
            }
        }
        assert!(produced);
        companion.shutdown().await;
    }
}
