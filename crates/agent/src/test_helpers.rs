//! Shared test doubles for controller and runtime tests.

use crate::controller::{Collaborators, ResponseController};
use petmind_config::AppConfig;
use petmind_core::{
    Clock, DispatchError, Dispatcher, EventBus, KeyValueStore, ManualClock, PetReply,
    PresentationSink, PromptBundle, SharedSensors,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A dispatcher that returns a scripted sequence of results.
///
/// Each call to `send` pops the next result. Panics if more calls are made
/// than results provided.
pub struct ScriptedDispatcher {
    results: Mutex<VecDeque<Result<String, DispatchError>>>,
    bundles: Mutex<Vec<PromptBundle>>,
}

impl ScriptedDispatcher {
    pub fn new(results: Vec<Result<String, DispatchError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            bundles: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.bundles.lock().unwrap().len()
    }

    pub fn bundles(&self) -> Vec<PromptBundle> {
        self.bundles.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Dispatcher for ScriptedDispatcher {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, bundle: &PromptBundle) -> Result<String, DispatchError> {
        self.bundles.lock().unwrap().push(bundle.clone());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedDispatcher: no more results"))
    }
}

/// A dispatcher that always fails with the same error.
pub struct FailingDispatcher {
    error: DispatchError,
    calls: Mutex<usize>,
}

impl FailingDispatcher {
    pub fn new(error: DispatchError) -> Self {
        Self {
            error,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Dispatcher for FailingDispatcher {
    fn name(&self) -> &str {
        "failing"
    }

    async fn send(&self, _bundle: &PromptBundle) -> Result<String, DispatchError> {
        *self.calls.lock().unwrap() += 1;
        Err(self.error.clone())
    }
}

/// A dispatcher that never answers.
pub struct HangingDispatcher;

#[async_trait::async_trait]
impl Dispatcher for HangingDispatcher {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn send(&self, _bundle: &PromptBundle) -> Result<String, DispatchError> {
        std::future::pending().await
    }
}

/// A sink that keeps everything it was shown.
#[derive(Default)]
pub struct RecordingSink {
    replies: Mutex<Vec<PetReply>>,
}

impl RecordingSink {
    pub fn replies(&self) -> Vec<PetReply> {
        self.replies.lock().unwrap().clone()
    }
}

impl PresentationSink for RecordingSink {
    fn present(&self, reply: &PetReply) {
        self.replies.lock().unwrap().push(reply.clone());
    }
}

pub fn controller_with(
    dispatcher: Arc<dyn Dispatcher>,
    hour: u32,
) -> (ResponseController, Arc<RecordingSink>, Arc<EventBus>) {
    let (controller, sink, _) = controller_with_clock(dispatcher, hour);
    let events = controller.events().clone();
    (controller, sink, events)
}

pub fn controller_with_clock(
    dispatcher: Arc<dyn Dispatcher>,
    hour: u32,
) -> (ResponseController, Arc<RecordingSink>, Arc<ManualClock>) {
    build(dispatcher, hour, Arc::new(SharedSensors::default()))
}

pub fn controller_with_sensors(
    dispatcher: Arc<dyn Dispatcher>,
    hour: u32,
    sensors: Arc<SharedSensors>,
) -> (ResponseController, Arc<RecordingSink>, Arc<ManualClock>) {
    build(dispatcher, hour, sensors)
}

/// A controller restored from `store`, reading time from `clock`.
pub fn controller_with_store(
    dispatcher: Arc<dyn Dispatcher>,
    clock: Arc<ManualClock>,
    store: Arc<dyn KeyValueStore>,
) -> ResponseController {
    ResponseController::new(
        &AppConfig::default(),
        Collaborators {
            dispatcher,
            sensors: Arc::new(SharedSensors::default()),
            sink: Arc::new(RecordingSink::default()),
            clock: clock as Arc<dyn Clock>,
            persistence: Some(store),
            events: Arc::new(EventBus::default()),
        },
    )
}

fn build(
    dispatcher: Arc<dyn Dispatcher>,
    hour: u32,
    sensors: Arc<SharedSensors>,
) -> (ResponseController, Arc<RecordingSink>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_hour(hour));
    let sink = Arc::new(RecordingSink::default());
    let controller = ResponseController::new(
        &AppConfig::default(),
        Collaborators {
            dispatcher,
            sensors,
            sink: sink.clone(),
            clock: clock.clone() as Arc<dyn Clock>,
            persistence: None,
            events: Arc::new(EventBus::default()),
        },
    );
    (controller, sink, clock)
}
