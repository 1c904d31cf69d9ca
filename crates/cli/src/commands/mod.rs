pub mod chat;
pub mod memory;
pub mod onboard;
pub mod poke;
pub mod status;

use petmind_agent::{Collaborators, ResponseController};
use petmind_config::AppConfig;
use petmind_core::{
    DispatchError, Dispatcher, EventBus, FileStore, KeyValueStore, PetReply, PresentationSink,
    SharedSensors, SystemClock,
};
use petmind_providers::OpenAiCompatDispatcher;
use std::sync::Arc;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub fn load_config() -> petmind_core::Result<AppConfig> {
    Ok(AppConfig::load()?)
}

pub fn open_store(config: &AppConfig) -> Arc<dyn KeyValueStore> {
    Arc::new(FileStore::new(config.storage.resolved_dir()))
}

/// Build the HTTP dispatcher, explaining how to fix a missing key.
pub fn build_dispatcher(config: &AppConfig) -> petmind_core::Result<Arc<dyn Dispatcher>> {
    match OpenAiCompatDispatcher::from_config(&config.dispatcher) {
        Ok(dispatcher) => Ok(Arc::new(dispatcher)),
        Err(DispatchError::NotConfigured(reason)) => {
            eprintln!();
            eprintln!("  ERROR: the pet has no voice yet ({reason})");
            eprintln!();
            eprintln!("  Set one of these environment variables:");
            eprintln!("    PETMIND_API_KEY = 'sk-...'");
            eprintln!("    OPENAI_API_KEY  = 'sk-...'");
            eprintln!();
            eprintln!("  Or add it to your config file:");
            eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
            eprintln!();
            Err(DispatchError::NotConfigured(reason).into())
        }
        Err(e) => Err(e.into()),
    }
}

/// A controller backed by the file store and the system clock.
pub fn build_controller(
    config: &AppConfig,
    dispatcher: Arc<dyn Dispatcher>,
    sink: Arc<dyn PresentationSink>,
) -> ResponseController {
    ResponseController::new(
        config,
        Collaborators {
            dispatcher,
            sensors: Arc::new(SharedSensors::default()),
            sink,
            clock: Arc::new(SystemClock),
            persistence: Some(open_store(config)),
            events: Arc::new(EventBus::default()),
        },
    )
}

/// Prints each reply as a speech bubble line.
pub struct TerminalSink {
    pet_name: String,
}

impl TerminalSink {
    pub fn new(pet_name: impl Into<String>) -> Self {
        Self {
            pet_name: pet_name.into(),
        }
    }
}

impl PresentationSink for TerminalSink {
    fn present(&self, reply: &PetReply) {
        println!("  {} > {}", self.pet_name, reply.text);
        println!(
            "      [{} · {} · {}ms · {:?}]",
            reply.emotion.as_str(),
            reply.action.as_str(),
            reply.duration_ms,
            reply.source
        );
    }
}
