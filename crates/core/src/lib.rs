//! # PetMind Core
//!
//! Domain types, collaborator traits and error definitions for the PetMind
//! companion runtime. Every other crate depends inward on this one.
//!
//! The collaborators the host supplies are all traits here:
//! - [`Dispatcher`] for the external text-generation service
//! - [`KeyValueStore`] for persistence
//! - [`SensorSource`] for mood, hunger, growth and monitoring inputs
//! - [`PresentationSink`] for rendering replies
//! - [`Clock`] for wall-clock time

pub mod clock;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod reply;
pub mod sensors;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatcher::{ChatRole, ChatTurn, Dispatcher, PromptBundle};
pub use error::{DispatchError, Error, FailureClass, Result, StorageError};
pub use event::{DomainEvent, EventBus};
pub use reply::{Emotion, NullSink, PetAction, PetReply, PresentationSink, ReplySource};
pub use sensors::{SensorSource, Sensors, SharedSensors};
pub use storage::{FileStore, InMemoryStore, KeyValueStore};
