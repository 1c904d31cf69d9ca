//! Dispatch-side pieces for petmind.
//!
//! - [`FallbackController`]: the degradation ladder
//! - [`templates`]: local replies for degraded levels
//! - [`OpenAiCompatDispatcher`]: the HTTP dispatcher

pub mod fallback;
pub mod openai_compat;
pub mod templates;

pub use fallback::{
    ChangeReason, DegradationLevel, FailureRecord, FallbackController, FallbackStats, LevelChange,
};
pub use openai_compat::OpenAiCompatDispatcher;
pub use templates::{MoodBucket, static_reply, template_reply};
