//! The companion's response path.
//!
//! Each interaction event flows through one pipeline:
//!
//! 1. **Notify** the behavior machine (touch, chat, play)
//! 2. **Pick a level** from the degradation ladder
//! 3. **Assemble** a prompt bundle sized for that level
//! 4. **Dispatch** under the level's time budget, or answer locally
//! 5. **Parse** the raw reply into something renderable
//! 6. **Remember** the exchange and report to the ladder
//!
//! [`Companion`] wraps the controller with the periodic jobs (behavior
//! ticks, sleep checks, dreams).

pub mod context;
pub mod controller;
pub mod event;
pub mod parser;
pub mod runtime;

#[cfg(test)]
mod test_helpers;

pub use context::{AssemblyInput, ContextAssembler};
pub use controller::{Collaborators, ConsolidationReport, ResponseController};
pub use event::{Gesture, InteractionEvent};
pub use parser::{ParseError, ReplyParser};
pub use runtime::{Companion, Schedule};
