//! Prompt bundles per degradation level.
//!
//! | Level | Bundle  | Contents                                        |
//! |-------|---------|-------------------------------------------------|
//! | 0     | full    | persona, memory, state, behavior, schema, history |
//! | 1     | compact | one-line schema, mood and action                |
//! | 2, 3  | minimal | one instruction and the action                  |

pub mod assembler;
pub mod token;

pub use assembler::{AssemblyInput, ContextAssembler, mood_description, time_of_day};
