//! Conversational memory for PetMind.
//!
//! Entries are scored on insert (importance 1..=5, tags, kind), pruned to a
//! fixed capacity by importance then recency, and retrieved with a
//! keyword filter ranked by importance discounted over time. User turns
//! feed a small fact sheet and a deduplicated knowledge graph.

pub mod decay;
pub mod entry;
pub mod facts;
pub mod graph;
pub mod importance;
pub mod store;

pub use decay::time_decay_weight;
pub use entry::{MemoryEntry, MemoryKind, MemoryMetadata, MemoryRole};
pub use facts::{ExtractedFact, FactSheet};
pub use graph::{KnowledgeGraph, KnowledgeTriple, TripleQuery};
pub use importance::{calculate_importance, classify_kind, extract_tags};
pub use store::{MemoryStats, MemoryStore, ScoredMemory, truncate_chars};
