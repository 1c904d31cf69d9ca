//! Minimal knowledge graph: a deduplicated list of (subject, predicate,
//! object) triples in insertion order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeTriple {
    pub id: String,
    pub subject: String,
    pub predicate: String,
    pub object: String,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeTriple {
    fn same_fact(&self, subject: &str, predicate: &str, object: &str) -> bool {
        self.subject == subject && self.predicate == predicate && self.object == object
    }
}

/// Partial match over triples. `None` fields match anything.
#[derive(Debug, Clone, Default)]
pub struct TripleQuery {
    pub subject: Option<String>,
    pub predicate: Option<String>,
    pub object: Option<String>,
}

impl TripleQuery {
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    fn matches(&self, triple: &KnowledgeTriple) -> bool {
        let field_ok =
            |want: &Option<String>, have: &str| want.as_deref().is_none_or(|w| w == have);
        field_ok(&self.subject, &triple.subject)
            && field_ok(&self.predicate, &triple.predicate)
            && field_ok(&self.object, &triple.object)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnowledgeGraph {
    triples: Vec<KnowledgeTriple>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn triples(&self) -> &[KnowledgeTriple] {
        &self.triples
    }

    /// Insert a triple unless an identical one already exists.
    /// Returns whether anything was inserted.
    pub fn add(
        &mut self,
        subject: &str,
        predicate: &str,
        object: &str,
        now: DateTime<Utc>,
    ) -> bool {
        if self
            .triples
            .iter()
            .any(|t| t.same_fact(subject, predicate, object))
        {
            return false;
        }
        debug!(subject, predicate, object, "Knowledge triple added");
        self.triples.push(KnowledgeTriple {
            id: Uuid::new_v4().to_string(),
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: object.to_string(),
            created_at: now,
        });
        true
    }

    pub fn query(&self, query: &TripleQuery) -> Vec<&KnowledgeTriple> {
        self.triples.iter().filter(|t| query.matches(t)).collect()
    }

    /// Keep only the `keep` most recently created triples. Returns how many
    /// were removed.
    pub fn trim_to(&mut self, keep: usize) -> usize {
        if self.triples.len() <= keep {
            return 0;
        }
        self.triples.sort_by_key(|t| t.created_at);
        let removed = self.triples.len() - keep;
        self.triples.drain(..removed);
        removed
    }

    pub fn clear(&mut self) {
        self.triples.clear();
    }
}
