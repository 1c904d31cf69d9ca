//! The memory store: scored conversational entries, the fact sheet and the
//! knowledge graph, persisted best-effort through a [`KeyValueStore`].

use chrono::{DateTime, Utc};
use petmind_config::MemoryConfig;
use petmind_core::storage::{load_json_or_warn, save_json};
use petmind_core::{ChatTurn, Clock, KeyValueStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::decay::time_decay_weight;
use crate::entry::{MemoryEntry, MemoryMetadata, MemoryRole};
use crate::facts::FactSheet;
use crate::graph::{KnowledgeGraph, KnowledgeTriple, TripleQuery};
use crate::importance::{calculate_importance, classify_kind, extract_tags};

/// Persistence key for entries and facts.
pub const MEMORY_KEY: &str = "ai_memory";
/// Persistence key for the knowledge graph.
pub const KNOWLEDGE_GRAPH_KEY: &str = "knowledge_graph";

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Entries with at least this importance count as "high" in [`MemoryStats`].
const HIGH_IMPORTANCE: u8 = 4;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedMemory {
    #[serde(default)]
    conversations: Vec<MemoryEntry>,
    #[serde(default)]
    facts: FactSheet,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

/// A search hit with its composite score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMemory {
    pub entry: MemoryEntry,
    /// `importance × decay_weight`
    pub score: f64,
    pub decay_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryStats {
    pub total_memories: usize,
    pub high_importance: usize,
    pub facts_known: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub knowledge_triples: usize,
}

pub struct MemoryStore {
    config: MemoryConfig,
    clock: Arc<dyn Clock>,
    persistence: Option<Arc<dyn KeyValueStore>>,
    entries: Vec<MemoryEntry>,
    facts: FactSheet,
    graph: KnowledgeGraph,
}

impl MemoryStore {
    /// A store with no persistence.
    pub fn new(config: MemoryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            persistence: None,
            entries: Vec::new(),
            facts: FactSheet::default(),
            graph: KnowledgeGraph::new(),
        }
    }

    /// A store that loads from and writes back to `persistence`.
    ///
    /// Unreadable records are logged and treated as empty.
    pub fn with_persistence(
        config: MemoryConfig,
        clock: Arc<dyn Clock>,
        persistence: Arc<dyn KeyValueStore>,
    ) -> Self {
        let saved: PersistedMemory =
            load_json_or_warn(persistence.as_ref(), MEMORY_KEY).unwrap_or_default();
        let graph: KnowledgeGraph =
            load_json_or_warn(persistence.as_ref(), KNOWLEDGE_GRAPH_KEY).unwrap_or_default();
        info!(
            entries = saved.conversations.len(),
            triples = graph.len(),
            "Memory loaded"
        );
        Self {
            config,
            clock,
            persistence: Some(persistence),
            entries: saved.conversations,
            facts: saved.facts,
            graph,
        }
    }

    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    pub fn facts(&self) -> &FactSheet {
        &self.facts
    }

    pub fn graph(&self) -> &KnowledgeGraph {
        &self.graph
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a turn. Importance, tags and kind are computed here; user turns
    /// also feed the fact sheet and the knowledge graph.
    pub fn add_memory(
        &mut self,
        role: MemoryRole,
        content: &str,
        metadata: MemoryMetadata,
    ) -> &MemoryEntry {
        let now = self.clock.now();
        let importance = calculate_importance(role, content);
        let mut tags = extract_tags(content);
        for extra in metadata.extra_tags {
            if !tags.contains(&extra) {
                tags.push(extra);
            }
        }
        let kind = metadata.kind.unwrap_or_else(|| classify_kind(&tags));

        let entry = MemoryEntry {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.to_string(),
            created_at: now,
            importance,
            tags,
            kind,
            event_type: metadata.event_type,
        };
        let id = entry.id.clone();
        debug!(
            role = role.as_str(),
            importance,
            kind = ?kind,
            "Memory added"
        );
        self.entries.push(entry);

        if self.entries.len() > self.config.capacity {
            self.prune();
        }

        if role == MemoryRole::User {
            let learned = self.facts.absorb(content, now.date_naive());
            let mut graph_changed = false;
            for fact in &learned {
                if let Some((s, p, o)) = fact.as_triple() {
                    info!(fact = ?fact, "Learned a fact");
                    graph_changed |= self.graph.add(s, p, o, now);
                }
            }
            if graph_changed {
                self.save_graph();
            }
        }

        self.save_entries();

        // The new entry may itself have been pruned; fall back to the newest.
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .unwrap_or(self.entries.len().saturating_sub(1));
        &self.entries[index]
    }

    /// Drop down to capacity, keeping the highest `(importance, created_at)`
    /// entries. Survivors keep their chronological order.
    fn prune(&mut self) {
        let capacity = self.config.capacity.max(1);
        let mut ranked: Vec<usize> = (0..self.entries.len()).collect();
        ranked.sort_by(|&a, &b| {
            let (ea, eb) = (&self.entries[a], &self.entries[b]);
            eb.importance
                .cmp(&ea.importance)
                .then(eb.created_at.cmp(&ea.created_at))
                .then(b.cmp(&a))
        });
        let mut keep = vec![false; self.entries.len()];
        for &i in ranked.iter().take(capacity) {
            keep[i] = true;
        }
        let before = self.entries.len();
        let mut flags = keep.into_iter();
        self.entries.retain(|_| flags.next().unwrap_or(false));
        debug!(before, after = self.entries.len(), "Memory pruned");
    }

    /// Entries containing any query keyword, ranked by
    /// `importance × time_decay_weight(age)`. A blank query matches nothing.
    pub fn smart_search(&self, query: &str, limit: usize) -> Vec<ScoredMemory> {
        let keywords: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if keywords.is_empty() {
            return Vec::new();
        }

        let now = self.clock.now();
        let mut hits: Vec<ScoredMemory> = self
            .entries
            .iter()
            .filter(|e| {
                let content = e.content.to_lowercase();
                keywords.iter().any(|kw| content.contains(kw.as_str()))
            })
            .map(|e| {
                let decay_weight = self.decay_weight(e.created_at, now);
                ScoredMemory {
                    entry: e.clone(),
                    score: f64::from(e.importance) * decay_weight,
                    decay_weight,
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.entry.created_at.cmp(&a.entry.created_at))
        });
        hits.truncate(limit);
        hits
    }

    /// Decay weight of something created at `created_at`, as seen at `now`.
    pub fn decay_weight(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let age_days = (now - created_at).num_seconds() as f64 / SECONDS_PER_DAY;
        time_decay_weight(
            age_days,
            self.config.half_life_days,
            self.config.min_decay_weight,
        )
    }

    /// Insert a triple unless an identical one exists.
    pub fn add_triple(&mut self, subject: &str, predicate: &str, object: &str) -> bool {
        let added = self.graph.add(subject, predicate, object, self.clock.now());
        if added {
            self.save_graph();
        }
        added
    }

    pub fn query_knowledge_graph(&self, query: &TripleQuery) -> Vec<&KnowledgeTriple> {
        self.graph.query(query)
    }

    /// Keep only the `keep` most recent triples. Returns how many were removed.
    pub fn trim_triples(&mut self, keep: usize) -> usize {
        let removed = self.graph.trim_to(keep);
        if removed > 0 {
            info!(removed, kept = self.graph.len(), "Knowledge graph trimmed");
            self.save_graph();
        }
        removed
    }

    /// Render known facts and recent important turns as a prompt section.
    ///
    /// Returns an empty string when there is nothing to remember, so callers
    /// can skip the section entirely.
    pub fn build_memory_prompt(&self) -> String {
        let mut facts = Vec::new();
        if let Some(name) = &self.facts.user_name {
            facts.push(format!("- 用户自称: {name}"));
        }
        if let Some(name) = &self.facts.pet_name {
            facts.push(format!("- 你的名字: {name}（用户给你取的）"));
        }
        if let Some(app) = &self.facts.favorite_app {
            facts.push(format!("- 用户常用的学习App: {app}"));
        }
        if let Some(date) = &self.facts.first_meet_date {
            facts.push(format!("- 初次见面: {date}"));
        }
        if self.facts.total_chats > 0 {
            facts.push(format!("- 累计对话: {}次", self.facts.total_chats));
        }

        let important: Vec<&MemoryEntry> = self
            .entries
            .iter()
            .filter(|e| e.importance >= self.config.prompt_importance_threshold)
            .collect();
        let skip = important.len().saturating_sub(self.config.prompt_recent_limit);
        let recent: Vec<String> = important[skip..]
            .iter()
            .map(|e| {
                format!(
                    "[{}]: {}",
                    e.role.as_str(),
                    truncate_chars(&e.content, self.config.prompt_content_chars)
                )
            })
            .collect();

        if facts.is_empty() && recent.is_empty() {
            return String::new();
        }

        let mut parts = vec!["# 记忆片段".to_string()];
        parts.extend(facts);
        if !recent.is_empty() {
            parts.push("\n# 重要对话片段".to_string());
            parts.extend(recent);
        }
        parts.push("\n# 使用指南".to_string());
        parts.push("- 如果用户问\"你还记得吗\"，请引用上述记忆".to_string());
        parts.push("- 适时提及用户名或宠物名会让对话更亲切".to_string());
        parts.push("- 不要编造不存在的记忆".to_string());
        parts.join("\n")
    }

    /// The last `limit` turns as dispatcher history. Pet and system turns
    /// are sent as the assistant.
    pub fn history_for_dispatch(&self, limit: usize) -> Vec<ChatTurn> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries[skip..]
            .iter()
            .map(|e| match e.role {
                MemoryRole::User => ChatTurn::user(e.content.clone()),
                MemoryRole::Pet | MemoryRole::System => ChatTurn::assistant(e.content.clone()),
            })
            .collect()
    }

    /// History using the configured default length.
    pub fn recent_history(&self) -> Vec<ChatTurn> {
        self.history_for_dispatch(self.config.max_context_messages)
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            total_memories: self.entries.len(),
            high_importance: self
                .entries
                .iter()
                .filter(|e| e.importance >= HIGH_IMPORTANCE)
                .count(),
            facts_known: self.facts.known_count(),
            oldest: self.entries.iter().map(|e| e.created_at).min(),
            newest: self.entries.iter().map(|e| e.created_at).max(),
            knowledge_triples: self.graph.len(),
        }
    }

    /// Forget everything: entries, facts and triples.
    pub fn clear_all(&mut self) {
        self.entries.clear();
        self.facts = FactSheet::default();
        self.graph.clear();
        self.save_entries();
        self.save_graph();
        info!("All memories cleared");
    }

    fn save_entries(&self) {
        let Some(store) = &self.persistence else {
            return;
        };
        let record = PersistedMemory {
            conversations: self.entries.clone(),
            facts: self.facts.clone(),
            last_updated: Some(self.clock.now()),
        };
        if let Err(e) = save_json(store.as_ref(), MEMORY_KEY, &record) {
            warn!(error = %e, "Failed to persist memory");
        }
    }

    fn save_graph(&self) {
        let Some(store) = &self.persistence else {
            return;
        };
        if let Err(e) = save_json(store.as_ref(), KNOWLEDGE_GRAPH_KEY, &self.graph) {
            warn!(error = %e, "Failed to persist knowledge graph");
        }
    }
}

/// Cut `s` to at most `max` characters, marking the cut with "...".
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use petmind_core::{InMemoryStore, ManualClock};

    fn store_with_clock() -> (MemoryStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_hour(10));
        let store = MemoryStore::new(MemoryConfig::default(), clock.clone());
        (store, clock)
    }

    #[test]
    fn self_introduction_sets_name_and_max_importance() {
        let (mut store, _) = store_with_clock();
        let entry = store.add_memory(MemoryRole::User, "我叫小明", MemoryMetadata::default());
        assert_eq!(entry.importance, 5);
        assert_eq!(entry.kind, crate::MemoryKind::Fact);
        assert_eq!(store.facts().user_name.as_deref(), Some("小明"));
        assert_eq!(
            store
                .query_knowledge_graph(&TripleQuery::default().subject("user"))
                .len(),
            1
        );
    }

    #[test]
    fn pet_turns_do_not_extract_facts() {
        let (mut store, _) = store_with_clock();
        store.add_memory(MemoryRole::Pet, "我叫小明", MemoryMetadata::default());
        assert!(store.facts().user_name.is_none());
        assert_eq!(store.facts().total_chats, 0);
    }

    #[test]
    fn metadata_overrides_kind_and_adds_tags() {
        let (mut store, _) = store_with_clock();
        let meta = MemoryMetadata {
            kind: Some(crate::MemoryKind::Event),
            event_type: Some("tap".into()),
            extra_tags: vec!["gesture".into()],
        };
        let entry = store.add_memory(MemoryRole::User, "hello", meta);
        assert_eq!(entry.kind, crate::MemoryKind::Event);
        assert_eq!(entry.tags, vec!["gesture".to_string()]);
        assert_eq!(entry.event_type.as_deref(), Some("tap"));
    }

    #[test]
    fn pruning_keeps_highest_importance_then_newest() {
        let (mut store, clock) = store_with_clock();
        store.add_memory(MemoryRole::User, "我叫小明", MemoryMetadata::default());
        for i in 0..100 {
            clock.advance(Duration::seconds(1));
            store.add_memory(MemoryRole::Pet, &format!("line {i}"), MemoryMetadata::default());
        }

        assert_eq!(store.len(), 100);
        // The importance-5 entry survives; the oldest importance-1 line is gone.
        assert_eq!(store.entries()[0].content, "我叫小明");
        assert!(store.entries().iter().all(|e| e.content != "line 0"));
        assert_eq!(store.entries()[99].content, "line 99");

        // Survivors stay chronological.
        let times: Vec<_> = store.entries().iter().map(|e| e.created_at).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn smart_search_applies_time_decay() {
        let (mut store, clock) = store_with_clock();
        store.add_memory(MemoryRole::User, "我叫小明", MemoryMetadata::default());
        clock.advance(Duration::days(7));

        let hits = store.smart_search("小明", 5);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].decay_weight - 0.5).abs() < 1e-9);
        assert!((hits[0].score - 2.5).abs() < 1e-9);
    }

    #[test]
    fn smart_search_ranks_and_limits() {
        let (mut store, clock) = store_with_clock();
        store.add_memory(MemoryRole::Pet, "apple pie", MemoryMetadata::default());
        clock.advance(Duration::days(1));
        store.add_memory(
            MemoryRole::User,
            "I'm so happy about the apple",
            MemoryMetadata::default(),
        );
        store.add_memory(MemoryRole::Pet, "banana", MemoryMetadata::default());

        let hits = store.smart_search("APPLE cherry", 1);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].entry.content.contains("happy"));

        assert!(store.smart_search("   ", 5).is_empty());
        assert!(store.smart_search("durian", 5).is_empty());
    }

    #[test]
    fn memory_prompt_is_empty_without_material() {
        let (mut store, _) = store_with_clock();
        assert!(store.build_memory_prompt().is_empty());
        store.add_memory(MemoryRole::Pet, "hi", MemoryMetadata::default());
        assert!(store.build_memory_prompt().is_empty());
    }

    #[test]
    fn memory_prompt_lists_facts_and_recent_important_turns() {
        let (mut store, _) = store_with_clock();
        store.add_memory(MemoryRole::User, "我叫小明", MemoryMetadata::default());
        for i in 0..7 {
            store.add_memory(MemoryRole::User, &format!("问题{i}？"), MemoryMetadata::default());
            store.add_memory(MemoryRole::User, &format!("我很开心{i}"), MemoryMetadata::default());
        }
        let prompt = store.build_memory_prompt();
        assert!(prompt.contains("用户自称: 小明"));
        assert!(prompt.contains("不要编造"));
        // Only the five most recent importance >= 3 entries appear.
        assert!(prompt.contains("我很开心6"));
        assert!(prompt.contains("我很开心2"));
        assert!(!prompt.contains("我很开心1"));
        assert!(!prompt.contains("问题"));
    }

    #[test]
    fn history_maps_roles() {
        let (mut store, _) = store_with_clock();
        store.add_memory(MemoryRole::User, "one", MemoryMetadata::default());
        store.add_memory(MemoryRole::Pet, "two", MemoryMetadata::default());
        store.add_memory(MemoryRole::System, "three", MemoryMetadata::default());

        let history = store.history_for_dispatch(2);
        assert_eq!(history, vec![ChatTurn::assistant("two"), ChatTurn::assistant("three")]);
        assert_eq!(store.recent_history().len(), 3);
        assert!(store.history_for_dispatch(0).is_empty());
    }

    #[test]
    fn triples_dedup_and_trim() {
        let (mut store, clock) = store_with_clock();
        assert!(store.add_triple("user", "likes", "cats"));
        assert!(!store.add_triple("user", "likes", "cats"));
        for i in 0..5 {
            clock.advance(Duration::seconds(1));
            store.add_triple("user", "likes", &format!("thing{i}"));
        }
        assert_eq!(store.trim_triples(3), 3);
        assert_eq!(store.stats().knowledge_triples, 3);
    }

    #[test]
    fn persistence_roundtrip_and_clear() {
        let clock = Arc::new(ManualClock::at_hour(9));
        let kv: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
        {
            let mut store =
                MemoryStore::with_persistence(MemoryConfig::default(), clock.clone(), kv.clone());
            store.add_memory(MemoryRole::User, "给你取名团子", MemoryMetadata::default());
            store.add_memory(MemoryRole::Pet, "好呀", MemoryMetadata::default());
        }

        let mut reopened =
            MemoryStore::with_persistence(MemoryConfig::default(), clock.clone(), kv.clone());
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.facts().pet_name.as_deref(), Some("团子"));
        assert_eq!(reopened.graph().len(), 1);

        reopened.clear_all();
        let empty = MemoryStore::with_persistence(MemoryConfig::default(), clock, kv);
        assert!(empty.is_empty());
        assert!(empty.graph().is_empty());
        assert_eq!(empty.stats().facts_known, 0);
    }

    #[test]
    fn corrupted_record_starts_empty() {
        let kv = Arc::new(InMemoryStore::new());
        kv.set(MEMORY_KEY, "{broken").unwrap();
        let store = MemoryStore::with_persistence(
            MemoryConfig::default(),
            Arc::new(ManualClock::at_hour(9)),
            kv,
        );
        assert!(store.is_empty());
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_chars("你好世界", 2), "你好...");
        assert_eq!(truncate_chars("hi", 2), "hi");
    }
}
