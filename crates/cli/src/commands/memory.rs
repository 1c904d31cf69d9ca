//! `petmind memory`: Memory inspection commands.

use petmind_core::SystemClock;
use petmind_memory::{MemoryStore, TripleQuery, truncate_chars};
use std::sync::Arc;

use super::{CliResult, load_config, open_store};

fn open_memory() -> petmind_core::Result<MemoryStore> {
    let config = load_config()?;
    let store = open_store(&config);
    Ok(MemoryStore::with_persistence(
        config.memory.clone(),
        Arc::new(SystemClock),
        store,
    ))
}

pub async fn facts() -> CliResult {
    let memory = open_memory()?;
    let facts = memory.facts();

    println!("🧠 Known Facts");
    println!("==============");
    let show = |label: &str, value: Option<&str>| {
        println!("  {label:<12} {}", value.unwrap_or("(unknown)"));
    };
    show("User name:", facts.user_name.as_deref());
    show("Pet name:", facts.pet_name.as_deref());
    show("Study app:", facts.favorite_app.as_deref());
    show("Last mood:", facts.last_mood.as_deref());
    println!(
        "  {:<12} {}",
        "First met:",
        facts
            .first_meet_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "(unknown)".into())
    );
    println!("  {:<12} {}", "Chats:", facts.total_chats);

    Ok(())
}

pub async fn search(query: &str, limit: usize) -> CliResult {
    let memory = open_memory()?;

    println!("🔍 Searching memories for: \"{query}\"");
    println!();

    let results = memory.smart_search(query, limit);
    if results.is_empty() {
        println!("   No memories found.");
    } else {
        for (i, hit) in results.iter().enumerate() {
            println!(
                "  {:>2}. [score: {:.2}] {}: {}",
                i + 1,
                hit.score,
                hit.entry.role.as_str(),
                truncate_chars(&hit.entry.content, 80)
            );
            if !hit.entry.tags.is_empty() {
                println!("      tags: {}", hit.entry.tags.join(", "));
            }
        }
    }

    Ok(())
}

pub async fn triples(
    subject: Option<String>,
    predicate: Option<String>,
    object: Option<String>,
) -> CliResult {
    let memory = open_memory()?;
    let query = TripleQuery {
        subject,
        predicate,
        object,
    };

    let found = memory.query_knowledge_graph(&query);
    if found.is_empty() {
        println!("   No matching triples.");
    }
    for t in found {
        println!(
            "  {} —{}→ {}   ({})",
            t.subject,
            t.predicate,
            t.object,
            t.created_at.format("%Y-%m-%d")
        );
    }

    Ok(())
}

pub async fn clear() -> CliResult {
    let mut memory = open_memory()?;
    let before = memory.len();
    memory.clear_all();
    println!("🧹 Forgot {before} memories, all facts and all triples.");
    Ok(())
}
