//! `petmind status`: Show ladder, behavior and memory state.

use petmind_behavior::BehaviorStateMachine;
use petmind_core::{Clock, SystemClock};
use petmind_memory::MemoryStore;
use petmind_providers::FallbackController;
use std::sync::Arc;

use super::{CliResult, load_config, open_store};

pub async fn run() -> CliResult {
    let config = load_config()?;
    let store = open_store(&config);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let fallback =
        FallbackController::with_persistence(config.fallback.clone(), clock.clone(), store.clone());
    let behavior = BehaviorStateMachine::with_persistence(
        config.behavior.clone(),
        config.sleep.clone(),
        clock.clone(),
        store.clone(),
    );
    let memory = MemoryStore::with_persistence(config.memory.clone(), clock.clone(), store);

    println!("🐾 PetMind Status");
    println!("=================");
    println!("  Config dir:   {}", petmind_config::AppConfig::config_dir().display());
    println!("  State dir:    {}", config.storage.resolved_dir().display());
    println!("  Pet:          {}", config.persona.pet_name);
    println!("  Model:        {}", config.dispatcher.model);
    println!(
        "  API key:      {}",
        if config.has_api_key() { "configured" } else { "missing" }
    );

    let stats = fallback.stats();
    println!();
    println!("  Level:        {}", stats.level);
    println!("  Errors:       {} in a row", stats.consecutive_errors);
    println!(
        "  Totals:       {} ok / {} failed",
        stats.total_successes, stats.total_failures
    );
    for failure in &stats.recent_failures {
        println!(
            "    {} [{:?}] {}",
            failure.at.format("%m-%d %H:%M"),
            failure.class,
            failure.error
        );
    }

    let today = behavior.durations().today();
    println!();
    println!("  State:        {}", behavior.state());
    println!(
        "  Sleeping:     {}",
        if behavior.sleep().is_sleeping() { "yes" } else { "no" }
    );
    println!(
        "  Today:        idle {:.0} min, angry {:.0} min, asleep {:.0} min, {} interactions",
        today.idle_minutes, today.angry_minutes, today.sleep_minutes, today.interaction_count
    );

    let m = memory.stats();
    println!();
    println!("  Memories:     {} ({} important)", m.total_memories, m.high_importance);
    println!("  Facts:        {}", memory.facts().summary());
    println!("  Triples:      {}", m.knowledge_triples);

    let config_path = petmind_config::AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `petmind onboard` first");
    }

    Ok(())
}
