//! PetMind CLI, the main entry point.
//!
//! Commands:
//! - `onboard`: Write the default config
//! - `chat`: Talk to the pet (interactive or single message)
//! - `poke`: Send one gesture
//! - `status`: Show ladder, behavior and memory state
//! - `memory`: Inspect or clear what the pet remembers

use clap::{Parser, Subcommand};
use petmind_agent::Gesture;

mod commands;

#[derive(Parser)]
#[command(
    name = "petmind",
    about = "PetMind: a desktop companion that degrades gracefully",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Onboard,

    /// Chat with the pet
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Send a gesture (tap, double_tap, long_press, throw, swipe)
    Poke { gesture: Gesture },

    /// Show ladder, behavior and memory state
    Status,

    /// Inspect or clear memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Known facts about the user and the pet
    Facts,

    /// Ranked search over remembered turns
    Search {
        query: String,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Knowledge triples, optionally filtered
    Triples {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        predicate: Option<String>,
        #[arg(long)]
        object: Option<String>,
    },

    /// Forget everything
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat { message } => commands::chat::run(message).await?,
        Commands::Poke { gesture } => commands::poke::run(gesture).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Memory { action } => match action {
            MemoryAction::Facts => commands::memory::facts().await?,
            MemoryAction::Search { query, limit } => commands::memory::search(&query, limit).await?,
            MemoryAction::Triples {
                subject,
                predicate,
                object,
            } => commands::memory::triples(subject, predicate, object).await?,
            MemoryAction::Clear => commands::memory::clear().await?,
        },
    }

    Ok(())
}
