//! `petmind chat`: Interactive or single-message mode.

use petmind_agent::{Companion, Gesture, InteractionEvent, Schedule};
use petmind_core::DomainEvent;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{CliResult, TerminalSink, build_controller, build_dispatcher, load_config};

pub async fn run(message: Option<String>) -> CliResult {
    let config = load_config()?;
    let dispatcher = build_dispatcher(&config)?;
    let sink = Arc::new(TerminalSink::new(config.persona.pet_name.clone()));
    let controller = build_controller(&config, dispatcher, sink);

    if let Some(msg) = message {
        let mut controller = controller;
        controller.handle_event(InteractionEvent::chat(msg)).await;
        return Ok(());
    }

    let companion = Companion::start(controller, Schedule::from_config(&config));
    let mut events = companion.subscribe();
    let notices = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Some(line) = notice(&event) {
                eprintln!("  · {line}");
            }
        }
    });

    println!();
    println!("  {} is here. Model: {}", config.persona.pet_name, config.dispatcher.model);
    println!("  Type a message, or /tap, /pet, /throw, /swipe, /hello.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        match parse_input(line) {
            Ok(event) => {
                companion.handle_event(event).await;
            }
            Err(e) => eprintln!("  [Error] {e}"),
        }
        println!();
    }

    companion.shutdown().await;
    notices.abort();
    println!();
    println!("  Bye! 👋");
    Ok(())
}

/// Slash commands map to gestures; anything else is chat.
fn parse_input(line: &str) -> Result<InteractionEvent, String> {
    let Some(command) = line.strip_prefix('/') else {
        return Ok(InteractionEvent::chat(line));
    };
    match command {
        "hello" | "hi" => Ok(InteractionEvent::Greeting),
        "pet" => Ok(InteractionEvent::gesture(Gesture::LongPress)),
        other => other.parse::<Gesture>().map(InteractionEvent::gesture),
    }
}

fn notice(event: &DomainEvent) -> Option<String> {
    match event {
        DomainEvent::LevelChanged { from, to, reason, .. } => {
            Some(format!("response level {from} → {to} ({reason})"))
        }
        DomainEvent::SleepStarted { reason, .. } => Some(format!("fell asleep ({reason})")),
        DomainEvent::WokeUp { slept_minutes, .. } => {
            Some(format!("woke up after {slept_minutes} min"))
        }
        DomainEvent::Dreamed { emoji, content, .. } => Some(format!("{emoji} {content}")),
        _ => None,
    }
}
