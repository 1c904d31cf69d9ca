//! `petmind poke`: Send one gesture.

use petmind_agent::{Gesture, InteractionEvent};
use std::sync::Arc;

use super::{CliResult, TerminalSink, build_controller, build_dispatcher, load_config};

pub async fn run(gesture: Gesture) -> CliResult {
    let config = load_config()?;
    let dispatcher = build_dispatcher(&config)?;
    let sink = Arc::new(TerminalSink::new(config.persona.pet_name.clone()));
    let mut controller = build_controller(&config, dispatcher, sink);

    let reply = controller.handle_event(InteractionEvent::gesture(gesture)).await;
    tracing::debug!(gesture = %gesture, source = ?reply.source, "Poke answered");
    Ok(())
}
