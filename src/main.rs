//! spyspeak-client: push-to-talk terminal client for the spyspeak relay
//!
//! Connects to the relay over WebSocket and runs one interaction cycle at
//! a time:
//! - Hold a key to record, release to send the transcript
//! - Wait for the relay's spoken reply
//! - Speak it, then go back to waiting
//!
//! Everything the interaction reacts to (keys, recogniser results, relay
//! messages, timers, finished speech) arrives on one event queue and is
//! handled by the interaction controller.

mod config;
mod display;
mod events;
mod input;
mod lifecycle;
mod machine;
mod recognition;
mod relay;
mod speech;

use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use anyhow::{Context as _, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::display::TerminalDisplay;
use crate::input::InputListener;
use crate::lifecycle::ShutdownSignal;
use crate::machine::{Context, Controller, InteractionSettings, ListenerRegistry, MachineError, TokioTimers};
use crate::recognition::{capture_from_config, RecognitionSession};
use crate::relay::WebSocketRelay;
use crate::speech::speaker_from_config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_logging(&config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        url = %config.relay.url,
        "spyspeak-client starting"
    );

    let shutdown = ShutdownSignal::new();

    // Keys, recogniser, relay, timers and speech all feed this queue
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let relay = tokio::select! {
        result = WebSocketRelay::connect(&config.relay, event_tx.clone()) => {
            result.with_context(|| format!("could not reach relay at {}", config.relay.url))?
        }
        _ = shutdown.wait() => {
            info!("shutdown requested before relay connected");
            return Ok(());
        }
    };
    info!("relay connected");

    let input = InputListener::new(event_tx.clone(), shutdown.clone());
    input.start().context("failed to start key listener")?;

    let ctx = Context {
        display: Box::new(TerminalDisplay::new()),
        recognition: RecognitionSession::new(capture_from_config(&config.recognition, event_tx.clone())),
        relay: Box::new(relay),
        speaker: speaker_from_config(&config.speech, event_tx.clone()),
        timers: Box::new(TokioTimers::new(event_tx.clone())),
        listeners: ListenerRegistry::new(),
        settings: InteractionSettings::from_config(&config),
    };
    let mut controller = Controller::new(ctx);

    info!("client initialized, entering main loop");

    let outcome = tokio::select! {
        result = controller.run(event_rx) => result,
        _ = shutdown.wait() => {
            info!("shutdown signal received");
            Ok(())
        }
    };

    // Cleanup
    info!("shutting down...");

    controller.shutdown();
    input.stop();

    match outcome {
        Ok(()) => {
            info!("spyspeak-client stopped");
            Ok(())
        }
        // Already logged by the controller
        Err(e @ MachineError::ConnectionLost(_)) => Err(e.into()),
        Err(e) => {
            warn!(?e, "controller stopped with error");
            Err(e.into())
        }
    }
}

/// Log to a file; the raw-mode terminal is redrawn by the display
fn init_logging(config: &Config) -> Result<()> {
    let writer = match config.log_path() {
        Some(path) => {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::sink),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(())
}
