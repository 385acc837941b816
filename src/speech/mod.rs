//! Speech output module
//!
//! Speaks the relay's reply text and reports completion through the
//! controller queue as [`Event::SynthesisFinished`].

use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::SpeechConfig;
use crate::events::{Event, EventSender};

/// Sequence number of one spoken reply
pub type UtteranceId = u64;

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("failed to start speech synthesis: {0}")]
    Spawn(String),
}

/// Speech output capability
pub trait Speaker {
    /// Start speaking `text`, cancelling anything still being spoken
    fn speak(&mut self, text: &str) -> Result<UtteranceId, SpeechError>;

    /// Stop the current utterance, if any
    fn cancel(&mut self);
}

/// Speaks through an external TTS program, the text passed as last argument
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    events: EventSender,
    next_id: UtteranceId,
    current: Option<JoinHandle<()>>,
}

impl CommandSpeaker {
    pub fn new(program: String, args: Vec<String>, events: EventSender) -> Self {
        Self {
            program,
            args,
            events,
            next_id: 0,
            current: None,
        }
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&mut self, text: &str) -> Result<UtteranceId, SpeechError> {
        self.cancel();

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpeechError::Spawn(format!("{}: {}", self.program, e)))?;

        self.next_id += 1;
        let id = self.next_id;
        let events = self.events.clone();

        self.current = Some(tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => warn!(%status, "speech program failed"),
                Ok(_) => {}
                Err(e) => warn!(?e, "failed to wait for speech program"),
            }
            let _ = events.send(Event::SynthesisFinished(id));
        }));

        debug!(utterance = id, "speaking reply");
        Ok(id)
    }

    fn cancel(&mut self) {
        if let Some(task) = self.current.take() {
            task.abort();
        }
    }
}

/// Used when no TTS program is configured. The reply is only shown on
/// screen, so there is no completion to report and the hold timer ends
/// the Speaking state.
#[derive(Debug, Default)]
pub struct SilentSpeaker {
    next_id: UtteranceId,
}

impl Speaker for SilentSpeaker {
    fn speak(&mut self, _text: &str) -> Result<UtteranceId, SpeechError> {
        self.next_id += 1;
        Ok(self.next_id)
    }

    fn cancel(&mut self) {}
}

/// Build the speaker described by the configuration
pub fn speaker_from_config(config: &SpeechConfig, events: EventSender) -> Box<dyn Speaker> {
    match config.command.split_first() {
        Some((program, args)) => Box::new(CommandSpeaker::new(program.clone(), args.to_vec(), events)),
        None => Box::new(SilentSpeaker::default()),
    }
}
