//! Speech recognition module
//!
//! A [`SpeechCapture`] backend does the actual listening and reports
//! exactly one [`RecognitionSignal`] per cycle through the controller
//! queue. [`RecognitionSession`] sits between the backend and the
//! interaction states and enforces the one-cycle-at-a-time contract.

mod command;
mod session;
mod transcript;

pub use command::{CommandCapture, UnavailableCapture};
pub use session::RecognitionSession;

use crate::config::RecognitionConfig;
use crate::events::EventSender;

/// Sequence number of one start/stop capture cycle
pub type CycleId = u64;

/// How a capture cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    /// An utterance was recognised
    Result(String),
    /// Capture ended without a match
    NoResult,
    /// The recogniser failed (permissions, network, crash)
    Error(String),
}

impl std::fmt::Display for RecognitionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognitionOutcome::Result(text) => write!(f, "result {:?}", text),
            RecognitionOutcome::NoResult => write!(f, "no result"),
            RecognitionOutcome::Error(reason) => write!(f, "error: {}", reason),
        }
    }
}

/// Terminal callback from a backend, tagged with its cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionSignal {
    pub cycle: CycleId,
    pub outcome: RecognitionOutcome,
}

#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    #[error("recognition session is already active")]
    AlreadyActive,

    #[error("failed to start speech capture: {0}")]
    Capture(String),
}

/// Backend that records and transcribes one utterance per cycle
pub trait SpeechCapture {
    /// Start capturing for `cycle`
    fn begin(&mut self, cycle: CycleId) -> Result<(), RecognitionError>;

    /// Stop capturing; the outcome for `cycle` is reported afterwards
    fn end(&mut self, cycle: CycleId);

    /// Stop capturing and abandon `cycle`
    fn discard(&mut self, cycle: CycleId) {
        self.end(cycle);
    }
}

/// Build the capture backend described by the configuration
pub fn capture_from_config(config: &RecognitionConfig, events: EventSender) -> Box<dyn SpeechCapture> {
    match config.command.split_first() {
        Some((program, args)) => Box::new(CommandCapture::new(program.clone(), args.to_vec(), events)),
        None => Box::new(UnavailableCapture),
    }
}
