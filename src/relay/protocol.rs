//! Relay message protocol definitions
//!
//! Every frame is a JSON text message `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Client to service: the transcript for this cycle
pub const RECOGNISED: &str = "recognised";
/// Client to service: nothing was recognised this cycle
pub const NOT_RECOGNISED: &str = "not_recognised";
/// Service to client: reply text to speak
pub const SPEECH: &str = "speech";

/// A named message on the relay, in either direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }
}

/// The one message the client sends per interaction cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Speech was recognised as this transcript
    Recognised(String),
    /// Nothing usable was recognised
    NotRecognised,
}

impl Outbound {
    pub fn into_envelope(self) -> Envelope {
        match self {
            Outbound::Recognised(transcript) => Envelope::new(RECOGNISED, Value::String(transcript)),
            Outbound::NotRecognised => Envelope::new(NOT_RECOGNISED, json!({})),
        }
    }
}

impl std::fmt::Display for Outbound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outbound::Recognised(transcript) => write!(f, "{} {:?}", RECOGNISED, transcript),
            Outbound::NotRecognised => write!(f, "{}", NOT_RECOGNISED),
        }
    }
}
