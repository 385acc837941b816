//! Relay channel module
//!
//! Duplex named-event connection to the remote service.

mod protocol;
mod websocket;

pub use protocol::{Envelope, Outbound, SPEECH};
pub use websocket::WebSocketRelay;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("relay channel is closed")]
    Closed,

    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },
}

/// Outbound half of the relay as seen by the interaction states
pub trait Relay {
    /// Queue a message; ordered relative to earlier sends
    fn send(&mut self, message: Outbound) -> Result<(), RelayError>;
}
