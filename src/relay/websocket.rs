//! WebSocket relay connection
//!
//! Splits the socket into a writer task fed by an unbounded queue and a
//! reader task that forwards every inbound envelope to the controller.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::protocol::{Envelope, Outbound};
use super::{Relay, RelayError};
use crate::config::RelayConfig;
use crate::events::{Event, EventSender};

pub struct WebSocketRelay {
    outbound: mpsc::UnboundedSender<Envelope>,
    send_handle: JoinHandle<()>,
    recv_handle: JoinHandle<()>,
}

impl WebSocketRelay {
    /// Connect to the relay, retrying up to `connect_attempts` times.
    ///
    /// The returned relay is ready: sends are accepted and inbound
    /// messages flow to `events` from this point on.
    pub async fn connect(config: &RelayConfig, events: EventSender) -> Result<Self, RelayError> {
        let retry_delay = Duration::from_millis(config.retry_delay_ms);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match tokio_tungstenite::connect_async(config.url.as_str()).await {
                Ok((stream, _response)) => {
                    info!(url = %config.url, attempt, "relay connected");
                    return Ok(Self::spawn(stream, events));
                }
                Err(e) if attempt < config.connect_attempts => {
                    warn!(url = %config.url, attempt, error = %e, "relay connection failed, retrying");
                    tokio::time::sleep(retry_delay).await;
                }
                Err(e) => {
                    return Err(RelayError::Connect {
                        url: config.url.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }

    fn spawn(stream: WebSocketStream<MaybeTlsStream<TcpStream>>, events: EventSender) -> Self {
        let (mut write, mut read) = stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Envelope>();

        let send_handle = tokio::spawn(async move {
            while let Some(envelope) = outbound_rx.recv().await {
                let text = match serde_json::to_string(&envelope) {
                    Ok(text) => text,
                    Err(e) => {
                        error!(?e, event = %envelope.event, "failed to encode relay message");
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(text)).await {
                    error!(?e, "failed to send relay message");
                    break;
                }
                debug!(event = %envelope.event, "relay message sent");
            }
            let _ = write.close().await;
        });

        let recv_handle = tokio::spawn(async move {
            let reason = loop {
                let message = match read.next().await {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => break e.to_string(),
                    None => break "stream ended".to_string(),
                };

                match message {
                    Message::Text(text) => match serde_json::from_str::<Envelope>(&text) {
                        Ok(envelope) => {
                            debug!(event = %envelope.event, "relay message received");
                            if events.send(Event::Inbound(envelope)).is_err() {
                                return;
                            }
                        }
                        Err(e) => warn!(?e, %text, "ignoring malformed relay message"),
                    },
                    Message::Binary(bin) => warn!(len = bin.len(), "ignoring binary relay message"),
                    Message::Close(frame) => {
                        break frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "closed by server".to_string());
                    }
                    _ => {}
                }
            };

            info!(%reason, "relay connection closed");
            let _ = events.send(Event::ChannelClosed { reason });
        });

        Self {
            outbound,
            send_handle,
            recv_handle,
        }
    }
}

impl Relay for WebSocketRelay {
    fn send(&mut self, message: Outbound) -> Result<(), RelayError> {
        self.outbound
            .send(message.into_envelope())
            .map_err(|_| RelayError::Closed)
    }
}

impl Drop for WebSocketRelay {
    fn drop(&mut self) {
        self.send_handle.abort();
        self.recv_handle.abort();
    }
}
