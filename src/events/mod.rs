//! Events module for the interaction controller
//!
//! Every asynchronous input (keys, recogniser callbacks, relay messages,
//! timer expiry, synthesis completion) is funnelled into one queue as an
//! [`Event`] and handled on a single task.

use tokio::sync::mpsc;

use crate::input::InputEvent;
use crate::machine::{TimerId, Topic};
use crate::recognition::RecognitionSignal;
use crate::relay::Envelope;
use crate::speech::UtteranceId;

/// Sending half of the controller queue, cloned into every producer
pub type EventSender = mpsc::UnboundedSender<Event>;

/// Receiving half of the controller queue, owned by the controller loop
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

/// Everything the controller can be woken up by
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Push-to-talk key went down or came back up
    Input(InputEvent),

    /// Terminal callback from the recogniser for one capture cycle
    Recognition(RecognitionSignal),

    /// Named message received from the relay
    Inbound(Envelope),

    /// A scheduled timer elapsed
    TimerFired(TimerId),

    /// The speech output finished an utterance
    SynthesisFinished(UtteranceId),

    /// The relay connection went away
    ChannelClosed {
        /// Human-readable cause reported by the transport
        reason: String,
    },
}

impl Event {
    /// The listener topic this event is delivered on.
    ///
    /// Timer, channel-closed and toggle events are resolved by the
    /// controller itself and have no topic.
    pub fn topic(&self) -> Option<Topic> {
        match self {
            Event::Input(InputEvent::Press) => Some(Topic::KeyDown),
            Event::Input(InputEvent::Release) => Some(Topic::KeyUp),
            Event::Recognition(_) => Some(Topic::Recognition),
            Event::Inbound(envelope) => Some(Topic::Inbound(envelope.event.clone())),
            Event::SynthesisFinished(_) => Some(Topic::SynthesisDone),
            Event::Input(InputEvent::Toggle) | Event::TimerFired(_) | Event::ChannelClosed { .. } => None,
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Input(InputEvent::Press) => write!(f, "KEY_DOWN"),
            Event::Input(InputEvent::Release) => write!(f, "KEY_UP"),
            Event::Input(InputEvent::Toggle) => write!(f, "KEY_TAP"),
            Event::Recognition(signal) => {
                write!(f, "RECOGNITION (cycle {}: {})", signal.cycle, signal.outcome)
            }
            Event::Inbound(envelope) => write!(f, "INBOUND ({})", envelope.event),
            Event::TimerFired(id) => write!(f, "TIMER_FIRED ({})", id),
            Event::SynthesisFinished(id) => write!(f, "SYNTHESIS_FINISHED ({})", id),
            Event::ChannelClosed { reason } => write!(f, "CHANNEL_CLOSED ({})", reason),
        }
    }
}
