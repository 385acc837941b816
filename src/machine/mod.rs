//! Interaction state machine
//!
//! Sequences one push-to-talk cycle at a time:
//! - Waiting: idle, press a key to record
//! - Listening: key held, recogniser running
//! - Sending: key released, transcript transmitted
//! - AwaitingReply: waiting for the relay's speech reply
//! - Speaking: reply spoken, then back to Waiting
//!
//! plus the optional ConnectPrompt and BootAnimation intro.

mod boot;
mod engine;
mod listeners;
mod scope;
mod states;
mod timers;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{Context, Controller, InteractionSettings, MachineError};
pub use listeners::{ListenerRegistry, Topic};
pub use timers::{TimerId, TokioTimers};
