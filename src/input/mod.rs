//! Input module for push-to-talk key handling
//!
//! Reads the terminal keyboard on its own thread and turns key-down and
//! key-up into begin/end recording signals.

mod keys;
mod listener;

pub use keys::InputEvent;
pub use listener::{InputError, InputListener};
