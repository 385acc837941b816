//! Terminal key listener
//!
//! Puts the terminal in raw mode and reads key events on a dedicated
//! thread, forwarding push-to-talk signals to the controller queue.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{
    self, Event as TerminalEvent, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement};
use tracing::{debug, error, info, warn};

use super::keys::{classify, KeyAction, KeyFilter};
use crate::events::{Event, EventSender};
use crate::lifecycle::ShutdownSignal;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors that can occur in the key listener
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("key listener is already running")]
    AlreadyRunning,

    #[error("failed to configure terminal: {0}")]
    Terminal(#[from] io::Error),

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),
}

pub struct InputListener {
    events: EventSender,
    shutdown: ShutdownSignal,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl InputListener {
    pub fn new(events: EventSender, shutdown: ShutdownSignal) -> Self {
        Self {
            events,
            shutdown,
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Enter raw mode and start reading keys on a background thread
    pub fn start(&self) -> Result<(), InputError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(InputError::AlreadyRunning);
        }

        let filter = match configure_terminal() {
            Ok(filter) => filter,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
        };

        let events = self.events.clone();
        let shutdown = self.shutdown.clone();
        let running = Arc::clone(&self.running);

        let handle = thread::Builder::new()
            .name("key-listener".to_string())
            .spawn(move || {
                info!(reports_release = filter.reports_release(), "key listener thread started");

                if let Err(e) = read_keys(filter, &events, &shutdown, &running) {
                    error!(?e, "key listener error");
                    shutdown.trigger();
                }

                running.store(false, Ordering::SeqCst);
                restore_terminal(filter);
                info!("key listener thread stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                restore_terminal(filter);
                InputError::ThreadSpawn(e.to_string())
            })?;

        if let Ok(mut slot) = self.handle.lock() {
            *slot = Some(handle);
        }
        Ok(())
    }

    /// Stop reading keys and wait for the terminal to be restored
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let handle = self.handle.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("key listener thread panicked");
            }
        }
    }
}

fn configure_terminal() -> io::Result<KeyFilter> {
    enable_raw_mode()?;

    let reports_release = supports_keyboard_enhancement().unwrap_or(false);
    if reports_release {
        execute!(
            io::stdout(),
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    } else {
        warn!("terminal cannot report key releases, tap once to record and again to stop");
    }

    Ok(KeyFilter::new(reports_release))
}

fn restore_terminal(filter: KeyFilter) {
    if filter.reports_release() {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = disable_raw_mode() {
        warn!(?e, "failed to leave raw mode");
    }
}

fn read_keys(
    filter: KeyFilter,
    events: &EventSender,
    shutdown: &ShutdownSignal,
    running: &AtomicBool,
) -> io::Result<()> {
    while running.load(Ordering::SeqCst) {
        if !event::poll(POLL_INTERVAL)? {
            continue;
        }

        let TerminalEvent::Key(key) = event::read()? else {
            continue;
        };

        match classify(&key) {
            KeyAction::Interrupt => {
                debug!("interrupt key pressed");
                shutdown.trigger();
                break;
            }
            KeyAction::Input(input) => {
                let Some(signal) = filter.translate(&key, input) else {
                    continue;
                };
                if events.send(Event::Input(signal)).is_err() {
                    warn!("failed to forward key event - controller gone?");
                    break;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_listener_creation() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let listener = InputListener::new(tx, ShutdownSignal::new());
        assert!(!listener.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_before_start_is_harmless() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let listener = InputListener::new(tx, ShutdownSignal::new());
        listener.stop();
        assert!(!listener.running.load(Ordering::SeqCst));
        assert!(listener.handle.lock().unwrap().is_none());
    }
}
