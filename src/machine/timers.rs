//! Cancellable timers
//!
//! A fired timer is posted to the controller queue as
//! [`Event::TimerFired`]; it never runs state code directly.

use std::collections::HashMap;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

use crate::events::{Event, EventSender};

/// Handle for one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Timer capability injected into the controller
pub trait Timers {
    /// Schedule a timer that fires once after `delay`
    fn schedule(&mut self, delay: Duration) -> TimerId;

    /// Cancel a pending timer. Returns false if it already fired or was
    /// cancelled.
    fn cancel(&mut self, id: TimerId) -> bool;

    /// Mark a fired timer as consumed. Returns false if it was no longer
    /// pending, i.e. the firing is stale.
    fn settle(&mut self, id: TimerId) -> bool;

    /// Number of timers scheduled and neither fired nor cancelled
    fn pending(&self) -> usize;
}

/// Timers backed by sleeping tokio tasks
pub struct TokioTimers {
    next_id: u64,
    events: EventSender,
    handles: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioTimers {
    pub fn new(events: EventSender) -> Self {
        Self {
            next_id: 0,
            events,
            handles: HashMap::new(),
        }
    }
}

impl Timers for TokioTimers {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let events = self.events.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Controller gone means shutdown; nothing left to notify
            let _ = events.send(Event::TimerFired(id));
        });

        trace!(%id, delay_ms = delay.as_millis() as u64, "timer scheduled");
        self.handles.insert(id, handle);
        id
    }

    fn cancel(&mut self, id: TimerId) -> bool {
        match self.handles.remove(&id) {
            Some(handle) => {
                handle.abort();
                trace!(%id, "timer cancelled");
                true
            }
            None => false,
        }
    }

    fn settle(&mut self, id: TimerId) -> bool {
        self.handles.remove(&id).is_some()
    }

    fn pending(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for TokioTimers {
    fn drop(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}
