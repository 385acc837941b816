//! Per-state resource scope
//!
//! Every listener and timer a state registers goes through its [`Scope`],
//! and [`Scope::release`] gives all of them back when the state exits.

use std::time::Duration;

use super::listeners::{ListenerId, ListenerRegistry, StateId, Topic};
use super::timers::{TimerId, Timers};

/// What a scope gave back on release
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Released {
    pub listeners: usize,
    pub timers: usize,
}

#[derive(Debug)]
pub struct Scope {
    id: StateId,
    listeners: Vec<ListenerId>,
    timers: Vec<TimerId>,
}

impl Scope {
    pub fn new(id: StateId) -> Self {
        Self {
            id,
            listeners: Vec::new(),
            timers: Vec::new(),
        }
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    /// Subscribe this state to `topic` until it exits
    pub fn listen(&mut self, registry: &mut ListenerRegistry, topic: Topic) -> ListenerId {
        let id = registry.subscribe(self.id, topic);
        self.listeners.push(id);
        id
    }

    /// Schedule a timer that is cancelled on exit if still pending
    pub fn schedule(&mut self, timers: &mut dyn Timers, delay: Duration) -> TimerId {
        let id = timers.schedule(delay);
        self.timers.push(id);
        id
    }

    /// Take ownership of a fired timer away from the scope.
    ///
    /// Returns false when the scope never owned it, meaning the firing
    /// belongs to a state that has already exited.
    pub fn claim_timer(&mut self, id: TimerId) -> bool {
        match self.timers.iter().position(|owned| *owned == id) {
            Some(index) => {
                self.timers.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub fn owned_listeners(&self) -> usize {
        self.listeners.len()
    }

    pub fn owned_timers(&self) -> usize {
        self.timers.len()
    }

    /// Unsubscribe every listener and cancel every pending timer
    pub fn release(&mut self, registry: &mut ListenerRegistry, timers: &mut dyn Timers) -> Released {
        let mut released = Released::default();

        for id in self.listeners.drain(..) {
            if registry.unsubscribe(id) {
                released.listeners += 1;
            }
        }
        for id in self.timers.drain(..) {
            if timers.cancel(id) {
                released.timers += 1;
            }
        }

        released
    }
}
