//! Listener registry shared by every interaction state
//!
//! Stands in for a global event bus: a state subscribes to a [`Topic`]
//! and gets a [`ListenerId`] back, which its scope hands back on exit.

use std::collections::HashMap;

/// Event categories a state can subscribe to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Push-to-talk key pressed (including key repeat)
    KeyDown,
    /// Push-to-talk key released
    KeyUp,
    /// Recogniser terminal callbacks
    Recognition,
    /// Speech output completion
    SynthesisDone,
    /// Relay messages with the given event name
    Inbound(String),
}

/// Identifies the state instance that owns a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u64);

impl StateId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle returned by [`ListenerRegistry::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Default)]
pub struct ListenerRegistry {
    next_id: u64,
    entries: HashMap<ListenerId, (StateId, Topic)>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `owner` for events on `topic`
    pub fn subscribe(&mut self, owner: StateId, topic: Topic) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.insert(id, (owner, topic));
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Whether `owner` currently listens on `topic`
    pub fn is_listening(&self, owner: StateId, topic: &Topic) -> bool {
        self.entries
            .values()
            .any(|(entry_owner, entry_topic)| *entry_owner == owner && entry_topic == topic)
    }

    /// Number of live subscriptions across all owners
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
