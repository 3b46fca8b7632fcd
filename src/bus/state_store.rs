//! Retained `State` messages keyed by `(type, state key)`.

use dashmap::{mapref::entry::Entry, DashMap};

use super::message::{Message, MessageType};
use crate::timestamp::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Stored,
    Cleared,
    /// The store already holds a newer message for the key.
    Stale,
}

#[derive(Debug, Default)]
pub struct StateStore {
    entries: DashMap<(MessageType, String), (Timestamp, Message)>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a stamped `State` message. The later timestamp wins; a clearing
    /// payload removes the key.
    pub fn apply(&self, message: &Message, timestamp: Timestamp) -> StateChange {
        let Some(state_key) = message.state_key() else {
            return StateChange::Stale;
        };
        let key = (message.message_type(), state_key.to_string());
        let clearing = message.payload().is_clearing();

        match self.entries.entry(key) {
            Entry::Occupied(entry) if entry.get().0 > timestamp => StateChange::Stale,
            Entry::Occupied(entry) if clearing => {
                entry.remove();
                StateChange::Cleared
            }
            Entry::Occupied(mut entry) => {
                entry.insert((timestamp, message.clone()));
                StateChange::Stored
            }
            Entry::Vacant(_) if clearing => StateChange::Cleared,
            Entry::Vacant(entry) => {
                entry.insert((timestamp, message.clone()));
                StateChange::Stored
            }
        }
    }

    /// Removes the entry unless it is newer than `not_after`.
    pub fn clear(&self, message_type: MessageType, state_key: &str, not_after: Timestamp) -> bool {
        self.entries
            .remove_if(&(message_type, state_key.to_string()), |_, (stored, _)| {
                *stored <= not_after
            })
            .is_some()
    }

    pub fn get(&self, message_type: MessageType, state_key: &str) -> Option<Message> {
        self.entries
            .get(&(message_type, state_key.to_string()))
            .map(|entry| entry.1.clone())
    }

    /// Most recent message stored under `state_key`, whatever its type.
    pub fn get_by_key(&self, state_key: &str) -> Option<Message> {
        self.entries
            .iter()
            .filter(|entry| entry.key().1 == state_key)
            .max_by_key(|entry| entry.0)
            .map(|entry| entry.1.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear_all(&self) {
        self.entries.clear();
    }
}
