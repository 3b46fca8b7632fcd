//! Recently sent `Event`s, kept for panels that register before the event's
//! ttl runs out.

use std::collections::HashSet;

use dashmap::DashMap;
use uuid::Uuid;

use super::message::{Message, PanelId};
use crate::timestamp::Timestamp;

#[derive(Debug)]
struct BufferedEvent {
    message: Message,
    sent_at: Timestamp,
    expires_at: Timestamp,
    delivered: HashSet<PanelId>,
}

#[derive(Debug)]
pub struct EventBuffer {
    events: DashMap<Uuid, BufferedEvent>,
    capacity: usize,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: DashMap::new(),
            capacity,
        }
    }

    pub fn push(
        &self,
        message: Message,
        sent_at: Timestamp,
        expires_at: Timestamp,
        delivered: impl IntoIterator<Item = PanelId>,
    ) {
        if self.capacity == 0 {
            return;
        }
        self.events.insert(
            message.id(),
            BufferedEvent {
                message,
                sent_at,
                expires_at,
                delivered: delivered.into_iter().collect(),
            },
        );
        while self.events.len() > self.capacity {
            let oldest = self
                .events
                .iter()
                .min_by_key(|entry| entry.sent_at)
                .map(|entry| *entry.key());
            match oldest {
                Some(id) => {
                    self.events.remove(&id);
                }
                None => break,
            }
        }
    }

    /// Records that `panel_id` received event `id`. Returns `false` when it
    /// already had; an event that is not buffered is always deliverable.
    pub fn mark_delivered(&self, id: Uuid, panel_id: &PanelId) -> bool {
        match self.events.get_mut(&id) {
            Some(mut event) => event.delivered.insert(panel_id.clone()),
            None => true,
        }
    }

    /// Drops events whose ttl has elapsed at `now`.
    pub fn purge_expired(&self, now: Timestamp) -> usize {
        let before = self.events.len();
        self.events.retain(|_, event| now < event.expires_at);
        before - self.events.len()
    }

    /// Unexpired events addressed to `panel_id` that it has not received yet,
    /// oldest first. Each is marked delivered to the panel.
    pub fn take_for(&self, panel_id: &PanelId, now: Timestamp) -> Vec<Message> {
        self.purge_expired(now);
        let mut pending: Vec<(Timestamp, Message)> = self
            .events
            .iter_mut()
            .filter(|entry| entry.message.is_for(panel_id))
            .filter_map(|mut entry| {
                if entry.delivered.insert(panel_id.clone()) {
                    Some((entry.sent_at, entry.message.clone()))
                } else {
                    None
                }
            })
            .collect();
        pending.sort_by_key(|(sent_at, _)| *sent_at);
        pending.into_iter().map(|(_, message)| message).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::message::MessagePayload;

    fn nobody() -> Vec<PanelId> {
        Vec::new()
    }

    fn event() -> Message {
        Message::builder(MessagePayload::HoverCleared)
            .source("ult")
            .build()
            .unwrap()
    }

    #[test]
    fn test_expired_events_dropped() {
        let buffer = EventBuffer::new(8);
        buffer.push(event(), Timestamp::from_nanos(0), Timestamp::from_nanos(100), nobody());
        assert!(buffer.take_for(&"ust".into(), Timestamp::from_nanos(100)).is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_each_panel_receives_once() {
        let buffer = EventBuffer::new(8);
        buffer.push(
            event(),
            Timestamp::from_nanos(0),
            Timestamp::from_nanos(100),
            [PanelId::from("ult")],
        );
        assert!(buffer.take_for(&"ult".into(), Timestamp::from_nanos(10)).is_empty());
        assert_eq!(buffer.take_for(&"ust".into(), Timestamp::from_nanos(10)).len(), 1);
        assert!(buffer.take_for(&"ust".into(), Timestamp::from_nanos(20)).is_empty());
    }

    #[test]
    fn test_marked_panel_not_taken_again() {
        let buffer = EventBuffer::new(8);
        let message = event();
        let id = message.id();
        buffer.push(message, Timestamp::from_nanos(0), Timestamp::from_nanos(100), nobody());

        assert_eq!(buffer.take_for(&"ust".into(), Timestamp::from_nanos(1)).len(), 1);
        assert!(!buffer.mark_delivered(id, &"ust".into()));
        assert!(buffer.mark_delivered(id, &"ugnt".into()));
        assert!(buffer.take_for(&"ugnt".into(), Timestamp::from_nanos(2)).is_empty());
    }

    #[test]
    fn test_unbuffered_event_always_deliverable() {
        let buffer = EventBuffer::new(0);
        let message = event();
        let id = message.id();
        buffer.push(message, Timestamp::from_nanos(0), Timestamp::from_nanos(100), nobody());
        assert!(buffer.mark_delivered(id, &"ust".into()));
        assert!(buffer.mark_delivered(id, &"ust".into()));
    }

    #[test]
    fn test_target_filter() {
        let buffer = EventBuffer::new(8);
        let targeted = Message::builder(MessagePayload::HoverCleared)
            .source("ult")
            .target("ugnt")
            .build()
            .unwrap();
        buffer.push(targeted, Timestamp::from_nanos(0), Timestamp::from_nanos(100), nobody());
        assert!(buffer.take_for(&"ust".into(), Timestamp::from_nanos(1)).is_empty());
        assert_eq!(buffer.take_for(&"ugnt".into(), Timestamp::from_nanos(1)).len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let buffer = EventBuffer::new(2);
        let first = event();
        let first_id = first.id();
        buffer.push(first, Timestamp::from_nanos(1), Timestamp::from_nanos(100), nobody());
        buffer.push(event(), Timestamp::from_nanos(2), Timestamp::from_nanos(100), nobody());
        buffer.push(event(), Timestamp::from_nanos(3), Timestamp::from_nanos(100), nobody());
        assert_eq!(buffer.len(), 2);
        let ids: Vec<_> = buffer
            .take_for(&"ust".into(), Timestamp::from_nanos(4))
            .iter()
            .map(Message::id)
            .collect();
        assert!(!ids.contains(&first_id));
    }
}
