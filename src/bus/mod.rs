//! # Lifecycle Message Bus
//!
//! Synchronous publish/subscribe between panels with three delivery
//! lifecycles:
//!
//! * **State**: delivered, then retained under `(type, state key)` until a
//!   message with a later timestamp supersedes it or a clearing command
//!   removes it. Newly mounted panels pull it with [`MessageBus::get_state`].
//! * **Command**: delivered once and discarded.
//! * **Event**: delivered once; kept until its ttl elapses so that a panel
//!   registering in the meantime still receives it.
//!
//! Registration survives panel re-renders: [`MessageBus::register`] on a known
//! id or [`MessageBus::update_endpoint`] only swap the callback, so the panel
//! never drops out of a broadcast in between.
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//! use interlinear_sync::bus::{Message, MessageBus, MessagePayload, MessageType};
//! use interlinear_sync::verse_ref::VerseRef;
//!
//! let bus = MessageBus::with_defaults();
//! let message = Message::builder(MessagePayload::NavigateToVerse(VerseRef::new("TIT", 1, "3")))
//!     .source("ult")
//!     .build()
//!     .unwrap();
//! bus.send(message).unwrap();
//!
//! let state = bus
//!     .get_state(MessageType::NavigateToVerse, "navigation.verse")
//!     .unwrap();
//! assert!(state.is_some());
//! ```

pub mod event_buffer;
pub mod message;
pub mod registry;
pub mod state_store;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    config::BusConfig,
    resolver::PanelTokens,
    timestamp::{Clock, MonotonicClock, Timestamp},
};

pub use event_buffer::EventBuffer;
pub use message::{
    FilterSpec, Lifecycle, Message, MessageBuilder, MessagePayload, MessageType, NoteSelection,
    PanelId, ResourceInfo, FILTER_STATE_KEY, HIGHLIGHT_STATE_KEY, NAVIGATION_STATE_KEY,
};
pub use registry::{MockPanelEndpoint, PanelEndpoint, PanelRegistry, Registration};
pub use state_store::{StateChange, StateStore};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BusError {
    #[error("Message bus has been disposed")]
    Disposed,
    #[error("{message_type} message has no source")]
    MissingSource { message_type: MessageType },
    #[error("{message_type} is a {lifecycle} message and cannot carry a ttl")]
    TtlNotAllowed {
        message_type: MessageType,
        lifecycle: Lifecycle,
    },
}

pub type BusResult<T> = Result<T, BusError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryOutcome {
    Delivered,
    /// A newer `State` is already active; nothing was stored or delivered.
    Superseded,
    /// The message moved its state key back to absent.
    Cleared,
}

/// Report of one [`MessageBus::send`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
    pub message_id: Uuid,
    pub timestamp: Timestamp,
    pub outcome: DeliveryOutcome,
    /// Panels whose callback ran, in registration order.
    pub delivered: Vec<PanelId>,
}

pub struct MessageBus {
    config: BusConfig,
    clock: Arc<dyn Clock>,
    registry: PanelRegistry,
    states: StateStore,
    events: EventBuffer,
    disposed: AtomicBool,
}

impl MessageBus {
    pub fn new(config: BusConfig, clock: Arc<dyn Clock>) -> Self {
        let events = EventBuffer::new(config.max_buffered_events);
        Self {
            config,
            clock,
            registry: PanelRegistry::new(),
            states: StateStore::new(),
            events,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(BusConfig::default(), Arc::new(MonotonicClock::new()))
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    fn ensure_live(&self) -> BusResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            Err(BusError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Registers a panel, or swaps the endpoint of one already registered.
    ///
    /// Active `State` is not replayed. A panel registering for the first time
    /// receives buffered events that are still within their ttl.
    pub fn register(
        &self,
        panel_id: impl Into<PanelId>,
        endpoint: Arc<dyn PanelEndpoint>,
    ) -> BusResult<Registration> {
        self.ensure_live()?;
        let panel_id = panel_id.into();
        let registration = self.registry.register(panel_id.clone(), endpoint.clone());
        if registration == Registration::Replaced {
            tracing::trace!("panel {} endpoint replaced", panel_id);
            return Ok(registration);
        }

        tracing::debug!("panel {} registered", panel_id);
        for message in self.events.take_for(&panel_id, self.clock.now()) {
            tracing::debug!(
                "late delivery of {} {} to {}",
                message.message_type(),
                message.id(),
                panel_id
            );
            endpoint.receive(&message);
        }
        Ok(registration)
    }

    /// Replaces the callback of a registered panel. Returns `false`, and
    /// registers nothing, when the panel is unknown.
    pub fn update_endpoint(
        &self,
        panel_id: &PanelId,
        endpoint: Arc<dyn PanelEndpoint>,
    ) -> BusResult<bool> {
        self.ensure_live()?;
        Ok(self.registry.update_endpoint(panel_id, endpoint))
    }

    /// Removes a panel for good. Only for real teardown, never on re-render.
    pub fn unregister(&self, panel_id: &PanelId) -> BusResult<bool> {
        self.ensure_live()?;
        let removed = self.registry.unregister(panel_id);
        if removed {
            tracing::debug!("panel {} unregistered", panel_id);
        }
        Ok(removed)
    }

    /// Delivers `message` synchronously to every addressed panel in
    /// registration order. Unregistered targets are skipped silently.
    pub fn send(&self, mut message: Message) -> BusResult<Delivery> {
        self.ensure_live()?;
        let now = self.clock.now();
        let timestamp = message.stamp(now);

        let outcome = match message.lifecycle() {
            Lifecycle::State => match self.states.apply(&message, timestamp) {
                StateChange::Stored => DeliveryOutcome::Delivered,
                StateChange::Cleared => DeliveryOutcome::Cleared,
                StateChange::Stale => {
                    tracing::debug!(
                        "{} {} superseded by newer state",
                        message.message_type(),
                        message.id()
                    );
                    return Ok(Delivery {
                        message_id: message.id(),
                        timestamp,
                        outcome: DeliveryOutcome::Superseded,
                        delivered: Vec::new(),
                    });
                }
            },
            Lifecycle::Command => match message.message_type().clears() {
                Some((state_type, state_key)) => {
                    self.states.clear(state_type, state_key, timestamp);
                    DeliveryOutcome::Cleared
                }
                None => DeliveryOutcome::Delivered,
            },
            Lifecycle::Event => DeliveryOutcome::Delivered,
        };

        // Panels registered from inside a callback take the event from the
        // buffer; the delivered set keeps it to one copy per panel.
        if message.lifecycle() == Lifecycle::Event {
            let ttl = message.ttl().unwrap_or(self.config.default_event_ttl);
            self.events.purge_expired(now);
            self.events
                .push(message.clone(), now, now + ttl, Vec::<PanelId>::new());
        }

        let mut delivered = Vec::new();
        for (panel_id, endpoint) in self.registry.recipients(&message) {
            if message.lifecycle() == Lifecycle::Event
                && !self.events.mark_delivered(message.id(), &panel_id)
            {
                continue;
            }
            endpoint.receive(&message);
            delivered.push(panel_id);
        }
        self.log_delivery(&message, &delivered);

        Ok(Delivery {
            message_id: message.id(),
            timestamp,
            outcome,
            delivered,
        })
    }

    fn log_delivery(&self, message: &Message, delivered: &[PanelId]) {
        if message.message_type() == MessageType::HoverAlignment {
            tracing::trace!(
                "{} from {} delivered to {} panels",
                message.message_type(),
                message.source(),
                delivered.len()
            );
        } else {
            tracing::debug!(
                "{} from {} delivered to {} panels",
                message.message_type(),
                message.source(),
                delivered.len()
            );
        }
    }

    pub fn get_state(
        &self,
        message_type: MessageType,
        state_key: &str,
    ) -> BusResult<Option<Message>> {
        self.ensure_live()?;
        Ok(self.states.get(message_type, state_key))
    }

    pub fn get_state_by_key(&self, state_key: &str) -> BusResult<Option<Message>> {
        self.ensure_live()?;
        Ok(self.states.get_by_key(state_key))
    }

    /// Drops a state entry without notifying panels.
    pub fn clear_state(&self, message_type: MessageType, state_key: &str) -> BusResult<bool> {
        self.ensure_live()?;
        Ok(self.states.clear(message_type, state_key, self.clock.now()))
    }

    pub fn panel_ids(&self) -> BusResult<Vec<PanelId>> {
        self.ensure_live()?;
        Ok(self.registry.ids())
    }

    pub fn is_registered(&self, panel_id: &PanelId) -> BusResult<bool> {
        self.ensure_live()?;
        Ok(self.registry.contains(panel_id))
    }

    /// Current tokens of every registered panel, in registration order.
    pub fn snapshot_tokens(&self) -> BusResult<Vec<(PanelId, PanelTokens)>> {
        self.ensure_live()?;
        Ok(self
            .registry
            .snapshot()
            .into_iter()
            .map(|(panel_id, endpoint)| (panel_id, endpoint.current_tokens()))
            .collect())
    }

    /// Drops every registration, state and buffered event. Later calls fail
    /// with [`BusError::Disposed`].
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.registry.clear();
        self.states.clear_all();
        self.events.clear();
        tracing::debug!("message bus disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::with_defaults()
    }
}
