//! Message types carried by the bus.
//!
//! Every [`MessagePayload`] variant has exactly one [`MessageType`], and the
//! type fixes the lifecycle and, for `State` messages, the state key. The
//! table lives in [`MessageType::lifecycle`] and [`MessageType::state_key`];
//! [`MessageBuilder::build`] refuses messages that contradict it.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{BusError, BusResult};
use crate::{resolver::HighlightSet, timestamp::Timestamp, verse_ref::VerseRef};

pub const HIGHLIGHT_STATE_KEY: &str = "alignment.highlight";
pub const FILTER_STATE_KEY: &str = "filter";
pub const NAVIGATION_STATE_KEY: &str = "navigation.verse";

/// Identifier of a panel or resource taking part in synchronisation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelId(String);

impl PanelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PanelId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PanelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum Lifecycle {
    /// Retained under its state key until superseded or cleared.
    State,
    /// Delivered once, never retained.
    Command,
    /// Delivered once; late subscribers may still get it within its ttl.
    Event,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum MessageType {
    HighlightAlignment,
    ClearHighlight,
    HoverAlignment,
    HoverCleared,
    SetFilter,
    ClearFilters,
    NavigateToVerse,
    NoteSelected,
    ResourceLoaded,
}

impl MessageType {
    pub fn lifecycle(&self) -> Lifecycle {
        match self {
            Self::HighlightAlignment | Self::SetFilter | Self::NavigateToVerse => Lifecycle::State,
            Self::ClearHighlight | Self::ClearFilters => Lifecycle::Command,
            Self::HoverAlignment | Self::HoverCleared | Self::NoteSelected | Self::ResourceLoaded => {
                Lifecycle::Event
            }
        }
    }

    pub fn state_key(&self) -> Option<&'static str> {
        match self {
            Self::HighlightAlignment => Some(HIGHLIGHT_STATE_KEY),
            Self::SetFilter => Some(FILTER_STATE_KEY),
            Self::NavigateToVerse => Some(NAVIGATION_STATE_KEY),
            _ => None,
        }
    }

    /// The state a clearing command removes.
    pub fn clears(&self) -> Option<(MessageType, &'static str)> {
        match self {
            Self::ClearHighlight => Some((Self::HighlightAlignment, HIGHLIGHT_STATE_KEY)),
            Self::ClearFilters => Some((Self::SetFilter, FILTER_STATE_KEY)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub strongs: BTreeSet<String>,
    #[serde(default)]
    pub lemmas: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl FilterSpec {
    pub fn is_empty(&self) -> bool {
        self.strongs.is_empty()
            && self.lemmas.is_empty()
            && self.text.as_deref().map_or(true, str::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSelection {
    pub verse_ref: VerseRef,
    pub quote: String,
    /// `-1` selects every match.
    pub occurrence: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub resource: String,
    pub book: String,
    pub chapters: Vec<u32>,
    pub verse_count: usize,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum MessagePayload {
    /// An empty set clears the highlight.
    HighlightAlignment(HighlightSet),
    ClearHighlight,
    HoverAlignment(HighlightSet),
    HoverCleared,
    /// An empty filter clears the filter.
    SetFilter(FilterSpec),
    ClearFilters,
    NavigateToVerse(VerseRef),
    NoteSelected(NoteSelection),
    ResourceLoaded(ResourceInfo),
}

impl MessagePayload {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::HighlightAlignment(_) => MessageType::HighlightAlignment,
            Self::ClearHighlight => MessageType::ClearHighlight,
            Self::HoverAlignment(_) => MessageType::HoverAlignment,
            Self::HoverCleared => MessageType::HoverCleared,
            Self::SetFilter(_) => MessageType::SetFilter,
            Self::ClearFilters => MessageType::ClearFilters,
            Self::NavigateToVerse(_) => MessageType::NavigateToVerse,
            Self::NoteSelected(_) => MessageType::NoteSelected,
            Self::ResourceLoaded(_) => MessageType::ResourceLoaded,
        }
    }

    /// A `State` payload that moves its key back to absent.
    pub fn is_clearing(&self) -> bool {
        match self {
            Self::HighlightAlignment(set) => set.is_empty(),
            Self::SetFilter(filter) => filter.is_empty(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: Uuid,
    lifecycle: Lifecycle,
    state_key: Option<String>,
    ttl: Option<Duration>,
    #[serde(flatten)]
    payload: MessagePayload,
    source: PanelId,
    target: Option<PanelId>,
    timestamp: Option<Timestamp>,
}

impl Message {
    pub fn builder(payload: MessagePayload) -> MessageBuilder {
        MessageBuilder::new(payload)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn state_key(&self) -> Option<&str> {
        self.state_key.as_deref()
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn payload(&self) -> &MessagePayload {
        &self.payload
    }

    pub fn source(&self) -> &PanelId {
        &self.source
    }

    pub fn target(&self) -> Option<&PanelId> {
        self.target.as_ref()
    }

    /// Unset until the bus stamps the message on send.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    /// Whether delivery to `panel_id` is allowed by the target filter.
    pub fn is_for(&self, panel_id: &PanelId) -> bool {
        self.target.as_ref().map_or(true, |target| target == panel_id)
    }

    pub(crate) fn stamp(&mut self, timestamp: Timestamp) -> Timestamp {
        *self.timestamp.get_or_insert(timestamp)
    }
}

#[derive(Debug, Clone)]
pub struct MessageBuilder {
    payload: MessagePayload,
    source: Option<PanelId>,
    target: Option<PanelId>,
    ttl: Option<Duration>,
    timestamp: Option<Timestamp>,
}

impl MessageBuilder {
    pub fn new(payload: MessagePayload) -> Self {
        Self {
            payload,
            source: None,
            target: None,
            ttl: None,
            timestamp: None,
        }
    }

    pub fn source(mut self, source: impl Into<PanelId>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn target(mut self, target: impl Into<PanelId>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Overrides the send-time stamp. Normally left to the bus clock.
    pub fn timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn build(self) -> BusResult<Message> {
        let message_type = self.payload.message_type();
        let lifecycle = message_type.lifecycle();

        let source = self
            .source
            .ok_or(BusError::MissingSource { message_type })?;
        if self.ttl.is_some() && lifecycle != Lifecycle::Event {
            return Err(BusError::TtlNotAllowed {
                message_type,
                lifecycle,
            });
        }

        Ok(Message {
            id: Uuid::new_v4(),
            lifecycle,
            state_key: message_type.state_key().map(str::to_string),
            ttl: self.ttl,
            payload: self.payload,
            source,
            target: self.target,
            timestamp: self.timestamp,
        })
    }
}
