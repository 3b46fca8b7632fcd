//! Interaction coordinator.
//!
//! [`PanelSync`] turns user interactions (click, hover, note selection) into
//! resolved highlight sets and sends them on the bus. Panels only ever talk to
//! the bus, never to each other.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    alignment::PanelRole,
    bus::{
        BusResult, Delivery, FilterSpec, Message, MessageBus, MessagePayload, NoteSelection,
        PanelId,
    },
    quote::QuoteMatcher,
    resolver::{HighlightSet, PanelTokens, Resolver},
    verse_ref::VerseRef,
};

pub struct PanelSync {
    bus: Arc<MessageBus>,
    resolver: Resolver,
    matcher: QuoteMatcher,
    hover_ttl: Duration,
}

impl PanelSync {
    pub fn new(bus: Arc<MessageBus>) -> Self {
        let hover_ttl = bus.config().hover_ttl;
        Self {
            bus,
            resolver: Resolver::new(),
            matcher: QuoteMatcher::new(),
            hover_ttl,
        }
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    /// Resolves a click and publishes the result as the active highlight.
    /// Clicking something no panel renders publishes an empty set, which
    /// clears the highlight.
    pub fn click(&self, panel_id: &PanelId, unique_id: &str) -> BusResult<HighlightSet> {
        let panels = self.bus.snapshot_tokens()?;
        let set = self.resolver.resolve(panel_id, unique_id, &panels);
        self.send(
            MessagePayload::HighlightAlignment(set.clone()),
            panel_id,
            None,
        )?;
        Ok(set)
    }

    /// Hovering a token or leaving it. Hover events expire quickly.
    pub fn hover(&self, panel_id: &PanelId, unique_id: Option<&str>) -> BusResult<Delivery> {
        let payload = match unique_id {
            Some(unique_id) => {
                let panels = self.bus.snapshot_tokens()?;
                MessagePayload::HoverAlignment(self.resolver.resolve(panel_id, unique_id, &panels))
            }
            None => MessagePayload::HoverCleared,
        };
        self.send(payload, panel_id, Some(self.hover_ttl))
    }

    pub fn clear(&self, panel_id: &PanelId) -> BusResult<Delivery> {
        self.send(MessagePayload::ClearHighlight, panel_id, None)
    }

    pub fn navigate(&self, panel_id: &PanelId, verse_ref: VerseRef) -> BusResult<Delivery> {
        self.send(MessagePayload::NavigateToVerse(verse_ref), panel_id, None)
    }

    pub fn set_filter(&self, panel_id: &PanelId, filter: FilterSpec) -> BusResult<Delivery> {
        self.send(MessagePayload::SetFilter(filter), panel_id, None)
    }

    pub fn clear_filters(&self, panel_id: &PanelId) -> BusResult<Delivery> {
        self.send(MessagePayload::ClearFilters, panel_id, None)
    }

    /// Highlights the original-language words a note quotes, together with
    /// everything aligned to them.
    pub fn select_note(
        &self,
        panel_id: &PanelId,
        verse_ref: &VerseRef,
        quote: &str,
        occurrence: i32,
    ) -> BusResult<HighlightSet> {
        let panels = self.bus.snapshot_tokens()?;
        let mut set = HighlightSet::default();

        for (original_id, original) in originals(&panels) {
            let verse_tokens: Vec<_> = original
                .tokens()
                .iter()
                .filter(|t| &t.verse_ref == verse_ref)
                .cloned()
                .collect();
            for token in self.matcher.find(&verse_tokens, quote, occurrence) {
                set.merge(
                    self.resolver
                        .resolve(original_id, &token.unique_id, &panels),
                );
            }
        }
        set.origin = Some(panel_id.clone());
        tracing::debug!("note quote {:?} highlights {} tokens", quote, set.total());

        self.send(
            MessagePayload::NoteSelected(NoteSelection {
                verse_ref: verse_ref.clone(),
                quote: quote.to_string(),
                occurrence,
            }),
            panel_id,
            None,
        )?;
        self.send(
            MessagePayload::HighlightAlignment(set.clone()),
            panel_id,
            None,
        )?;
        Ok(set)
    }

    fn send(
        &self,
        payload: MessagePayload,
        source: &PanelId,
        ttl: Option<Duration>,
    ) -> BusResult<Delivery> {
        let mut builder = Message::builder(payload).source(source.clone());
        if let Some(ttl) = ttl {
            builder = builder.ttl(ttl);
        }
        self.bus.send(builder.build()?)
    }
}

fn originals(panels: &[(PanelId, PanelTokens)]) -> impl Iterator<Item = (&PanelId, &PanelTokens)> {
    panels
        .iter()
        .filter(|(_, tokens)| tokens.role() == PanelRole::Original)
        .map(|(id, tokens)| (id, tokens))
}
