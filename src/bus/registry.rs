//! Live panel registry.
//!
//! A registration outlives the endpoint it currently points at: re-rendering a
//! panel swaps the endpoint in place and keeps the panel's position in the
//! delivery order.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use dashmap::{mapref::entry::Entry, DashMap};

use super::message::{Message, PanelId};
use crate::resolver::PanelTokens;

/// Callbacks a mounted panel exposes to the bus.
#[mockall::automock]
pub trait PanelEndpoint: Send + Sync {
    /// Called synchronously for each message addressed to the panel.
    fn receive(&self, message: &Message);

    /// Tokens the panel renders right now.
    fn current_tokens(&self) -> PanelTokens;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    New,
    /// The panel was already registered; only its endpoint changed.
    Replaced,
}

struct PanelSlot {
    order: u64,
    endpoint: Arc<dyn PanelEndpoint>,
}

#[derive(Default)]
pub struct PanelRegistry {
    panels: DashMap<PanelId, PanelSlot>,
    next_order: AtomicU64,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, panel_id: PanelId, endpoint: Arc<dyn PanelEndpoint>) -> Registration {
        match self.panels.entry(panel_id) {
            Entry::Occupied(mut slot) => {
                slot.get_mut().endpoint = endpoint;
                Registration::Replaced
            }
            Entry::Vacant(slot) => {
                let order = self.next_order.fetch_add(1, Ordering::SeqCst);
                slot.insert(PanelSlot { order, endpoint });
                Registration::New
            }
        }
    }

    /// Swaps the endpoint of a registered panel. Unknown panels are left
    /// unregistered.
    pub fn update_endpoint(&self, panel_id: &PanelId, endpoint: Arc<dyn PanelEndpoint>) -> bool {
        match self.panels.get_mut(panel_id) {
            Some(mut slot) => {
                slot.endpoint = endpoint;
                true
            }
            None => false,
        }
    }

    pub fn unregister(&self, panel_id: &PanelId) -> bool {
        self.panels.remove(panel_id).is_some()
    }

    pub fn contains(&self, panel_id: &PanelId) -> bool {
        self.panels.contains_key(panel_id)
    }

    pub fn endpoint(&self, panel_id: &PanelId) -> Option<Arc<dyn PanelEndpoint>> {
        self.panels.get(panel_id).map(|slot| slot.endpoint.clone())
    }

    /// Panels in registration order with their endpoints, copied out so
    /// callbacks run without holding any shard lock.
    pub fn snapshot(&self) -> Vec<(PanelId, Arc<dyn PanelEndpoint>)> {
        let mut panels: Vec<_> = self
            .panels
            .iter()
            .map(|entry| (entry.order, entry.key().clone(), entry.endpoint.clone()))
            .collect();
        panels.sort_by_key(|(order, _, _)| *order);
        panels
            .into_iter()
            .map(|(_, id, endpoint)| (id, endpoint))
            .collect()
    }

    /// Panels a message is addressed to, in registration order.
    pub fn recipients(&self, message: &Message) -> Vec<(PanelId, Arc<dyn PanelEndpoint>)> {
        self.snapshot()
            .into_iter()
            .filter(|(id, _)| message.is_for(id))
            .collect()
    }

    pub fn ids(&self) -> Vec<PanelId> {
        self.snapshot().into_iter().map(|(id, _)| id).collect()
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn clear(&self) {
        self.panels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Arc<dyn PanelEndpoint> {
        Arc::new(MockPanelEndpoint::new())
    }

    #[test]
    fn test_registration_order() {
        let registry = PanelRegistry::new();
        registry.register("ugnt".into(), endpoint());
        registry.register("ult".into(), endpoint());
        registry.register("ust".into(), endpoint());
        assert_eq!(
            registry.ids(),
            vec![PanelId::from("ugnt"), PanelId::from("ult"), PanelId::from("ust")]
        );
    }

    #[test]
    fn test_reregister_keeps_position() {
        let registry = PanelRegistry::new();
        assert_eq!(registry.register("ugnt".into(), endpoint()), Registration::New);
        registry.register("ult".into(), endpoint());
        assert_eq!(
            registry.register("ugnt".into(), endpoint()),
            Registration::Replaced
        );
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids()[0], PanelId::from("ugnt"));
    }

    #[test]
    fn test_update_endpoint_requires_registration() {
        let registry = PanelRegistry::new();
        assert!(!registry.update_endpoint(&"ult".into(), endpoint()));
        assert!(!registry.contains(&"ult".into()));
        registry.register("ult".into(), endpoint());
        assert!(registry.update_endpoint(&"ult".into(), endpoint()));
    }

    #[test]
    fn test_unregister() {
        let registry = PanelRegistry::new();
        registry.register("ult".into(), endpoint());
        assert!(registry.unregister(&"ult".into()));
        assert!(!registry.unregister(&"ult".into()));
        assert!(registry.is_empty());
    }
}
