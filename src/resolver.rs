//! Cross-panel highlight resolution.
//!
//! Given a clicked token and the tokens every live panel currently renders,
//! the [`Resolver`] returns per panel the tokens that share the clicked
//! token's [`SourceKey`]. The clicked panel is resolved like any other, so
//! the clicked token and its repeats in the same panel are included.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    alignment::{AlignmentIndex, GroupMember, PanelRole, SourceKey},
    bus::PanelId,
    extractor::{TextSpan, WordToken},
};

/// Tokens a panel currently renders, as reported to the bus, with the
/// alignment index over them.
#[derive(Debug, Clone, Default)]
pub struct PanelTokens {
    role: PanelRole,
    tokens: Vec<WordToken>,
    index: AlignmentIndex,
}

impl PanelTokens {
    pub fn new(role: PanelRole, tokens: Vec<WordToken>) -> Self {
        let index = AlignmentIndex::build(&tokens, role);
        Self {
            role,
            tokens,
            index,
        }
    }

    /// Reuses an index already built over `tokens`, such as a pipeline
    /// result's. The role is the index's.
    pub fn with_index(tokens: Vec<WordToken>, index: AlignmentIndex) -> Self {
        Self {
            role: index.role(),
            tokens,
            index,
        }
    }

    pub fn role(&self) -> PanelRole {
        self.role
    }

    pub fn tokens(&self) -> &[WordToken] {
        &self.tokens
    }

    pub fn index(&self) -> &AlignmentIndex {
        &self.index
    }

    pub fn find(&self, unique_id: &str) -> Option<&WordToken> {
        self.tokens
            .iter()
            .find(|t| t.is_highlightable && t.unique_id == unique_id)
    }

    pub fn source_key_of(&self, unique_id: &str) -> Option<&SourceKey> {
        self.index.source_key_for(unique_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Highlight {
    pub unique_id: String,
    pub span: TextSpan,
}

impl From<&WordToken> for Highlight {
    fn from(token: &WordToken) -> Self {
        Self {
            unique_id: token.unique_id.clone(),
            span: token.span,
        }
    }
}

impl From<&GroupMember> for Highlight {
    fn from(member: &GroupMember) -> Self {
        Self {
            unique_id: member.unique_id.clone(),
            span: member.span,
        }
    }
}

/// Highlights per panel. Within a panel, ordered by span.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HighlightSet {
    pub origin: Option<PanelId>,
    pub source_keys: Vec<SourceKey>,
    pub panels: BTreeMap<PanelId, Vec<Highlight>>,
}

impl HighlightSet {
    pub fn is_empty(&self) -> bool {
        self.panels.values().all(Vec::is_empty)
    }

    /// Number of highlighted tokens across all panels.
    pub fn total(&self) -> usize {
        self.panels.values().map(Vec::len).sum()
    }

    pub fn for_panel(&self, panel_id: &PanelId) -> &[Highlight] {
        self.panels
            .get(panel_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn contains(&self, panel_id: &PanelId, unique_id: &str) -> bool {
        self.for_panel(panel_id)
            .iter()
            .any(|h| h.unique_id == unique_id)
    }

    /// Union with another set, keeping span order and dropping duplicates.
    pub fn merge(&mut self, other: HighlightSet) {
        if self.origin.is_none() {
            self.origin = other.origin;
        }
        for key in other.source_keys {
            if !self.source_keys.contains(&key) {
                self.source_keys.push(key);
            }
        }
        for (panel, highlights) in other.panels {
            let entry = self.panels.entry(panel).or_default();
            for highlight in highlights {
                if !entry.contains(&highlight) {
                    entry.push(highlight);
                }
            }
            entry.sort_by_key(|h| h.span);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Resolver;

impl Resolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolves a click on `unique_id` in panel `origin`.
    ///
    /// An unknown token resolves to an empty set. A token without a source
    /// key resolves to itself only.
    #[tracing::instrument(level = "debug", skip(self, panels))]
    pub fn resolve(
        &self,
        origin: &PanelId,
        unique_id: &str,
        panels: &[(PanelId, PanelTokens)],
    ) -> HighlightSet {
        let Some((_, origin_tokens)) = panels.iter().find(|(id, _)| id == origin) else {
            tracing::debug!("panel {} is not live", origin);
            return HighlightSet::default();
        };
        let Some(clicked) = origin_tokens.find(unique_id) else {
            tracing::debug!("token {} not rendered by {}", unique_id, origin);
            return HighlightSet::default();
        };
        let key = origin_tokens.source_key_of(unique_id);
        self.resolve_with_key(origin, clicked, key, panels)
    }

    /// Resolves with the clicked token's source key already looked up.
    /// Each panel answers through its own index, so keys from panels of
    /// different roles meet through [`SourceKey::matches`].
    pub fn resolve_with_key(
        &self,
        origin: &PanelId,
        clicked: &WordToken,
        key: Option<&SourceKey>,
        panels: &[(PanelId, PanelTokens)],
    ) -> HighlightSet {
        let mut set = HighlightSet {
            origin: Some(origin.clone()),
            ..Default::default()
        };

        let Some(key) = key else {
            set.panels
                .insert(origin.clone(), vec![Highlight::from(clicked)]);
            return set;
        };
        set.source_keys.push(key.clone());

        for (panel_id, panel) in panels {
            let mut matched: Vec<Highlight> = panel
                .index()
                .groups_matching(key)
                .flat_map(|group| group.members.iter())
                .map(Highlight::from)
                .collect();
            if matched.is_empty() {
                continue;
            }
            matched.sort_by_key(|h| h.span);
            set.panels.insert(panel_id.clone(), matched);
        }

        tracing::debug!(
            "{} resolved to {} tokens in {} panels",
            key,
            set.total(),
            set.panels.len()
        );
        set
    }
}
