//! # Alignment Index
//!
//! Groups extracted tokens by the source-language word they correspond to.
//! A [`SourceKey`] identifies one source word in one verse; an
//! [`AlignmentGroup`] lists every token of a document that maps to it, in
//! document order.
//!
//! The index is built in a single pass over the tokens and answers two
//! lookups: source key to member ids ([`AlignmentIndex::targets_for`]) and
//! member id to source key ([`AlignmentIndex::source_key_for`]).

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    extractor::{normalize_content, TextSpan, WordToken},
    verse_ref::VerseRef,
};

/// What a panel displays, which decides how its tokens find their source word.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PanelRole {
    /// Original-language text; every word is its own source anchor.
    Original,
    /// Aligned translation; words take the key of their milestone.
    #[default]
    Target,
    /// Notes or questions. Only aligned tokens participate.
    Helps,
}

/// Identity of one source-language word within a verse.
///
/// Derived equality is exact and groups tokens within one panel. Keys from
/// panels of different roles are compared with [`SourceKey::matches`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceKey {
    pub verse_ref: VerseRef,
    pub strong: Option<String>,
    pub lemma: Option<String>,
    pub content: String,
    pub occurrence: u32,
}

impl SourceKey {
    /// Source key of a token as seen from a panel with the given role.
    ///
    /// Original-language tokens synthesise the key from their own content,
    /// computed occurrence and word attributes. Other tokens use the
    /// innermost milestone and have no key when unaligned.
    pub fn for_token(token: &WordToken, role: PanelRole) -> Option<Self> {
        if !token.is_highlightable {
            return None;
        }
        match role {
            PanelRole::Original => {
                let word = token.word_attributes.as_ref();
                Some(Self {
                    verse_ref: token.verse_ref.clone(),
                    strong: word.and_then(|w| w.strong.clone()),
                    lemma: word.and_then(|w| w.lemma.clone()),
                    content: normalize_content(&token.content),
                    occurrence: token.occurrence,
                })
            }
            PanelRole::Target | PanelRole::Helps => {
                let alignment = token.alignment.as_ref()?;
                if alignment.source_content.is_none()
                    && alignment.strong.is_none()
                    && alignment.lemma.is_none()
                {
                    return None;
                }
                Some(Self {
                    verse_ref: token.verse_ref.clone(),
                    strong: alignment.strong.clone(),
                    lemma: alignment.lemma.clone(),
                    content: alignment
                        .source_content
                        .as_deref()
                        .map(normalize_content)
                        .unwrap_or_default(),
                    occurrence: alignment.source_occurrence.unwrap_or(1),
                })
            }
        }
    }

    /// Verse, normalised content and occurrence: the part of the key every
    /// panel role can supply.
    pub fn anchor(&self) -> SourceAnchor {
        SourceAnchor {
            verse_ref: self.verse_ref.clone(),
            content: self.content.clone(),
            occurrence: self.occurrence,
        }
    }

    /// Whether both keys name the same source word. The anchors must agree;
    /// strong and lemma are compared only when both keys carry them.
    pub fn matches(&self, other: &SourceKey) -> bool {
        self.verse_ref == other.verse_ref
            && self.content == other.content
            && self.occurrence == other.occurrence
            && compatible(&self.strong, &other.strong)
            && compatible(&self.lemma, &other.lemma)
    }
}

fn compatible(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Position of a source word in a verse, independent of lexical attributes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceAnchor {
    pub verse_ref: VerseRef,
    pub content: String,
    pub occurrence: u32,
}

/// `<verseRef>:<content>:<occurrence>`, the unique id of the source token.
impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.verse_ref, self.content, self.occurrence)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub unique_id: String,
    pub span: TextSpan,
    /// Index among the verse's highlightable tokens.
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentGroup {
    pub key: SourceKey,
    pub members: Vec<GroupMember>,
}

impl AlignmentGroup {
    pub fn unique_ids(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.unique_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether other words sit between the group's members.
    pub fn is_non_contiguous(&self) -> bool {
        self.members
            .windows(2)
            .any(|pair| pair[1].position != pair[0].position + 1)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AlignmentIndex {
    role: PanelRole,
    groups: Vec<AlignmentGroup>,
    #[serde(skip)]
    by_key: HashMap<SourceKey, usize>,
    #[serde(skip)]
    by_member: HashMap<String, usize>,
    #[serde(skip)]
    by_anchor: HashMap<SourceAnchor, Vec<usize>>,
}

impl AlignmentIndex {
    /// Builds the index in one pass. Tokens must be in document order.
    #[tracing::instrument(level = "debug", skip(tokens))]
    pub fn build<'a, I>(tokens: I, role: PanelRole) -> Self
    where
        I: IntoIterator<Item = &'a WordToken>,
    {
        let mut index = Self {
            role,
            ..Default::default()
        };
        let mut current_verse: Option<&VerseRef> = None;
        let mut position = 0;

        for token in tokens.into_iter().filter(|t| t.is_highlightable) {
            if current_verse != Some(&token.verse_ref) {
                current_verse = Some(&token.verse_ref);
                position = 0;
            }
            if let Some(key) = SourceKey::for_token(token, role) {
                index.insert(
                    key,
                    GroupMember {
                        unique_id: token.unique_id.clone(),
                        span: token.span,
                        position,
                    },
                );
            }
            position += 1;
        }

        tracing::debug!("indexed {} alignment groups", index.groups.len());
        index
    }

    fn insert(&mut self, key: SourceKey, member: GroupMember) {
        let slot = match self.by_key.get(&key) {
            Some(slot) => *slot,
            None => {
                self.groups.push(AlignmentGroup {
                    key: key.clone(),
                    members: Vec::new(),
                });
                let slot = self.groups.len() - 1;
                self.by_anchor.entry(key.anchor()).or_default().push(slot);
                self.by_key.insert(key, slot);
                slot
            }
        };
        self.by_member.insert(member.unique_id.clone(), slot);
        self.groups[slot].members.push(member);
    }

    pub fn role(&self) -> PanelRole {
        self.role
    }

    /// Member ids aligned to `key`, in document order.
    pub fn targets_for(&self, key: &SourceKey) -> Vec<&str> {
        self.group_for(key)
            .map(|group| group.unique_ids().collect())
            .unwrap_or_default()
    }

    pub fn source_key_for(&self, unique_id: &str) -> Option<&SourceKey> {
        self.by_member
            .get(unique_id)
            .map(|slot| &self.groups[*slot].key)
    }

    pub fn group_for(&self, key: &SourceKey) -> Option<&AlignmentGroup> {
        self.by_key.get(key).map(|slot| &self.groups[*slot])
    }

    /// Groups whose key [matches](SourceKey::matches) `key`, which may come
    /// from a panel with a different role.
    pub fn groups_matching<'a>(
        &'a self,
        key: &'a SourceKey,
    ) -> impl Iterator<Item = &'a AlignmentGroup> + 'a {
        self.by_anchor
            .get(&key.anchor())
            .into_iter()
            .flatten()
            .map(|slot| &self.groups[*slot])
            .filter(move |group| group.key.matches(key))
    }

    pub fn group_of(&self, unique_id: &str) -> Option<&AlignmentGroup> {
        self.by_member.get(unique_id).map(|slot| &self.groups[*slot])
    }

    /// Groups in order of first appearance.
    pub fn groups(&self) -> impl Iterator<Item = &AlignmentGroup> {
        self.groups.iter()
    }

    pub fn non_contiguous_groups(&self) -> impl Iterator<Item = &AlignmentGroup> {
        self.groups.iter().filter(|g| g.is_non_contiguous())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn member_count(&self) -> usize {
        self.by_member.len()
    }
}
