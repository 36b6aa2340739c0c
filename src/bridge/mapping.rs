//! Git commit id to Mercurial changeset id mapping.

use std::collections::HashMap;
use std::fmt;

use crate::vcs::CommitId;

/// A Mercurial changeset id, as 40 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignId(String);

impl ForeignId {
    /// The all-zero id Mercurial uses for a missing parent.
    pub const NULL: &'static str = "0000000000000000000000000000000000000000";

    /// Render a raw 20-byte node.
    pub fn from_node(node: &[u8; 20]) -> Self {
        Self(hex::encode(node))
    }

    /// Parse a 40 character hex id, as printed by `git cinnabar git2hg`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.len() == 40 && text.bytes().all(|b| b.is_ascii_hexdigit()) {
            Some(Self(text.to_ascii_lowercase()))
        } else {
            None
        }
    }

    /// Check if this is the null changeset.
    pub fn is_null(&self) -> bool {
        self.0 == Self::NULL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First twelve characters, for display.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for ForeignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Append-only map from git commits to their Mercurial changesets.
///
/// Entries are never invalidated during a run.
#[derive(Debug, Default, Clone)]
pub struct IdMapping {
    entries: HashMap<CommitId, ForeignId>,
}

impl IdMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, commit: &CommitId) -> Option<&ForeignId> {
        self.entries.get(commit)
    }

    pub fn contains(&self, commit: &CommitId) -> bool {
        self.entries.contains_key(commit)
    }

    /// Record a mapping. An existing entry for the commit is kept.
    pub fn insert(&mut self, commit: CommitId, foreign: ForeignId) {
        self.entries.entry(commit).or_insert(foreign);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_foreign_id() {
        let id = ForeignId::parse("  ABCDEF0123456789abcdef0123456789abcdef01\n").unwrap();
        assert_eq!(id.as_str(), "abcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(id.short(), "abcdef012345");
        assert!(!id.is_null());

        assert!(ForeignId::parse("xyz").is_none());
        assert!(ForeignId::parse(ForeignId::NULL).unwrap().is_null());
    }

    #[test]
    fn test_from_node() {
        let mut node = [0u8; 20];
        node[0] = 0xab;
        node[19] = 0x01;
        let id = ForeignId::from_node(&node);
        assert_eq!(id.as_str().len(), 40);
        assert!(id.as_str().starts_with("ab00"));
        assert!(id.as_str().ends_with("01"));
    }

    #[test]
    fn test_mapping_is_append_only() {
        let commit = CommitId::from_hex("0123456789abcdef0123456789abcdef01234567").unwrap();
        let first = ForeignId::parse(&"1".repeat(40)).unwrap();
        let second = ForeignId::parse(&"2".repeat(40)).unwrap();

        let mut mapping = IdMapping::new();
        mapping.insert(commit, first.clone());
        mapping.insert(commit, second);

        assert_eq!(mapping.get(&commit), Some(&first));
        assert_eq!(mapping.len(), 1);
    }
}
