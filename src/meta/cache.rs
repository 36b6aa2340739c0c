//! Per-run lookup cache.
//!
//! A bug, revision or reviewer named by several commits of one push is
//! fetched once. Entries live for the whole run.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use crate::bugzilla::Bug;
use crate::conduit::{Reviewer, Revision};

#[derive(Debug, Default)]
pub struct LookupCache {
    bugs: HashMap<u64, Bug>,
    revisions: HashMap<u64, Revision>,
    reviewers: HashMap<String, Reviewer>,
}

/// Return the cached value for `key`, computing and storing it on a miss.
/// Failures are not cached.
fn get_or_try_insert<K, V, E>(
    map: &mut HashMap<K, V>,
    key: K,
    compute: impl FnOnce(&K) -> Result<V, E>,
) -> Result<&V, E>
where
    K: Eq + Hash,
{
    match map.entry(key) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => {
            let value = compute(entry.key())?;
            Ok(entry.insert(value))
        }
    }
}

impl LookupCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bug<E>(&mut self, id: u64, fetch: impl FnOnce(u64) -> Result<Bug, E>) -> Result<&Bug, E> {
        get_or_try_insert(&mut self.bugs, id, |id| fetch(*id))
    }

    pub fn revision<E>(&mut self, id: u64, fetch: impl FnOnce(u64) -> Result<Revision, E>) -> Result<&Revision, E> {
        get_or_try_insert(&mut self.revisions, id, |id| fetch(*id))
    }

    pub fn reviewer<E>(
        &mut self,
        name: &str,
        fetch: impl FnOnce(&str) -> Result<Reviewer, E>,
    ) -> Result<&Reviewer, E> {
        get_or_try_insert(&mut self.reviewers, name.to_string(), |name| fetch(name))
    }

    /// (bugs, revisions, reviewers) currently cached
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.bugs.len(), self.revisions.len(), self.reviewers.len())
    }
}
