//! Commit id translation for git-cinnabar clones.
//!
//! When the Phabricator repository is Mercurial, every commit id phlay sends
//! must be a Mercurial changeset id. Asking git-cinnabar one commit at a time
//! is slow, and commits that were never pushed have no changeset yet, so the
//! whole batch is exported as a bundle and the ids are read out of it.

mod bundle;
mod cinnabar;
mod error;
mod mapping;

use std::fs::File;
use std::io::BufReader;

use tracing::info;

use crate::vcs::{CommitInfo, GitRepository};

pub use bundle::{read_mappings, BundleReader, ChangesetHeader, BUNDLE_MAGIC};
pub use cinnabar::{ChangesetSource, Cinnabar};
pub use error::{BridgeError, BridgeResult, BundleFormatError};
pub use mapping::{ForeignId, IdMapping};

/// Fills an [`IdMapping`] from bundles produced by a [`ChangesetSource`].
pub struct HashBridge<S> {
    source: S,
    mapping: IdMapping,
}

impl<S: ChangesetSource> HashBridge<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            mapping: IdMapping::new(),
        }
    }

    pub fn mapping(&self) -> &IdMapping {
        &self.mapping
    }

    pub fn into_mapping(self) -> IdMapping {
        self.mapping
    }

    /// Record changeset ids for `commits` (oldest first) and their parents.
    ///
    /// The batch is extended backwards over ancestors cinnabar has no
    /// changeset for, so the bundle starts right above a known changeset.
    pub fn populate(&mut self, repo: &GitRepository, commits: &[CommitInfo]) -> BridgeResult<()> {
        let Some(first) = commits.first() else {
            return Ok(());
        };

        let source = &self.source;
        let mut batch = repo.commit_range(first.parent()?, |c| {
            Ok::<_, BridgeError>(source.git2hg(c.id)?.is_some())
        })?;
        batch.extend(commits.iter().cloned());

        let base = batch[0].parent()?;
        let base_hg = self
            .source
            .git2hg(base)?
            .ok_or(BridgeError::UnmappedCommit(base))?;
        self.mapping.insert(base, base_hg);

        let tip = batch[batch.len() - 1].id;
        info!("Computing {} cinnabar changesets...", batch.len());

        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("bundle");
        self.source.write_bundle(base, tip, &path)?;

        let reader = BufReader::new(File::open(&path)?);
        read_mappings(reader, &batch, &mut self.mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcs::{CommitBuilder, CommitId, Identity, TreeId};
    use git2::Repository;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::Path;
    use tempfile::TempDir;

    /// cinnabar stand-in: knows a fixed set of changesets and hands out a
    /// prepared bundle
    struct FakeSource {
        known: HashMap<CommitId, ForeignId>,
        bundle: Vec<u8>,
        requested: RefCell<Vec<(CommitId, CommitId)>>,
    }

    impl ChangesetSource for FakeSource {
        fn git2hg(&self, commit: CommitId) -> BridgeResult<Option<ForeignId>> {
            Ok(self.known.get(&commit).cloned())
        }

        fn write_bundle(&self, base: CommitId, tip: CommitId, dest: &Path) -> BridgeResult<()> {
            self.requested.borrow_mut().push((base, tip));
            std::fs::write(dest, &self.bundle)?;
            Ok(())
        }
    }

    fn linear_repo(len: usize) -> (TempDir, GitRepository, Vec<CommitId>) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let tree = TreeId::new(repo.treebuilder(None).unwrap().write().unwrap());
        let sig = git2::Signature::new("Test", "test@test.com", &git2::Time::new(1_600_000_000, 0)).unwrap();
        let identity = Identity::from_git2(&sig).unwrap();

        let mut ids: Vec<CommitId> = Vec::new();
        for i in 0..len {
            let mut builder = CommitBuilder::new(&repo)
                .tree(tree)
                .message(format!("commit {i}"))
                .author(identity.clone())
                .committer(identity.clone());
            if let Some(parent) = ids.last() {
                builder = builder.parent(*parent);
            }
            ids.push(builder.commit().unwrap());
        }
        (dir, GitRepository::from_repository(repo), ids)
    }

    #[test]
    fn test_populate_extends_to_known_ancestor() {
        use bundle::tests::{bundle, node, record};

        // commits 0 and 1 are known to cinnabar, 2 is not, 3 and 4 are pushed
        let (_dir, repo, ids) = linear_repo(5);
        let mut known = HashMap::new();
        known.insert(ids[0], ForeignId::from_node(&node(0xa0)));
        known.insert(ids[1], ForeignId::from_node(&node(0xa1)));

        let source = FakeSource {
            known,
            bundle: bundle(&[
                record(node(0xa2), node(0xa1), b"c2"),
                record(node(0xa3), node(0xa2), b"c3"),
                record(node(0xa4), node(0xa3), b"c4"),
            ]),
            requested: RefCell::new(Vec::new()),
        };

        let commits: Vec<_> = ids[3..].iter().map(|id| repo.get_commit(*id).unwrap()).collect();
        let mut bridge = HashBridge::new(source);
        bridge.populate(&repo, &commits).unwrap();

        assert_eq!(bridge.source.requested.borrow().as_slice(), &[(ids[1], ids[4])]);
        let mapping = bridge.into_mapping();
        assert_eq!(mapping.get(&ids[1]), Some(&ForeignId::from_node(&node(0xa1))));
        assert_eq!(mapping.get(&ids[2]), Some(&ForeignId::from_node(&node(0xa2))));
        assert_eq!(mapping.get(&ids[4]), Some(&ForeignId::from_node(&node(0xa4))));
    }

    #[test]
    fn test_populate_detects_desync() {
        use bundle::tests::{bundle, node, record};

        let (_dir, repo, ids) = linear_repo(3);
        let mut known = HashMap::new();
        known.insert(ids[0], ForeignId::from_node(&node(0xa0)));

        // bundle is missing the record for commit 1
        let source = FakeSource {
            known,
            bundle: bundle(&[record(node(0xa2), node(0xa1), b"")]),
            requested: RefCell::new(Vec::new()),
        };

        let commits = vec![repo.get_commit(ids[1]).unwrap(), repo.get_commit(ids[2]).unwrap()];
        let mut bridge = HashBridge::new(source);
        let err = bridge.populate(&repo, &commits).unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_populate_empty_batch() {
        let (_dir, repo, _) = linear_repo(1);
        let source = FakeSource {
            known: HashMap::new(),
            bundle: Vec::new(),
            requested: RefCell::new(Vec::new()),
        };
        let mut bridge = HashBridge::new(source);
        bridge.populate(&repo, &[]).unwrap();
        assert!(bridge.mapping().is_empty());
    }
}
