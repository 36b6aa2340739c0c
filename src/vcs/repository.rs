//!   Core Git repository wrapper.
//!
//!  This wraps `git2::Repository` and provides the high-level operations the
//!  rest of phlay uses: selecting the commits to push, reading blobs for
//!  binary uploads, and rewriting the pushed commits afterwards.

use std::path::Path;

use git2::Repository;
use tracing::debug;

use crate::vcs::commit::{self, CommitBuilder, CommitInfo};
use crate::vcs::error::{VcsError, VcsResult};
use crate::vcs::refs::RefManager;
use crate::vcs::types::{BlobId, CommitId, RemoteVcs};

/// The commits a single phlay invocation works on.
#[derive(Debug, Clone)]
pub struct Selection {
    /// the commits to push, oldest first
    pub commits: Vec<CommitInfo>,
    /// commits between the last pushed commit and HEAD, oldest first;
    /// these get reparented once the pushed commits are rewritten
    pub trailing: Vec<CommitInfo>,
}

/// The main Git repository wrapper.
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Find the repository containing `path`.
    pub fn discover(path: impl AsRef<Path>) -> VcsResult<Self> {
        let repo = Repository::discover(path.as_ref())?;
        Ok(Self { repo })
    }

    /// Wrap an already opened repository.
    pub fn from_repository(repo: Repository) -> Self {
        Self { repo }
    }

    /// Get the underlying git2 repository.
    pub fn inner(&self) -> &Repository {
        &self.repo
    }

    /// Get the working directory, where `.arcconfig` lives.
    pub fn workdir(&self) -> VcsResult<&Path> {
        self.repo.workdir().ok_or(VcsError::NoWorkdir)
    }

    /// Which VCS the review server sees for this clone.
    pub fn remote_vcs(&self) -> RemoteVcs {
        if RefManager::is_cinnabar_clone(&self.repo) {
            RemoteVcs::Hg
        } else {
            RemoteVcs::Git
        }
    }

    // ==================== History ====================

    /// Get the current HEAD commit.
    pub fn head(&self) -> VcsResult<CommitId> {
        RefManager::head_commit(&self.repo)
    }

    /// Resolve a revision expression to a commit.
    pub fn resolve(&self, spec: &str) -> VcsResult<CommitId> {
        RefManager::resolve(&self.repo, spec)
    }

    /// Get information about a commit.
    pub fn get_commit(&self, id: CommitId) -> VcsResult<CommitInfo> {
        commit::get_commit(&self.repo, id)
    }

    /// Walk first parents from `start` until `stop` holds, oldest first.
    pub fn commit_range<F, E>(&self, start: CommitId, stop: F) -> Result<Vec<CommitInfo>, E>
    where
        F: FnMut(&CommitInfo) -> Result<bool, E>,
        E: From<VcsError>,
    {
        commit::commit_range(&self.repo, start, stop)
    }

    /// Walk from `tip` down to `base` (exclusive).
    ///
    /// Running off the root means `base` was never reached.
    pub fn commits_between(&self, base: CommitId, tip: CommitId) -> VcsResult<Vec<CommitInfo>> {
        self.commit_range(tip, |c| Ok::<_, VcsError>(c.id == base))
            .map_err(|e| match e {
                VcsError::RootCommit(_) => VcsError::NotAnAncestor { base, tip },
                other => other,
            })
    }

    /// Select the commits named on the command line.
    ///
    /// `base..tip` selects the range with either side defaulting to HEAD,
    /// anything else selects that single commit.
    pub fn select(&self, spec: &str) -> VcsResult<Selection> {
        let head = self.head()?;

        let commits = match spec.split_once("..") {
            Some((base, tip)) => {
                let base = self.resolve_or_head(base, head)?;
                let tip = self.resolve_or_head(tip, head)?;
                self.commits_between(base, tip)?
            }
            None => vec![self.get_commit(self.resolve(spec)?)?],
        };

        let last = commits.last().ok_or(VcsError::EmptyRange)?.id;
        let trailing = self.commits_between(last, head)?;
        debug!(
            "selected {} commit(s) with {} trailing commit(s) above them",
            commits.len(),
            trailing.len()
        );

        Ok(Selection { commits, trailing })
    }

    fn resolve_or_head(&self, spec: &str, head: CommitId) -> VcsResult<CommitId> {
        if spec.is_empty() {
            Ok(head)
        } else {
            self.resolve(spec)
        }
    }

    // ==================== Objects ====================

    /// Read the full content of a blob.
    pub fn blob_content(&self, id: BlobId) -> VcsResult<Vec<u8>> {
        let blob = self.repo.find_blob(id.raw())?;
        Ok(blob.content().to_vec())
    }

    // ==================== Rewriting ====================

    /// Recreate `original` on top of `parent` with a new message.
    pub fn rewrite(&self, original: &CommitInfo, parent: CommitId, message: &str) -> VcsResult<CommitId> {
        CommitBuilder::from_commit(&self.repo, original)
            .message(message)
            .parent(parent)
            .commit()
    }

    /// Recreate each commit unchanged on top of the previous one, starting
    /// from `onto`. Returns the new tip.
    pub fn reparent(&self, commits: &[CommitInfo], onto: CommitId) -> VcsResult<CommitId> {
        let mut tip = onto;
        for commit in commits {
            tip = CommitBuilder::from_commit(&self.repo, commit)
                .parent(tip)
                .commit()?;
        }
        Ok(tip)
    }

    /// Move the branch HEAD points at.
    pub fn update_head(&self, target: CommitId) -> VcsResult<()> {
        RefManager::update_head(&self.repo, target)
    }
}
