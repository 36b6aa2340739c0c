//!  Reference handling.
//!
//!  Git refs are pointers to commits.  phlay needs three things from them:
//! - resolving HEAD and user supplied revision expressions
//! - noticing a git-cinnabar clone (`refs/cinnabar/metadata`)
//! - moving the branch HEAD points at once history has been rewritten

use git2::Repository;

use crate::vcs::error::{VcsError, VcsResult};
use crate::vcs::types::CommitId;

/// Manages Git references.
pub struct RefManager;

impl RefManager {
    /// the ref git-cinnabar keeps its Mercurial metadata under
    pub const CINNABAR_METADATA: &'static str = "refs/cinnabar/metadata";

    /// Get the current HEAD commit.
    pub fn head_commit(repo: &Repository) -> VcsResult<CommitId> {
        let head = repo.head().map_err(|e| {
            if e.code() == git2::ErrorCode::UnbornBranch {
                VcsError::EmptyRepository
            } else {
                VcsError::Git(e)
            }
        })?;

        let commit = head.peel_to_commit()?;
        Ok(CommitId::new(commit.id()))
    }

    /// Resolve a revision expression (`HEAD~2`, a branch, a hash) to a commit.
    pub fn resolve(repo: &Repository, spec: &str) -> VcsResult<CommitId> {
        let object = repo
            .revparse_single(spec)
            .map_err(|_| VcsError::UnknownRevision(spec.to_string()))?;
        let commit = object
            .peel_to_commit()
            .map_err(|_| VcsError::UnknownRevision(spec.to_string()))?;
        Ok(CommitId::new(commit.id()))
    }

    /// Check if this clone is backed by a Mercurial remote.
    pub fn is_cinnabar_clone(repo: &Repository) -> bool {
        repo.find_reference(Self::CINNABAR_METADATA).is_ok()
    }

    /// Point the reference HEAD resolves to at a new commit.
    ///
    /// With a detached HEAD, HEAD itself is moved.
    pub fn update_head(repo: &Repository, target: CommitId) -> VcsResult<()> {
        let mut reference = repo.head()?.resolve()?;
        reference.set_target(target.raw(), &format!("phlay: update to {}", target.short()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_repo_with_commit() -> (TempDir, Repository, CommitId) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        let commit_id = {
            let tree_oid = repo.treebuilder(None).unwrap().write().unwrap();
            let tree = repo.find_tree(tree_oid).unwrap();
            let sig = git2::Signature::now("Test", "test@test.com").unwrap();

            let commit_oid = repo
                .commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
                .unwrap();
            CommitId::new(commit_oid)
        };

        (dir, repo, commit_id)
    }

    #[test]
    fn test_head_commit() {
        let (_dir, repo, expected) = setup_repo_with_commit();
        assert_eq!(RefManager::head_commit(&repo).unwrap(), expected);
        assert_eq!(RefManager::resolve(&repo, "HEAD").unwrap(), expected);
    }

    #[test]
    fn test_empty_repository() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert!(matches!(RefManager::head_commit(&repo), Err(VcsError::EmptyRepository)));
    }

    #[test]
    fn test_unknown_revision() {
        let (_dir, repo, _) = setup_repo_with_commit();
        let result = RefManager::resolve(&repo, "no-such-branch");
        assert!(matches!(result, Err(VcsError::UnknownRevision(spec)) if spec == "no-such-branch"));
    }

    #[test]
    fn test_cinnabar_detection() {
        let (_dir, repo, head) = setup_repo_with_commit();
        assert!(!RefManager::is_cinnabar_clone(&repo));

        repo.reference(RefManager::CINNABAR_METADATA, head.raw(), false, "test")
            .unwrap();
        assert!(RefManager::is_cinnabar_clone(&repo));
    }

    #[test]
    fn test_update_head_moves_branch() {
        let (_dir, repo, first) = setup_repo_with_commit();
        let branch_ref = repo.head().unwrap().resolve().unwrap().name().unwrap().to_string();

        let second = {
            let parent = repo.find_commit(first.raw()).unwrap();
            let tree = parent.tree().unwrap();
            let sig = git2::Signature::now("Test", "test@test.com").unwrap();
            CommitId::new(repo.commit(None, &sig, &sig, "Second", &tree, &[&parent]).unwrap())
        };

        RefManager::update_head(&repo, second).unwrap();
        assert_eq!(RefManager::head_commit(&repo).unwrap(), second);
        let target = repo.find_reference(&branch_ref).unwrap().target().unwrap();
        assert_eq!(target, second.raw());
    }
}
