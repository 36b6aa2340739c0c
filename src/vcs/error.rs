//! VCS layer error types
//!
//! All errors that can occur while reading or rewriting local history.
//! We use `thiserror` for ergonomic error definition and better error messages

use thiserror::Error;

use crate::vcs::types::CommitId;

/// the main error type for repository operations
#[derive(Debug, Error)]
pub enum VcsError {
    /// error from the underlying Git library
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// a revision expression could not be resolved
    #[error("cannot resolve revision: {0}")]
    UnknownRevision(String),

    /// the commit was not found
    #[error("commit not found: {0}")]
    CommitNotFound(String),

    /// a walked commit has more than one parent
    #[error("cannot handle merge commits ({0})")]
    MergeCommitUnsupported(CommitId),

    /// a walk ran off the start of history, or a root commit was selected
    #[error("commit {0} has no parent")]
    RootCommit(CommitId),

    /// a walk from one commit never reached the other
    #[error("{base} is not an ancestor of {tip}")]
    NotAnAncestor { base: CommitId, tip: CommitId },

    /// a signature time that cannot be represented, so it could not be
    /// written back unchanged
    #[error("unrepresentable signature time {seconds} with offset {offset_minutes} minutes")]
    InvalidTimestamp { seconds: i64, offset_minutes: i32 },

    /// the selected range contains no commits
    #[error("no commits in range")]
    EmptyRange,

    /// the repository has no working directory (bare)
    #[error("repository has no working directory")]
    NoWorkdir,

    /// HEAD does not point at a commit yet
    #[error("repository is empty: no commits found")]
    EmptyRepository,

    /// I/O error (filesystem level)
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VcsError {
    /// check if this error is about history shape rather than git itself
    pub fn is_unsupported_history(&self) -> bool {
        matches!(
            self,
            VcsError::MergeCommitUnsupported(_)
                | VcsError::RootCommit(_)
                | VcsError::NotAnAncestor { .. }
        )
    }
}

/// result type alias for repository operations
pub type VcsResult<T> = Result<T, VcsError>;
