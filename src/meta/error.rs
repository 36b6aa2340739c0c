//! Enrichment errors.

use thiserror::Error;

use crate::bugzilla::BugzillaError;
use crate::conduit::ConduitError;
use crate::diff::DiffError;
use crate::vcs::{CommitId, VcsError};

/// Result type for enrichment.
pub type MetaResult<T> = Result<T, MetaError>;

/// Enrichment errors.
#[derive(Debug, Error)]
pub enum MetaError {
    #[error("conduit error: {0}")]
    Conduit(#[from] ConduitError),

    #[error("bugzilla error: {0}")]
    Bugzilla(#[from] BugzillaError),

    #[error("diff error: {0}")]
    Diff(#[from] DiffError),

    #[error("vcs error: {0}")]
    Vcs(#[from] VcsError),

    #[error("no such revision D{0}")]
    NoSuchRevision(u64),

    #[error("unknown reviewer {0}")]
    UnknownReviewer(String),

    /// The hash bridge has no changeset for a commit it should have mapped.
    #[error("no mercurial changeset for {0}")]
    UnmappedCommit(CommitId),
}

impl MetaError {
    /// Check if a referenced bug, revision or reviewer could not be found.
    pub fn is_lookup(&self) -> bool {
        match self {
            MetaError::NoSuchRevision(_) | MetaError::UnknownReviewer(_) => true,
            MetaError::Bugzilla(e) => e.is_lookup(),
            _ => false,
        }
    }
}
