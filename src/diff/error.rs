//! Diff building errors.

use thiserror::Error;

use crate::vcs::VcsError;

/// Result type for diff building.
pub type DiffResult<T> = Result<T, DiffError>;

/// Diff building errors.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("vcs error: {0}")]
    Vcs(#[from] VcsError),

    /// Renames, copies, type changes and the like never show up in a plain
    /// tree-to-tree diff; seeing one means the diff was built wrongly.
    #[error("unhandled delta status {status:?} for {path}")]
    UnhandledDeltaStatus { status: git2::Delta, path: String },

    /// File headers, hunk headers and binary markers are never part of a
    /// hunk's lines.
    #[error("bad line origin {0:?}")]
    UnhandledLineOrigin(git2::DiffLineType),

    #[error("missing delta {0} in diff")]
    MissingDelta(usize),
}
