//! Hash bridge error types.

use std::process::ExitStatus;

use thiserror::Error;

use crate::bridge::mapping::ForeignId;
use crate::vcs::{CommitId, VcsError};

/// Result type for hash bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// The bundle stream did not have the shape we expect.
#[derive(Debug, Error)]
pub enum BundleFormatError {
    /// The stream does not start with the uncompressed changegroup token.
    #[error("bad bundle type: {}", String::from_utf8_lossy(.found))]
    BadMagic { found: Vec<u8> },

    /// A record claims to be shorter than its own fixed header.
    #[error("bad bundle entry: record length {length} is shorter than its header")]
    NegativeBodySize { length: u32 },

    /// The stream ended in the middle of a record.
    #[error("bundle truncated while reading {what}")]
    Truncated { what: &'static str },

    /// A changeset's first parent is not the changeset we recorded for the
    /// commit's git parent, so records and commits are out of step.
    #[error("bad bundle parent for {commit}: expected {}, found {found}", expected_display(.expected))]
    ParentMismatch {
        commit: CommitId,
        expected: Option<ForeignId>,
        found: ForeignId,
    },
}

fn expected_display(expected: &Option<ForeignId>) -> String {
    match expected {
        Some(id) => id.to_string(),
        None => "<unknown>".to_string(),
    }
}

/// Errors that can occur while translating commit ids.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Malformed bundle.
    #[error("bundle format error: {0}")]
    Format(#[from] BundleFormatError),

    /// Local history error (merge commits in the batch, missing commits).
    #[error("vcs error: {0}")]
    Vcs(#[from] VcsError),

    /// git-cinnabar has no changeset for a commit we need one for.
    #[error("no mercurial changeset known for {0}")]
    UnmappedCommit(CommitId),

    /// A `git cinnabar` invocation failed.
    #[error("git cinnabar {command} failed ({status}): {stderr}")]
    Cinnabar {
        command: String,
        status: ExitStatus,
        stderr: String,
    },

    /// git-cinnabar printed something that is not a changeset id.
    #[error("unexpected git cinnabar output: {0:?}")]
    BadOutput(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Check if the bundle itself was at fault.
    pub fn is_format_error(&self) -> bool {
        matches!(self, BridgeError::Format(_))
    }
}
