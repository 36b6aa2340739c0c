//! Top-level error type.
//!
//! Every failure aborts the run. Module errors convert into [`PhlayError`]
//! so the driver can use `?` throughout.

use thiserror::Error;

use crate::bridge::BridgeError;
use crate::bugzilla::BugzillaError;
use crate::conduit::ConduitError;
use crate::config::ConfigError;
use crate::diff::DiffError;
use crate::meta::MetaError;
use crate::submit::SubmitError;
use crate::vcs::VcsError;

/// Result type for a phlay run.
pub type PhlayResult<T> = Result<T, PhlayError>;

/// phlay errors.
#[derive(Debug, Error)]
pub enum PhlayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Vcs(#[from] VcsError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Conduit(#[from] ConduitError),

    #[error(transparent)]
    Bugzilla(#[from] BugzillaError),

    #[error(transparent)]
    Meta(#[from] MetaError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error("user aborted")]
    Aborted,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PhlayError {
    /// Check if a bug, revision or reviewer named in a commit message could
    /// not be found.
    pub fn is_lookup(&self) -> bool {
        match self {
            PhlayError::Meta(e) => e.is_lookup(),
            PhlayError::Bugzilla(e) => e.is_lookup(),
            _ => false,
        }
    }

    /// Check if Phabricator rejected a call.
    pub fn is_remote(&self) -> bool {
        match self {
            PhlayError::Conduit(e) => e.is_remote(),
            PhlayError::Meta(MetaError::Conduit(e)) => e.is_remote(),
            PhlayError::Submit(SubmitError::Conduit(e)) => e.is_remote(),
            _ => false,
        }
    }

    /// Check if the selected history cannot be submitted (merges, a commit
    /// without parent, a malformed bundle).
    pub fn is_unsupported_history(&self) -> bool {
        match self {
            PhlayError::Vcs(e) => e.is_unsupported_history(),
            PhlayError::Bridge(BridgeError::Vcs(e)) => e.is_unsupported_history(),
            PhlayError::Bridge(e) => e.is_format_error(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let err = PhlayError::from(MetaError::UnknownReviewer("x".into()));
        assert!(err.is_lookup());
        assert!(!err.is_remote());

        let err = PhlayError::from(ConduitError::Remote {
            code: "ERR-CONDUIT-CORE".into(),
            info: "bad".into(),
        });
        assert!(err.is_remote());
        assert_eq!(err.to_string(), "ERR-CONDUIT-CORE: bad");

        let err = PhlayError::from(VcsError::EmptyRange);
        assert!(!err.is_unsupported_history());
        assert_eq!(err.to_string(), "no commits in range");

        assert_eq!(PhlayError::Aborted.to_string(), "user aborted");
    }
}
