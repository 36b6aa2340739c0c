//! core type-safe wrappers around git primitives.

use std::fmt;
use std::fmt::Formatter;

use chrono::{DateTime, FixedOffset, TimeZone};
use git2::Oid;

use crate::vcs::error::{VcsError, VcsResult};

/// This makes sure we don't accidentally pass a blob ID where a commit ID
/// is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitId(pub(crate) Oid);

impl CommitId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    /// raw Oid (for internal use only)
    pub(crate) fn raw(&self) -> Oid {
        self.0
    }

    /// parse CommitId from a hex string
    pub fn from_hex(hex: &str) -> Result<Self, git2::Error> {
        Oid::from_str(hex).map(CommitId)
    }

    /// short form of the commit ID, as shown next to commit summaries
    pub fn short(&self) -> String {
        self.0.to_string()[..12].to_string()
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Git blob identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobId(pub(crate) Oid);

impl BlobId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    pub(crate) fn raw(&self) -> Oid {
        self.0
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Git tree identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TreeId(pub(crate) Oid);

impl TreeId {
    pub(crate) fn new(oid: Oid) -> Self {
        Self(oid)
    }

    pub(crate) fn raw(&self) -> Oid {
        self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The version control system the review server sees for this repository.
///
/// A git-cinnabar clone talks to a Mercurial-backed Phabricator repository,
/// so every commit id sent to the server has to be translated first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteVcs {
    Git,
    Hg,
}

impl RemoteVcs {
    /// the `sourceControlSystem` value understood by Differential
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteVcs::Git => "git",
            RemoteVcs::Hg => "hg",
        }
    }
}

impl fmt::Display for RemoteVcs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// author or committer of a commit, with the original timezone preserved
///
/// `name` and `email` are for display. The bytes recorded in the commit are
/// kept alongside so a recreated commit carries exactly the same signature,
/// whatever encoding its author used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
    pub when: DateTime<FixedOffset>,
    name_bytes: Vec<u8>,
    email_bytes: Vec<u8>,
}

impl Identity {
    /// create a new identity
    pub fn new(name: impl Into<String>, email: impl Into<String>, when: DateTime<FixedOffset>) -> Self {
        let name = name.into();
        let email = email.into();
        Self {
            name_bytes: name.as_bytes().to_vec(),
            email_bytes: email.as_bytes().to_vec(),
            name,
            email,
            when,
        }
    }

    /// Read a signature without losing anything needed to write it back.
    ///
    /// Fails if the recorded time has no `chrono` representation.
    pub(crate) fn from_git2(sig: &git2::Signature<'_>) -> VcsResult<Self> {
        let time = sig.when();
        let invalid = || VcsError::InvalidTimestamp {
            seconds: time.seconds(),
            offset_minutes: time.offset_minutes(),
        };
        let offset = FixedOffset::east_opt(time.offset_minutes() * 60).ok_or_else(invalid)?;
        let when = offset
            .timestamp_opt(time.seconds(), 0)
            .single()
            .ok_or_else(invalid)?;

        Ok(Self {
            name: String::from_utf8_lossy(sig.name_bytes()).into_owned(),
            email: String::from_utf8_lossy(sig.email_bytes()).into_owned(),
            when,
            name_bytes: sig.name_bytes().to_vec(),
            email_bytes: sig.email_bytes().to_vec(),
        })
    }

    /// name exactly as recorded in the commit
    pub fn name_bytes(&self) -> &[u8] {
        &self.name_bytes
    }

    /// email exactly as recorded in the commit
    pub fn email_bytes(&self) -> &[u8] {
        &self.email_bytes
    }

    /// The value of an `author`/`committer` commit header:
    /// `<name> <<email>> <unix seconds> <+hhmm>`.
    pub(crate) fn header_value(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.name_bytes.len() + self.email_bytes.len() + 24);
        out.extend_from_slice(&self.name_bytes);
        out.extend_from_slice(b" <");
        out.extend_from_slice(&self.email_bytes);
        out.extend_from_slice(b"> ");
        out.extend_from_slice(self.epoch_with_offset().as_bytes());
        out
    }

    /// `<unix seconds> <+hhmm>`, the format Differential's `local:commits`
    /// property expects
    pub fn epoch_with_offset(&self) -> String {
        self.when.format("%s %z").to_string()
    }
}
