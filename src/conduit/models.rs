//! Conduit request and response shapes.
//!
//! Only the fields phlay reads are modelled; everything else in the
//! server's answers is ignored.

use serde::{Deserialize, Serialize};

/// `*.search` results.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// A Diffusion repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryInfo {
    pub phid: String,
    pub fields: RepositoryFields,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryFields {
    pub name: String,
}

/// A Differential revision, with its reviewers attached.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Revision {
    pub id: u64,
    pub phid: String,
    pub fields: RevisionFields,
    #[serde(default)]
    pub attachments: RevisionAttachments,
}

impl Revision {
    /// The bug number stored on the revision, if any.
    pub fn stored_bug(&self) -> Option<&str> {
        self.fields
            .bug_id
            .as_deref()
            .filter(|bug| !bug.is_empty())
    }

    /// Whether `phid` is already a reviewer of this revision.
    pub fn has_reviewer(&self, phid: &str) -> bool {
        self.attachments
            .reviewers
            .reviewers
            .iter()
            .any(|r| r.reviewer_phid == phid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RevisionFields {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(rename = "bugzilla.bug-id", default)]
    pub bug_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RevisionAttachments {
    #[serde(default)]
    pub reviewers: ReviewerAttachment,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReviewerAttachment {
    #[serde(default)]
    pub reviewers: Vec<AttachedReviewer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AttachedReviewer {
    #[serde(rename = "reviewerPHID")]
    pub reviewer_phid: String,
}

/// A user or project that can be asked for review.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Reviewer {
    pub phid: String,
    /// `USER` or `PROJ`
    #[serde(rename = "type")]
    pub kind: String,
    pub fields: ReviewerFields,
}

impl Reviewer {
    /// `Real Name [:username]` for users, the project name otherwise.
    pub fn display_name(&self) -> String {
        if self.kind == "USER" {
            format!(
                "{} [:{}]",
                self.fields.real_name.as_deref().unwrap_or_default(),
                self.fields.username.as_deref().unwrap_or_default()
            )
        } else {
            self.fields.name.clone().unwrap_or_default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReviewerFields {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(rename = "realName", default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Answer to `differential.creatediff`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiffHandle {
    pub diffid: u64,
    pub phid: String,
    #[serde(default)]
    pub uri: String,
}

/// Answer to `differential.revision.edit`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RevisionHandle {
    pub object: RevisionObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RevisionObject {
    pub id: u64,
    pub phid: String,
}

/// Revision fields phlay edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionKind {
    #[serde(rename = "repositoryPHID")]
    Repository,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "summary")]
    Summary,
    #[serde(rename = "bugzilla.bug-id")]
    BugId,
    #[serde(rename = "reviewers.add")]
    ReviewersAdd,
    /// attaches a diff to the revision
    #[serde(rename = "update")]
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TransactionValue {
    Text(String),
    List(Vec<String>),
}

/// One field edit. A revision's transactions apply in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub value: TransactionValue,
}

impl Transaction {
    pub fn text(kind: TransactionKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: TransactionValue::Text(value.into()),
        }
    }

    pub fn list(kind: TransactionKind, values: Vec<String>) -> Self {
        Self {
            kind,
            value: TransactionValue::List(values),
        }
    }
}
