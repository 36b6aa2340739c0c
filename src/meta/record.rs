//! Per-commit records and the plans and labels shown before submission.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::bugzilla::Bug;
use crate::conduit::{Reviewer, Revision, Transaction};
use crate::diff::{DiffSpec, UploadTask};
use crate::vcs::CommitInfo;

/// Author details Phabricator shows for a diff's commit
/// (`local:commits` diff property).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalCommit {
    pub author: String,
    #[serde(rename = "authorEmail")]
    pub author_email: String,
    /// `"<epoch seconds> <+hhmm>"`
    pub time: String,
}

/// A `tag: details` line of the report shown before submitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub tag: &'static str,
    pub details: String,
    /// extra indented lines, for multi-line summaries
    pub body: Vec<String>,
}

impl Label {
    pub fn new(tag: &'static str, details: impl Into<String>) -> Self {
        Self {
            tag,
            details: details.into(),
            body: Vec::new(),
        }
    }

    pub fn with_body(tag: &'static str, text: &str) -> Self {
        Self {
            tag,
            details: String::new(),
            body: text.lines().map(str::to_string).collect(),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {:<12} {}", self.tag, self.details)?;
        for line in &self.body {
            write!(f, "\n    {line}")?;
        }
        Ok(())
    }
}

/// What will be sent for one commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// applied in order by `differential.revision.edit`
    pub transactions: Vec<Transaction>,
    pub warnings: Vec<String>,
    pub labels: Vec<Label>,
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.labels {
            writeln!(f, "{label}")?;
        }
        for warning in &self.warnings {
            writeln!(f, "  warning: {warning}")?;
        }
        Ok(())
    }
}

/// Everything phlay knows about one commit of the push.
#[derive(Debug, Clone)]
pub struct MetaRecord {
    pub commit: CommitInfo,
    /// index of the previous commit's record in the push
    pub predecessor: Option<usize>,
    /// id of this commit in the review repository (git or hg)
    pub remote_id: String,
    /// id of the parent in the review repository
    pub base_id: String,
    pub bug: Option<Bug>,
    pub revision: Option<Revision>,
    pub reviewers: Vec<Reviewer>,
    pub new_title: String,
    pub new_summary: String,
    /// summary stored on `revision`, without dependency lines
    pub old_summary: Option<String>,
    /// revision `revision` currently depends on
    pub old_depend: Option<u64>,
    pub diff: DiffSpec,
    pub uploads: Vec<UploadTask>,
    pub plan: Plan,
}

impl MetaRecord {
    /// `local:commits` payload for this commit.
    pub fn local_commits(&self) -> BTreeMap<String, LocalCommit> {
        let author = &self.commit.author;
        let mut commits = BTreeMap::new();
        commits.insert(
            self.remote_id.clone(),
            LocalCommit {
                author: author.name.clone(),
                author_email: author.email.clone(),
                time: author.epoch_with_offset(),
            },
        );
        commits
    }

    pub fn revision_id(&self) -> Option<u64> {
        self.revision.as_ref().map(|r| r.id)
    }

    /// Message of the rewritten commit, pointing at `revision_url`.
    pub fn rewritten_message(&self, revision_url: &str) -> String {
        let body = format!("{}\n\n{}", self.commit.summary(), self.new_summary);
        format!("{}\n\nDifferential Revision: {revision_url}", body.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conduit::TransactionKind;

    #[test]
    fn test_label_display() {
        assert_eq!(Label::new("Bug", "Bug 1 [NEW] Crash").to_string(), "  Bug          Bug 1 [NEW] Crash");
        assert_eq!(
            Label::with_body("Summary", "one\ntwo").to_string(),
            "  Summary      \n    one\n    two"
        );
    }

    #[test]
    fn test_plan_display() {
        let plan = Plan {
            transactions: vec![Transaction::text(TransactionKind::Title, "t")],
            warnings: vec!["no reviewers specified".into()],
            labels: vec![Label::new("Title", "t")],
        };
        assert_eq!(plan.to_string(), "  Title        t\n  warning: no reviewers specified\n");
    }
}
