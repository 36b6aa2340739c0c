//! Sending planned records to Phabricator and rewriting local history.
//!
//! Submission runs in four passes over the whole push: binary uploads,
//! diff creation, revision edits (each one rewriting its commit), and
//! finally reparenting the commits above the push. Nothing is rolled back
//! if a pass fails.

use reqwest::Url;
use thiserror::Error;
use tracing::{debug, info};

use crate::conduit::{revision_url, ConduitError, ReviewService, Transaction, TransactionKind};
use crate::meta::{inject_dependency, MetaRecord};
use crate::vcs::{BlobId, CommitId, CommitInfo, GitRepository, VcsError};

/// Result type for submission.
pub type SubmitResult<T> = Result<T, SubmitError>;

/// Submission errors.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("conduit error: {0}")]
    Conduit(#[from] ConduitError),

    #[error("vcs error: {0}")]
    Vcs(#[from] VcsError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("nothing to submit")]
    Empty,
}

/// Progress reported while submitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Uploaded { blob: BlobId, phid: String },
    DiffCreated { title: String, uri: String },
    RevisionEdited { created: bool, title: String, uri: String },
    HeadUpdated(CommitId),
}

/// What a finished submission produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// revision id of each record, in push order
    pub revisions: Vec<u64>,
    /// the commit HEAD now points at
    pub head: CommitId,
}

/// Drives submission of planned records.
pub struct Submitter<'a, R> {
    repo: &'a GitRepository,
    review: &'a R,
    phabricator: &'a Url,
}

impl<'a, R: ReviewService> Submitter<'a, R> {
    pub fn new(repo: &'a GitRepository, review: &'a R, phabricator: &'a Url) -> Self {
        Self {
            repo,
            review,
            phabricator,
        }
    }

    /// Submit `records`, then rebuild `trailing` on top of the rewritten
    /// commits and move HEAD's branch there.
    pub fn submit(
        &self,
        records: &mut [MetaRecord],
        trailing: &[CommitInfo],
        mut progress: impl FnMut(Progress),
    ) -> SubmitResult<Outcome> {
        let first = records.first().ok_or(SubmitError::Empty)?;
        let base = first.commit.parent()?;

        self.upload_binaries(records, &mut progress)?;
        self.create_diffs(records, &mut progress)?;
        let (revisions, tip) = self.edit_revisions(records, base, &mut progress)?;

        let head = self.repo.reparent(trailing, tip)?;
        self.repo.update_head(head)?;
        info!("HEAD moved to {head}");
        progress(Progress::HeadUpdated(head));

        Ok(Outcome { revisions, head })
    }

    /// Upload every binary and note the file on its change.
    pub fn upload_binaries(&self, records: &mut [MetaRecord], progress: &mut impl FnMut(Progress)) -> SubmitResult<()> {
        for record in records.iter_mut() {
            for upload in &record.uploads {
                let content = self.repo.blob_content(upload.blob)?;
                let phid = self.review.upload_file(&content)?;
                debug!("uploaded {} ({} bytes) as {phid}", upload.blob, content.len());
                upload.complete(&mut record.diff.changes, content.len(), &phid);
                progress(Progress::Uploaded {
                    blob: upload.blob,
                    phid,
                });
            }
        }
        Ok(())
    }

    /// Create a diff per record and queue the transaction attaching it.
    pub fn create_diffs(&self, records: &mut [MetaRecord], progress: &mut impl FnMut(Progress)) -> SubmitResult<()> {
        for record in records.iter_mut() {
            let diff = self.review.create_diff(&record.diff)?;
            let local_commits = serde_json::to_string(&record.local_commits())?;
            self.review
                .set_diff_property(diff.diffid, "local:commits", &local_commits)?;

            record
                .plan
                .transactions
                .push(Transaction::text(TransactionKind::Update, &diff.phid));
            progress(Progress::DiffCreated {
                title: record.new_title.clone(),
                uri: diff.uri,
            });
        }
        Ok(())
    }

    /// Create or update each revision, chaining each one onto the previous
    /// revision, and rewrite its commit onto the previous rewritten commit.
    ///
    /// Returns the revision ids and the last rewritten commit.
    pub fn edit_revisions(
        &self,
        records: &mut [MetaRecord],
        base: CommitId,
        progress: &mut impl FnMut(Progress),
    ) -> SubmitResult<(Vec<u64>, CommitId)> {
        let mut revisions: Vec<u64> = Vec::with_capacity(records.len());
        let mut parent = base;

        for record in records.iter_mut() {
            if let Some(prev) = revisions.last() {
                inject_dependency(&mut record.plan.transactions, *prev);
            }

            let object = record.revision.as_ref().map(|r| r.phid.as_str());
            let handle = self.review.edit_revision(object, &record.plan.transactions)?;
            let id = handle.object.id;
            let uri = revision_url(self.phabricator, id);
            progress(Progress::RevisionEdited {
                created: record.revision.is_none(),
                title: record.new_title.clone(),
                uri: uri.clone(),
            });

            parent = self
                .repo
                .rewrite(&record.commit, parent, &record.rewritten_message(&uri))?;
            debug!("{} rewritten as {parent}", record.commit.id.short());
            revisions.push(id);
        }

        Ok((revisions, parent))
    }
}
