//! The review service interface.

use crate::conduit::error::ConduitResult;
use crate::conduit::models::{DiffHandle, RepositoryInfo, Reviewer, Revision, RevisionHandle, Transaction};
use crate::diff::DiffSpec;

/// The Conduit methods phlay calls.
///
/// [`ConduitClient`](crate::conduit::ConduitClient) speaks to a live
/// server; tests substitute in-memory fakes.
pub trait ReviewService {
    /// `diffusion.repository.search` by callsign.
    fn search_repository(&self, callsign: &str) -> ConduitResult<Vec<RepositoryInfo>>;

    /// `differential.revision.search` by id, with reviewers attached.
    fn search_revisions(&self, ids: &[u64]) -> ConduitResult<Vec<Revision>>;

    /// `user.search` by username.
    fn search_users(&self, usernames: &[&str]) -> ConduitResult<Vec<Reviewer>>;

    /// `project.search` by slug.
    fn search_projects(&self, slugs: &[&str]) -> ConduitResult<Vec<Reviewer>>;

    /// `differential.creatediff`
    fn create_diff(&self, diff: &DiffSpec) -> ConduitResult<DiffHandle>;

    /// `differential.setdiffproperty`; `data` is a JSON document.
    fn set_diff_property(&self, diff_id: u64, name: &str, data: &str) -> ConduitResult<()>;

    /// `file.upload`, returning the file PHID.
    fn upload_file(&self, content: &[u8]) -> ConduitResult<String>;

    /// `differential.revision.edit`. Creates a revision when `object` is
    /// `None`.
    fn edit_revision(&self, object: Option<&str>, transactions: &[Transaction]) -> ConduitResult<RevisionHandle>;
}
