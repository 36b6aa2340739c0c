//! Phabricator's Conduit API.
//!
//! [`ReviewService`] lists the methods phlay needs with typed arguments and
//! answers. [`ConduitClient`] implements it over HTTP.

mod client;
mod error;
mod http;
mod models;

use reqwest::Url;

pub use client::ReviewService;
pub use error::{ConduitError, ConduitResult};
pub use http::ConduitClient;
pub use models::{
    AttachedReviewer, DiffHandle, RepositoryFields, RepositoryInfo, Reviewer, ReviewerAttachment, ReviewerFields,
    Revision, RevisionAttachments, RevisionFields, RevisionHandle, RevisionObject, SearchResult, Transaction,
    TransactionKind, TransactionValue,
};

/// The repository registered under `callsign`.
pub fn find_repository(review: &impl ReviewService, callsign: &str) -> ConduitResult<RepositoryInfo> {
    review
        .search_repository(callsign)?
        .into_iter()
        .next()
        .ok_or_else(|| ConduitError::UnknownRepository(callsign.to_string()))
}

/// Web address of revision `D<id>` on the server at `phabricator`.
pub fn revision_url(phabricator: &Url, id: u64) -> String {
    match phabricator.join(&format!("/D{id}")) {
        Ok(url) => url.to_string(),
        Err(_) => format!("{}/D{id}", phabricator.as_str().trim_end_matches('/')),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeReview;

    #[test]
    fn test_find_repository() {
        let review = FakeReview::new();
        let repository = find_repository(&review, "TEST").unwrap();
        assert_eq!(repository.phid, "PHID-REPO-1");
        assert_eq!(repository.fields.name, "mozilla-central");
        assert_eq!(review.count("diffusion.repository.search"), 1);
    }

    #[test]
    fn test_find_unknown_repository() {
        let review = FakeReview::new();
        let err = find_repository(&review, "NOPE").unwrap_err();
        assert!(matches!(&err, ConduitError::UnknownRepository(callsign) if callsign == "NOPE"));
        assert!(!err.is_remote());
    }

    #[test]
    fn test_revision_url() {
        let base = Url::parse("https://phabricator.services.mozilla.com/").unwrap();
        assert_eq!(
            revision_url(&base, 1234),
            "https://phabricator.services.mozilla.com/D1234"
        );

        let api = Url::parse("https://phab.example.com/api/").unwrap();
        assert_eq!(revision_url(&api, 7), "https://phab.example.com/D7");
    }
}
