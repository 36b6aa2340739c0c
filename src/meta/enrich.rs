//! Per-commit enrichment: what the commit message refers to, and its diff.

use tracing::{debug, debug_span};

use crate::bridge::IdMapping;
use crate::bugzilla::{Bug, BugTracker};
use crate::conduit::{ReviewService, Reviewer, Revision};
use crate::diff::{DiffBuilder, SourceControl};
use crate::meta::cache::LookupCache;
use crate::meta::error::{MetaError, MetaResult};
use crate::meta::parse;
use crate::meta::record::{MetaRecord, Plan};
use crate::vcs::{CommitInfo, GitRepository, RemoteVcs};

/// Builds [`MetaRecord`]s, resolving bugs, revisions and reviewers through
/// a shared [`LookupCache`].
pub struct Enricher<'a, R, B> {
    repo: &'a GitRepository,
    review: &'a R,
    bugs: &'a B,
    repository_phid: String,
    /// set for Mercurial-backed repositories
    mapping: Option<&'a IdMapping>,
    cache: LookupCache,
}

impl<'a, R: ReviewService, B: BugTracker> Enricher<'a, R, B> {
    pub fn new(repo: &'a GitRepository, review: &'a R, bugs: &'a B, repository_phid: impl Into<String>) -> Self {
        Self {
            repo,
            review,
            bugs,
            repository_phid: repository_phid.into(),
            mapping: None,
            cache: LookupCache::new(),
        }
    }

    /// Identify commits by their Mercurial changesets.
    pub fn with_mapping(mut self, mapping: &'a IdMapping) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    fn system(&self) -> RemoteVcs {
        if self.mapping.is_some() {
            RemoteVcs::Hg
        } else {
            RemoteVcs::Git
        }
    }

    /// Enrich a push, oldest commit first. Each record's predecessor is the
    /// record before it.
    pub fn enrich_all(&mut self, commits: &[CommitInfo]) -> MetaResult<Vec<MetaRecord>> {
        commits
            .iter()
            .enumerate()
            .map(|(idx, commit)| self.enrich(commit, idx.checked_sub(1)))
            .collect()
    }

    pub fn enrich(&mut self, commit: &CommitInfo, predecessor: Option<usize>) -> MetaResult<MetaRecord> {
        let _span = debug_span!("enrich", commit = %commit.id.short()).entered();

        let (remote_id, base_id) = self.remote_ids(commit)?;
        let first_line = commit.summary();

        let bug = match parse::bug_number(first_line) {
            Some(id) => Some(self.bug(id)?),
            None => None,
        };

        let revision = match parse::revision_id(&commit.message) {
            Some(id) => Some(self.revision(id)?),
            None => None,
        };

        let (old_summary, old_depend) = match &revision {
            Some(revision) => {
                let (summary, depend) = parse::old_summary(&revision.fields.summary);
                (Some(summary), depend)
            }
            None => (None, None),
        };

        let mut reviewers: Vec<Reviewer> = Vec::new();
        for name in parse::reviewer_names(first_line) {
            let reviewer = self.reviewer(name)?;
            if !reviewers.iter().any(|r| r.phid == reviewer.phid) {
                reviewers.push(reviewer);
            }
        }

        let source = SourceControl {
            system: self.system(),
            base_revision: base_id.clone(),
            repository_phid: self.repository_phid.clone(),
        };
        let built = DiffBuilder::new(self.repo).build(commit, &source)?;

        debug!(
            "bug={:?} revision={:?} reviewers={}",
            bug.as_ref().map(|b| b.id),
            revision.as_ref().map(|r| r.id),
            reviewers.len()
        );

        Ok(MetaRecord {
            commit: commit.clone(),
            predecessor,
            remote_id,
            base_id,
            bug,
            revision,
            reviewers,
            new_title: parse::title(first_line),
            new_summary: parse::new_summary(&commit.message),
            old_summary,
            old_depend,
            diff: built.spec,
            uploads: built.uploads,
            plan: Plan::default(),
        })
    }

    /// Ids of the commit and its parent as the review repository knows them.
    fn remote_ids(&self, commit: &CommitInfo) -> MetaResult<(String, String)> {
        let parent = commit.parent()?;
        match self.mapping {
            Some(mapping) => {
                let own = mapping.get(&commit.id).ok_or(MetaError::UnmappedCommit(commit.id))?;
                let base = mapping.get(&parent).ok_or(MetaError::UnmappedCommit(parent))?;
                Ok((own.to_string(), base.to_string()))
            }
            None => Ok((commit.id.to_string(), parent.to_string())),
        }
    }

    fn bug(&mut self, id: u64) -> MetaResult<Bug> {
        let bugs = self.bugs;
        Ok(self.cache.bug(id, |id| bugs.get_bug(id))?.clone())
    }

    fn revision(&mut self, id: u64) -> MetaResult<Revision> {
        let review = self.review;
        let revision = self.cache.revision(id, |id| {
            review
                .search_revisions(&[id])?
                .into_iter()
                .next()
                .ok_or(MetaError::NoSuchRevision(id))
        })?;
        Ok(revision.clone())
    }

    /// Users first, then projects.
    fn reviewer(&mut self, name: &str) -> MetaResult<Reviewer> {
        let review = self.review;
        let reviewer = self.cache.reviewer(name, |name| {
            if let Some(user) = review.search_users(&[name])?.into_iter().next() {
                return Ok(user);
            }
            if let Some(project) = review.search_projects(&[name])?.into_iter().next() {
                return Ok(project);
            }
            Err(MetaError::UnknownReviewer(name.to_string()))
        })?;
        Ok(reviewer.clone())
    }
}
