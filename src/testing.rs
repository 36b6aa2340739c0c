//! Shared test fixtures: a scratch repository and in-memory stand-ins for
//! Phabricator and Bugzilla that record every call.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};

use git2::Repository;
use serde_json::json;
use tempfile::TempDir;

use crate::bugzilla::{Bug, BugTracker, BugzillaError, BugzillaResult};
use crate::conduit::{
    ConduitResult, DiffHandle, RepositoryInfo, ReviewService, Reviewer, Revision, RevisionHandle, RevisionObject,
    Transaction,
};
use crate::diff::DiffSpec;
use crate::vcs::{CommitBuilder, CommitId, CommitInfo, GitRepository, Identity, TreeId};

/// A repository whose history is a single chain, starting from an empty
/// root commit.
pub(crate) struct TestRepo {
    _dir: TempDir,
    pub repo: GitRepository,
    files: BTreeMap<String, Vec<u8>>,
    pub commits: Vec<CommitId>,
}

impl TestRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let mut test = Self {
            _dir: dir,
            repo: GitRepository::from_repository(repo),
            files: BTreeMap::new(),
            commits: Vec::new(),
        };
        test.commit("root", &[]);
        test
    }

    pub fn identity() -> Identity {
        let sig = git2::Signature::new("Test", "test@test.com", &git2::Time::new(1_600_000_000, 60)).unwrap();
        Identity::from_git2(&sig).unwrap()
    }

    /// Commit on top of the last commit and point `refs/heads/main` (and
    /// HEAD) at it. `None` content deletes the file.
    pub fn commit(&mut self, message: &str, changes: &[(&str, Option<&[u8]>)]) -> CommitId {
        for (path, content) in changes {
            match content {
                Some(content) => self.files.insert(path.to_string(), content.to_vec()),
                None => self.files.remove(*path),
            };
        }

        let git = self.repo.inner();
        let mut builder = git.treebuilder(None).unwrap();
        for (path, content) in &self.files {
            let blob = git.blob(content).unwrap();
            builder.insert(path.as_str(), blob, 0o100644).unwrap();
        }
        let tree = TreeId::new(builder.write().unwrap());

        let mut commit = CommitBuilder::new(git)
            .tree(tree)
            .message(message)
            .author(Self::identity())
            .committer(Self::identity());
        if let Some(parent) = self.commits.last() {
            commit = commit.parent(*parent);
        }
        let id = commit.commit().unwrap();

        git.reference("refs/heads/main", id.raw(), true, "test").unwrap();
        git.set_head("refs/heads/main").unwrap();
        self.commits.push(id);
        id
    }

    pub fn info(&self, id: CommitId) -> CommitInfo {
        self.repo.get_commit(id).unwrap()
    }

    /// The commits after the root.
    pub fn pushed(&self) -> Vec<CommitInfo> {
        self.commits[1..].iter().map(|id| self.info(*id)).collect()
    }
}

pub(crate) fn user(name: &str, phid: &str) -> Reviewer {
    serde_json::from_value(json!({
        "phid": phid,
        "type": "USER",
        "fields": {"username": name, "realName": name.to_uppercase()}
    }))
    .unwrap()
}

pub(crate) fn project(slug: &str, phid: &str) -> Reviewer {
    serde_json::from_value(json!({
        "phid": phid,
        "type": "PROJ",
        "fields": {"name": slug}
    }))
    .unwrap()
}

pub(crate) fn revision(id: u64, title: &str, summary: &str, bug: Option<&str>, reviewers: &[&str]) -> Revision {
    let reviewers: Vec<_> = reviewers.iter().map(|phid| json!({"reviewerPHID": phid})).collect();
    serde_json::from_value(json!({
        "id": id,
        "phid": format!("PHID-DREV-{id}"),
        "fields": {"title": title, "summary": summary, "bugzilla.bug-id": bug},
        "attachments": {"reviewers": {"reviewers": reviewers}}
    }))
    .unwrap()
}

pub(crate) fn repository() -> RepositoryInfo {
    serde_json::from_value(json!({"phid": "PHID-REPO-1", "fields": {"name": "mozilla-central"}})).unwrap()
}

pub(crate) fn bug(id: u64) -> Bug {
    Bug {
        id,
        status: "NEW".into(),
        summary: format!("Bug number {id}"),
    }
}

/// In-memory Phabricator.
pub(crate) struct FakeReview {
    pub users: HashMap<String, Reviewer>,
    pub projects: HashMap<String, Reviewer>,
    pub revisions: HashMap<u64, Revision>,
    /// method names, one entry per call
    pub calls: RefCell<Vec<&'static str>>,
    pub diffs: RefCell<Vec<DiffSpec>>,
    pub properties: RefCell<Vec<(u64, String, String)>>,
    pub uploads: RefCell<Vec<Vec<u8>>>,
    pub edits: RefCell<Vec<(Option<String>, Vec<Transaction>)>>,
    next_id: Cell<u64>,
}

impl FakeReview {
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            projects: HashMap::new(),
            revisions: HashMap::new(),
            calls: RefCell::new(Vec::new()),
            diffs: RefCell::new(Vec::new()),
            properties: RefCell::new(Vec::new()),
            uploads: RefCell::new(Vec::new()),
            edits: RefCell::new(Vec::new()),
            next_id: Cell::new(100),
        }
    }

    pub fn with_user(mut self, name: &str) -> Self {
        self.users
            .insert(name.to_string(), user(name, &format!("PHID-USER-{name}")));
        self
    }

    pub fn with_project(mut self, slug: &str) -> Self {
        self.projects
            .insert(slug.to_string(), project(slug, &format!("PHID-PROJ-{slug}")));
        self
    }

    pub fn with_revision(mut self, revision: Revision) -> Self {
        self.revisions.insert(revision.id, revision);
        self
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.borrow().iter().filter(|m| **m == method).count()
    }

    fn record(&self, method: &'static str) {
        self.calls.borrow_mut().push(method);
    }
}

impl ReviewService for FakeReview {
    fn search_repository(&self, callsign: &str) -> ConduitResult<Vec<RepositoryInfo>> {
        self.record("diffusion.repository.search");
        Ok(if callsign == "TEST" { vec![repository()] } else { Vec::new() })
    }

    fn search_revisions(&self, ids: &[u64]) -> ConduitResult<Vec<Revision>> {
        self.record("differential.revision.search");
        Ok(ids.iter().filter_map(|id| self.revisions.get(id).cloned()).collect())
    }

    fn search_users(&self, usernames: &[&str]) -> ConduitResult<Vec<Reviewer>> {
        self.record("user.search");
        Ok(usernames.iter().filter_map(|n| self.users.get(*n).cloned()).collect())
    }

    fn search_projects(&self, slugs: &[&str]) -> ConduitResult<Vec<Reviewer>> {
        self.record("project.search");
        Ok(slugs.iter().filter_map(|s| self.projects.get(*s).cloned()).collect())
    }

    fn create_diff(&self, diff: &DiffSpec) -> ConduitResult<DiffHandle> {
        self.record("differential.creatediff");
        let mut diffs = self.diffs.borrow_mut();
        diffs.push(diff.clone());
        let id = diffs.len() as u64;
        Ok(DiffHandle {
            diffid: id,
            phid: format!("PHID-DIFF-{id}"),
            uri: format!("https://phab.test/differential/diff/{id}/"),
        })
    }

    fn set_diff_property(&self, diff_id: u64, name: &str, data: &str) -> ConduitResult<()> {
        self.record("differential.setdiffproperty");
        self.properties
            .borrow_mut()
            .push((diff_id, name.to_string(), data.to_string()));
        Ok(())
    }

    fn upload_file(&self, content: &[u8]) -> ConduitResult<String> {
        self.record("file.upload");
        let mut uploads = self.uploads.borrow_mut();
        uploads.push(content.to_vec());
        Ok(format!("PHID-FILE-{}", uploads.len()))
    }

    fn edit_revision(&self, object: Option<&str>, transactions: &[Transaction]) -> ConduitResult<RevisionHandle> {
        self.record("differential.revision.edit");
        self.edits
            .borrow_mut()
            .push((object.map(str::to_string), transactions.to_vec()));

        let existing = object.and_then(|phid| self.revisions.values().find(|r| r.phid == phid));
        let object = match existing {
            Some(revision) => RevisionObject {
                id: revision.id,
                phid: revision.phid.clone(),
            },
            None => {
                let id = self.next_id.get();
                self.next_id.set(id + 1);
                RevisionObject {
                    id,
                    phid: format!("PHID-DREV-{id}"),
                }
            }
        };
        Ok(RevisionHandle { object })
    }
}

/// In-memory Bugzilla.
pub(crate) struct FakeBugs {
    pub bugs: HashMap<u64, Bug>,
    pub calls: RefCell<Vec<u64>>,
}

impl FakeBugs {
    pub fn new(ids: &[u64]) -> Self {
        Self {
            bugs: ids.iter().map(|id| (*id, bug(*id))).collect(),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl BugTracker for FakeBugs {
    fn get_bug(&self, id: u64) -> BugzillaResult<Bug> {
        self.calls.borrow_mut().push(id);
        self.bugs.get(&id).cloned().ok_or(BugzillaError::NotFound(id))
    }
}
