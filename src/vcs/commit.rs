//!  Commit reading, range walking, and history rewriting
//!
//! phlay only ever deals with linear history:
//! - a push is a first-parent chain of commits between a base and a tip
//! - after the push every commit in that chain is recreated with a
//!   `Differential Revision:` trailer, and commits above it are reparented
//!
//! this module handles commit lookup, the range walk, and commit creation

use git2::Repository;

use crate::vcs::error::{VcsError, VcsResult};
use crate::vcs::types::{CommitId, Identity, TreeId};

/// information about a commit
///
/// `message` is decoded for parsing and display. `message_bytes` and
/// `message_encoding` are what the commit actually records.
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub id: CommitId,
    pub tree_id: TreeId,
    pub parent_ids: Vec<CommitId>,
    pub message: String,
    pub message_bytes: Vec<u8>,
    pub message_encoding: Option<String>,
    pub author: Identity,
    pub committer: Identity,
}

impl CommitInfo {
    /// create CommitInfo from a git2::Commit
    pub(crate) fn from_git2(commit: &git2::Commit<'_>) -> VcsResult<Self> {
        Ok(Self {
            id: CommitId::new(commit.id()),
            tree_id: TreeId::new(commit.tree_id()),
            parent_ids: commit.parent_ids().map(CommitId::new).collect(),
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
            message_bytes: commit.message_bytes().to_vec(),
            message_encoding: commit.message_encoding().map(str::to_string),
            author: Identity::from_git2(&commit.author())?,
            committer: Identity::from_git2(&commit.committer())?,
        })
    }

    /// check if this is a merge commit (has multiple parents)
    pub fn is_merge(&self) -> bool {
        self.parent_ids.len() > 1
    }

    /// get the first (or only) parent
    pub fn first_parent(&self) -> Option<CommitId> {
        self.parent_ids.first().copied()
    }

    /// the unique parent of a commit in a linear range
    pub fn parent(&self) -> VcsResult<CommitId> {
        match self.parent_ids.as_slice() {
            [parent] => Ok(*parent),
            [] => Err(VcsError::RootCommit(self.id)),
            _ => Err(VcsError::MergeCommitUnsupported(self.id)),
        }
    }

    /// get a short summary of the commit (first line of message)
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }
}

/// builder for recreating commits with a fluent interface
///
/// The commit object is serialized here and written straight to the object
/// database, so signatures and messages that are not UTF-8 survive intact.
pub struct CommitBuilder<'a> {
    repo: &'a Repository,
    tree_id: Option<TreeId>,
    parents: Vec<CommitId>,
    message: Vec<u8>,
    encoding: Option<String>,
    author: Option<Identity>,
    committer: Option<Identity>,
}

impl<'a> CommitBuilder<'a> {
    /// create a new CommitBuilder
    pub fn new(repo: &'a Repository) -> Self {
        Self {
            repo,
            tree_id: None,
            parents: Vec::new(),
            message: Vec::new(),
            encoding: None,
            author: None,
            committer: None,
        }
    }

    /// start from an existing commit, keeping its tree, message and signatures
    pub fn from_commit(repo: &'a Repository, commit: &CommitInfo) -> Self {
        Self::new(repo)
            .tree(commit.tree_id)
            .raw_message(commit.message_bytes.clone(), commit.message_encoding.clone())
            .author(commit.author.clone())
            .committer(commit.committer.clone())
    }

    /// set the tree for this commit
    pub fn tree(mut self, tree_id: TreeId) -> Self {
        self.tree_id = Some(tree_id);
        self
    }

    /// add a parent commit
    pub fn parent(mut self, parent: CommitId) -> Self {
        self.parents.push(parent);
        self
    }

    /// set a UTF-8 commit message, dropping any previous encoding
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into().into_bytes();
        self.encoding = None;
        self
    }

    /// set the message bytes together with the encoding they are in
    pub fn raw_message(mut self, message: Vec<u8>, encoding: Option<String>) -> Self {
        self.message = message;
        self.encoding = encoding;
        self
    }

    /// set the author signature
    pub fn author(mut self, author: Identity) -> Self {
        self.author = Some(author);
        self
    }

    /// set the committer signature
    pub fn committer(mut self, committer: Identity) -> Self {
        self.committer = Some(committer);
        self
    }

    /// create the commit and return its ID
    ///
    /// no ref is moved; callers update HEAD once the whole chain is written
    pub fn commit(self) -> VcsResult<CommitId> {
        let tree_id = self
            .tree_id
            .ok_or_else(|| VcsError::CommitNotFound("commit requires a tree".to_string()))?;
        self.repo.find_tree(tree_id.raw())?;
        for parent in &self.parents {
            self.repo.find_commit(parent.raw())?;
        }

        let author = match self.author {
            Some(author) => author,
            None => Identity::from_git2(&self.repo.signature()?)?,
        };
        let committer = self.committer.unwrap_or_else(|| author.clone());

        let mut buf = Vec::with_capacity(256 + self.message.len());
        push_header(&mut buf, "tree", tree_id.to_string().as_bytes());
        for parent in &self.parents {
            push_header(&mut buf, "parent", parent.to_string().as_bytes());
        }
        push_header(&mut buf, "author", &author.header_value());
        push_header(&mut buf, "committer", &committer.header_value());
        if let Some(encoding) = &self.encoding {
            push_header(&mut buf, "encoding", encoding.as_bytes());
        }
        buf.push(b'\n');
        buf.extend_from_slice(&self.message);

        let oid = self.repo.odb()?.write(git2::ObjectType::Commit, &buf)?;
        Ok(CommitId::new(oid))
    }
}

fn push_header(buf: &mut Vec<u8>, name: &str, value: &[u8]) {
    buf.extend_from_slice(name.as_bytes());
    buf.push(b' ');
    buf.extend_from_slice(value);
    buf.push(b'\n');
}

/// get information about a commit
pub fn get_commit(repo: &Repository, id: CommitId) -> VcsResult<CommitInfo> {
    let commit = repo
        .find_commit(id.raw())
        .map_err(|_| VcsError::CommitNotFound(id.to_string()))?;

    CommitInfo::from_git2(&commit)
}

/// Collect the commits from `start` back to the first commit satisfying
/// `stop`, following first parents.
///
/// The stopping commit itself is excluded and the result is oldest first.
/// Every collected commit must have exactly one parent.
///
/// The predicate may fail with any error a `VcsError` converts into, so
/// callers can consult other tools while walking.
pub fn commit_range<F, E>(repo: &Repository, start: CommitId, mut stop: F) -> Result<Vec<CommitInfo>, E>
where
    F: FnMut(&CommitInfo) -> Result<bool, E>,
    E: From<VcsError>,
{
    let mut commits = Vec::new();
    let mut current = get_commit(repo, start)?;

    while !stop(&current)? {
        let parent = current.parent()?;
        commits.push(current);
        current = get_commit(repo, parent)?;
    }

    commits.reverse();
    Ok(commits)
}
