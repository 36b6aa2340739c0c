//! Wire types for `differential.creatediff`.
//!
//! Field names follow the Conduit parameter names, hence the camelCase
//! renames.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::vcs::{BlobId, RemoteVcs};

/// Differential's change type constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn code(&self) -> u8 {
        match self {
            ChangeKind::Added => 1,
            ChangeKind::Modified => 2,
            ChangeKind::Deleted => 3,
        }
    }
}

impl Serialize for ChangeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// Differential's file type constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Text,
    Binary,
}

impl FileKind {
    pub fn code(&self) -> u8 {
        match self {
            FileKind::Text => 1,
            FileKind::Binary => 3,
        }
    }
}

impl Serialize for FileKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

/// One contiguous block of a text diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunk {
    pub old_offset: u32,
    pub old_length: u32,
    pub new_offset: u32,
    pub new_length: u32,
    /// prefixed lines, concatenated
    pub corpus: String,
}

/// One file's change within a commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// filled in by binary uploads (`old:binary-phid`, `new:file-size`, ...)
    pub metadata: BTreeMap<String, Value>,
    pub old_properties: BTreeMap<String, String>,
    pub new_properties: BTreeMap<String, String>,
    pub old_path: String,
    pub current_path: String,
    pub add_lines: usize,
    pub del_lines: usize,
    pub is_missing_old_newline: bool,
    pub is_missing_new_newline: bool,
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub file_type: FileKind,
    pub hunks: Vec<Hunk>,
}

impl ChangeRecord {
    pub fn new(kind: ChangeKind, file_type: FileKind, old_path: String, current_path: String) -> Self {
        Self {
            metadata: BTreeMap::new(),
            old_properties: BTreeMap::new(),
            new_properties: BTreeMap::new(),
            old_path,
            current_path,
            add_lines: 0,
            del_lines: 0,
            is_missing_old_newline: false,
            is_missing_new_newline: false,
            kind,
            file_type,
            hunks: Vec::new(),
        }
    }
}

/// Which side of a change a binary upload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Old,
    New,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Old => "old",
            Side::New => "new",
        }
    }
}

/// A binary blob that must be uploaded before its diff is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub side: Side,
    pub blob: BlobId,
    /// index of the owning [`ChangeRecord`] in [`DiffSpec::changes`]
    pub change: usize,
}

impl UploadTask {
    /// Record the uploaded file on the owning change.
    pub fn complete(&self, changes: &mut [ChangeRecord], size: usize, phid: &str) {
        if let Some(change) = changes.get_mut(self.change) {
            let side = self.side.as_str();
            change
                .metadata
                .insert(format!("{side}:file-size"), Value::from(size));
            change
                .metadata
                .insert(format!("{side}:binary-phid"), Value::from(phid));
        }
    }
}

/// Where a diff comes from. Only the base revision and VCS vary per push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceControl {
    pub system: RemoteVcs,
    /// commit (or changeset) the diff applies to
    pub base_revision: String,
    pub repository_phid: String,
}

/// Full parameter set for `differential.creatediff`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSpec {
    pub changes: Vec<ChangeRecord>,
    pub source_control_system: &'static str,
    pub source_control_path: &'static str,
    pub source_control_base_revision: String,
    pub creation_method: &'static str,
    pub lint_status: &'static str,
    pub unit_status: &'static str,
    #[serde(rename = "repositoryPHID")]
    pub repository_phid: String,
    pub source_machine: &'static str,
    pub source_path: &'static str,
    pub branch: &'static str,
}

impl DiffSpec {
    pub fn new(changes: Vec<ChangeRecord>, source: &SourceControl) -> Self {
        Self {
            changes,
            source_control_system: source.system.as_str(),
            source_control_path: "/",
            source_control_base_revision: source.base_revision.clone(),
            creation_method: "phlay",
            lint_status: "none",
            unit_status: "none",
            repository_phid: source.repository_phid.clone(),
            // the server has no use for the local machine or checkout path
            source_machine: "localhost",
            source_path: "/",
            branch: "master",
        }
    }

    /// (files, added lines, deleted lines)
    pub fn stat(&self) -> (usize, usize, usize) {
        self.changes.iter().fold((0, 0, 0), |(files, add, del), c| {
            (files + 1, add + c.add_lines, del + c.del_lines)
        })
    }
}
