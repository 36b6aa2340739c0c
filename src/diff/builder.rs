//! Turns one commit into a Differential diff.
//!
//! The diff is computed against the commit's only parent with the whole
//! file as context, so the server can render any part of a changed file.
//! Binary files carry no hunks; their contents are queued for upload instead.

use git2::{Delta, DiffLineType, DiffOptions, Patch, Repository};
use tracing::{debug, trace};

use crate::diff::error::{DiffError, DiffResult};
use crate::diff::types::{
    ChangeKind, ChangeRecord, DiffSpec, FileKind, Hunk, Side, SourceControl, UploadTask,
};
use crate::vcs::{BlobId, CommitInfo, GitRepository};

/// Large enough that every unchanged line lands in the hunk.
const FULL_CONTEXT: u32 = 32767;

const FILEMODE_PROPERTY: &str = "unix:filemode";

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// A commit's diff, plus the binaries it references.
#[derive(Debug, Clone)]
pub struct BuiltDiff {
    pub spec: DiffSpec,
    pub uploads: Vec<UploadTask>,
}

/// Builds [`BuiltDiff`]s from commits of one repository.
pub struct DiffBuilder<'repo> {
    repo: &'repo Repository,
}

impl<'repo> DiffBuilder<'repo> {
    pub fn new(repo: &'repo GitRepository) -> Self {
        Self { repo: repo.inner() }
    }

    /// Build the diff of `commit` against its parent.
    pub fn build(&self, commit: &CommitInfo, source: &SourceControl) -> DiffResult<BuiltDiff> {
        let (changes, uploads) = self.changes(commit)?;
        debug!(
            "{}: {} change(s), {} upload(s)",
            commit.id.short(),
            changes.len(),
            uploads.len()
        );
        Ok(BuiltDiff {
            spec: DiffSpec::new(changes, source),
            uploads,
        })
    }

    /// Per-file changes of `commit` and the uploads they need.
    pub fn changes(&self, commit: &CommitInfo) -> DiffResult<(Vec<ChangeRecord>, Vec<UploadTask>)> {
        let parent = self.repo.find_commit(commit.parent()?.raw())?;
        let old_tree = parent.tree()?;
        let new_tree = self.repo.find_tree(commit.tree_id.raw())?;

        let mut opts = DiffOptions::new();
        opts.context_lines(FULL_CONTEXT);
        let diff = self
            .repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut opts))?;

        let mut changes = Vec::new();
        let mut uploads = Vec::new();

        for idx in 0..diff.deltas().len() {
            // generating the patch is what runs binary detection
            let patch = Patch::from_diff(&diff, idx)?;
            let delta = match &patch {
                Some(patch) => patch.delta(),
                None => diff.get_delta(idx).ok_or(DiffError::MissingDelta(idx))?,
            };

            let old_path = path_string(delta.old_file().path());
            let current_path = path_string(delta.new_file().path());
            let kind = change_kind(delta.status(), &current_path)?;
            let file_type = if delta.flags().is_binary() {
                FileKind::Binary
            } else {
                FileKind::Text
            };
            trace!("{current_path}: {kind:?} {file_type:?}");

            let mut change = ChangeRecord::new(kind, file_type, old_path, current_path);
            if kind != ChangeKind::Added {
                change
                    .old_properties
                    .insert(FILEMODE_PROPERTY.to_string(), format!("{:o}", u32::from(delta.old_file().mode())));
            }
            if kind != ChangeKind::Deleted {
                change
                    .new_properties
                    .insert(FILEMODE_PROPERTY.to_string(), format!("{:o}", u32::from(delta.new_file().mode())));
            }

            match (file_type, &patch) {
                (FileKind::Text, Some(patch)) => {
                    for hunk_idx in 0..patch.num_hunks() {
                        let (hunk, line_count) = patch.hunk(hunk_idx)?;
                        let mut corpus = String::new();
                        for line_idx in 0..line_count {
                            let line = patch.line_in_hunk(hunk_idx, line_idx)?;
                            push_line(&mut corpus, &mut change, line.origin_value(), line.content())?;
                        }
                        change.hunks.push(Hunk {
                            old_offset: hunk.old_start(),
                            old_length: hunk.old_lines(),
                            new_offset: hunk.new_start(),
                            new_length: hunk.new_lines(),
                            corpus,
                        });
                    }
                }
                (FileKind::Text, None) => {}
                (FileKind::Binary, _) => {
                    let index = changes.len();
                    if kind != ChangeKind::Added {
                        uploads.push(UploadTask {
                            side: Side::Old,
                            blob: BlobId::new(delta.old_file().id()),
                            change: index,
                        });
                    }
                    if kind != ChangeKind::Deleted {
                        uploads.push(UploadTask {
                            side: Side::New,
                            blob: BlobId::new(delta.new_file().id()),
                            change: index,
                        });
                    }
                }
            }

            changes.push(change);
        }

        Ok((changes, uploads))
    }
}

fn path_string(path: Option<&std::path::Path>) -> String {
    path.map(|p| p.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Map a delta status onto Differential's change types.
///
/// A tree-to-tree diff without rename detection only produces these three.
pub(crate) fn change_kind(status: Delta, path: &str) -> DiffResult<ChangeKind> {
    match status {
        Delta::Added => Ok(ChangeKind::Added),
        Delta::Modified => Ok(ChangeKind::Modified),
        Delta::Deleted => Ok(ChangeKind::Deleted),
        other => Err(DiffError::UnhandledDeltaStatus {
            status: other,
            path: path.to_string(),
        }),
    }
}

/// Append one hunk line to `corpus`, updating the counters and newline
/// flags on `change`.
pub(crate) fn push_line(
    corpus: &mut String,
    change: &mut ChangeRecord,
    origin: DiffLineType,
    content: &[u8],
) -> DiffResult<()> {
    let prefix = match origin {
        DiffLineType::Context => ' ',
        DiffLineType::Addition => {
            change.add_lines += 1;
            '+'
        }
        DiffLineType::Deletion => {
            change.del_lines += 1;
            '-'
        }
        DiffLineType::AddEOFNL => {
            change.is_missing_old_newline = true;
            push_no_newline_marker(corpus);
            return Ok(());
        }
        DiffLineType::DeleteEOFNL => {
            change.is_missing_new_newline = true;
            push_no_newline_marker(corpus);
            return Ok(());
        }
        DiffLineType::ContextEOFNL => {
            change.is_missing_old_newline = true;
            change.is_missing_new_newline = true;
            push_no_newline_marker(corpus);
            return Ok(());
        }
        other => return Err(DiffError::UnhandledLineOrigin(other)),
    };

    corpus.push(prefix);
    corpus.push_str(&String::from_utf8_lossy(content));
    Ok(())
}

fn push_no_newline_marker(corpus: &mut String) {
    // the line the marker refers to has no terminator of its own
    if !corpus.is_empty() && !corpus.ends_with('\n') {
        corpus.push('\n');
    }
    corpus.push_str(NO_NEWLINE_MARKER);
    corpus.push('\n');
}
