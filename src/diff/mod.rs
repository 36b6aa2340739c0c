//! Differential diffs built from git commits.

mod builder;
mod error;
mod types;

pub use builder::{BuiltDiff, DiffBuilder};
pub use error::{DiffError, DiffResult};
pub use types::{ChangeKind, ChangeRecord, DiffSpec, FileKind, Hunk, Side, SourceControl, UploadTask};
