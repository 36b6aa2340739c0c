//! local repository access for phlay
//!
//! this module is the only place (besides the diff builder) that talks to
//! git2. The upper layers use it to pick the commits to push, read blobs,
//! and rewrite history once revisions exist.
//!
//! # Usage
//!
//! ```ignore
//! use phlay::vcs::GitRepository;
//!
//! let repo = GitRepository::discover(".")?;
//! let selection = repo.select("main..")?;
//! for commit in &selection.commits {
//!     println!("{} {}", commit.id.short(), commit.summary());
//! }
//! ```

mod commit;
mod error;
mod refs;
mod repository;
mod types;

// Re-export public API
pub use commit::{commit_range, CommitBuilder, CommitInfo};
pub use error::{VcsError, VcsResult};
pub use refs::RefManager;
pub use repository::{GitRepository, Selection};
pub use types::{BlobId, CommitId, Identity, RemoteVcs, TreeId};
