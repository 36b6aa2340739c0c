//! phlay - submit a stack of git commits to Phabricator
//!
//! Each commit in the selected range becomes one Differential revision.
//! Revisions already named in a commit message (`Differential Revision:`)
//! are updated, the rest are created, and consecutive revisions are linked
//! with `Depends on D<id>`. Afterwards every submitted commit is rewritten
//! to carry its revision link, and the commits above the range are rebased
//! onto the rewritten ones.
//!
//! Repositories cloned from Mercurial with git-cinnabar are supported: the
//! [`bridge`] module maps git commits to the changesets Phabricator knows.
//!
//! # Example
//!
//! ```no_run
//! use phlay::vcs::GitRepository;
//!
//! let repo = GitRepository::discover(".").unwrap();
//! let selection = repo.select("main..").unwrap();
//! println!("{} commit(s) to submit", selection.commits.len());
//! ```

pub mod bridge;
pub mod bugzilla;
pub mod conduit;
pub mod config;
pub mod diff;
pub mod error;
pub mod meta;
pub mod submit;
pub mod vcs;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{PhlayError, PhlayResult};
