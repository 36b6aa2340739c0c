//! Per-commit metadata: what each commit refers to and what will be sent
//! for it.
//!
//! Records are built oldest first by the [`Enricher`], which resolves bug
//! numbers, existing revisions and reviewers named in commit messages. The
//! [`Planner`] then decides which revision fields to send and what to warn
//! the user about.

mod cache;
mod enrich;
mod error;
pub mod parse;
mod plan;
mod record;

pub use cache::LookupCache;
pub use enrich::Enricher;
pub use error::{MetaError, MetaResult};
pub use plan::{inject_dependency, Planner};
pub use record::{Label, LocalCommit, MetaRecord, Plan};
