//! Bug lookups against Bugzilla's REST API.

use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Result type for bug lookups.
pub type BugzillaResult<T> = Result<T, BugzillaError>;

/// Bug lookup errors.
#[derive(Debug, Error)]
pub enum BugzillaError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid bugzilla url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Bugzilla answered with `error: true`.
    #[error("{0}")]
    Lookup(String),

    #[error("bug {0} not found")]
    NotFound(u64),
}

impl BugzillaError {
    /// Check if Bugzilla itself refused the lookup.
    pub fn is_lookup(&self) -> bool {
        matches!(self, BugzillaError::Lookup(_) | BugzillaError::NotFound(_))
    }
}

/// The parts of a bug phlay shows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Bug {
    pub id: u64,
    pub status: String,
    pub summary: String,
}

/// Something that can look bugs up by number.
pub trait BugTracker {
    fn get_bug(&self, id: u64) -> BugzillaResult<Bug>;
}

#[derive(Deserialize)]
struct BugResponse {
    #[serde(default)]
    bugs: Vec<Bug>,
    #[serde(default)]
    error: bool,
    #[serde(default)]
    message: Option<String>,
}

impl BugResponse {
    fn into_bug(self, id: u64) -> BugzillaResult<Bug> {
        if self.error {
            return Err(BugzillaError::Lookup(
                self.message.unwrap_or_else(|| format!("error fetching bug {id}")),
            ));
        }
        self.bugs.into_iter().next().ok_or(BugzillaError::NotFound(id))
    }
}

/// Blocking client for a Bugzilla instance.
pub struct BugzillaClient {
    http: Client,
    base: Url,
}

impl BugzillaClient {
    pub fn new(base: Url) -> BugzillaResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("phlay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, base })
    }
}

impl BugTracker for BugzillaClient {
    fn get_bug(&self, id: u64) -> BugzillaResult<Bug> {
        let url = self
            .base
            .join(&format!("rest/bug/{id}"))
            .map_err(|e| BugzillaError::InvalidUrl {
                url: self.base.to_string(),
                reason: e.to_string(),
            })?;
        debug!("GET {url}");

        // error responses carry a non-2xx status and the same JSON body
        let response: BugResponse = self
            .http
            .get(url)
            .query(&[("include_fields", "id,summary,status")])
            .send()?
            .json()?;
        response.into_bug(id)
    }
}
