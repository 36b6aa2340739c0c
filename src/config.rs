//! Configuration: `.arcconfig`, `~/.arcrc`, and command line options.
//!
//! phlay reads the same files as `arc`, so a checkout already set up for
//! Phabricator needs no extra setup.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_BUGZILLA_URL: &str = "https://bugzilla.mozilla.org";

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("no API token for {host} in ~/.arcrc; run `arc install-certificate` first")]
    MissingToken { host: String },

    #[error("cannot locate ~/.arcrc: HOME is not set")]
    NoHome,
}

/// The repository's `.arcconfig`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArcConfig {
    #[serde(rename = "phabricator.uri")]
    pub phabricator_uri: String,
    #[serde(rename = "repository.callsign")]
    pub callsign: String,
}

impl ArcConfig {
    pub fn load(workdir: &Path) -> ConfigResult<Self> {
        read_json(&workdir.join(".arcconfig"))
    }
}

/// The user's `~/.arcrc`. Only host tokens are read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArcRc {
    #[serde(default)]
    hosts: HashMap<String, ArcHost>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ArcHost {
    #[serde(default)]
    token: Option<String>,
}

impl ArcRc {
    /// Load `path`; a missing file is an empty config.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            debug!("{} does not exist", path.display());
            return Ok(Self::default());
        }
        read_json(path)
    }

    /// The token stored for an API endpoint.
    pub fn token(&self, api: &Url) -> Option<&str> {
        self.hosts
            .get(api.as_str())
            .and_then(|host| host.token.as_deref())
    }
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> ConfigResult<T> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse `url` as a base that relative paths can be joined onto.
fn parse_base(url: &str) -> ConfigResult<Url> {
    let mut text = url.to_string();
    if !text.ends_with('/') {
        text.push('/');
    }
    Url::parse(&text).map_err(|e| ConfigError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Everything needed to talk to Phabricator.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// web root, used for revision links
    pub phabricator: Url,
    /// `api/` endpoint, also the `~/.arcrc` host key
    pub api: Url,
    pub callsign: String,
    pub token: String,
}

/// phlay configuration.
#[derive(Debug, Clone)]
pub struct PhlayConfig {
    /// Working tree holding `.arcconfig`.
    pub workdir: PathBuf,
    /// Skip the confirmation prompt.
    pub assume_yes: bool,
    /// Bugzilla instance bug numbers are looked up on.
    pub bugzilla_url: String,
    /// Override for `~/.arcrc`.
    pub arcrc_path: Option<PathBuf>,
}

impl PhlayConfig {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            assume_yes: false,
            bugzilla_url: DEFAULT_BUGZILLA_URL.to_string(),
            arcrc_path: None,
        }
    }

    /// Set assume_yes flag.
    pub fn assume_yes(mut self, value: bool) -> Self {
        self.assume_yes = value;
        self
    }

    pub fn bugzilla_url(mut self, url: impl Into<String>) -> Self {
        self.bugzilla_url = url.into();
        self
    }

    pub fn arcrc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.arcrc_path = Some(path.into());
        self
    }

    /// Bugzilla base URL.
    pub fn bugzilla(&self) -> ConfigResult<Url> {
        parse_base(&self.bugzilla_url)
    }

    /// Read `.arcconfig` and the matching `~/.arcrc` token.
    pub fn remote(&self) -> ConfigResult<RemoteConfig> {
        let arcconfig = ArcConfig::load(&self.workdir)?;
        let phabricator = parse_base(&arcconfig.phabricator_uri)?;
        let api = phabricator.join("api/").map_err(|e| ConfigError::InvalidUrl {
            url: arcconfig.phabricator_uri.clone(),
            reason: e.to_string(),
        })?;

        let arcrc = ArcRc::load(&self.arcrc_location()?)?;
        let token = arcrc
            .token(&api)
            .ok_or_else(|| ConfigError::MissingToken {
                host: api.to_string(),
            })?
            .to_string();

        Ok(RemoteConfig {
            phabricator,
            api,
            callsign: arcconfig.callsign,
            token,
        })
    }

    fn arcrc_location(&self) -> ConfigResult<PathBuf> {
        match &self.arcrc_path {
            Some(path) => Ok(path.clone()),
            None => std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".arcrc"))
                .ok_or(ConfigError::NoHome),
        }
    }
}
