//! Server configuration for refscope.
//!
//! One TOML file describes where repositories live and how the caches and the raw
//! content host behave. Every field has a default, so an empty file (or no file at all)
//! is a valid configuration.
//!
//! # Location
//!
//! In order of precedence:
//!
//! 1. `--config <PATH>` on the command line
//! 2. the `REFSCOPE_CONFIG` environment variable
//! 3. `<config dir>/refscope/config.toml`, where `<config dir>` is the platform
//!    configuration directory (`~/.config` on Linux)
//!
//! # File Format
//!
//! ```toml
//! base_path = "/srv/git"
//! host_name = "git.example.com"
//! servlet_path = "/b"
//! raw_file_host_name = "raw.example.com"
//! url_signer_key = "/etc/refscope/signer.key"
//! url_signer_max_age_secs = 5
//! public_repositories = ["platform/docs"]
//!
//! [visibility]
//! max_entries = 1024
//! ttl_secs = 1800
//! max_walk_commits = 1000000
//!
//! [blame]
//! max_weight = 10240
//!
//! [branch_redirects."platform/build"]
//! "refs/heads/master" = "refs/heads/main"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

use crate::blame::BlameCache;
use crate::constants::{
    BLAME_CACHE_MAX_WEIGHT, MAX_REACHABILITY_WALK, URL_SIGNER_MAX_AGE,
    VISIBILITY_CACHE_MAX_ENTRIES, VISIBILITY_CACHE_TTL,
};
use crate::core::RefscopeError;
use crate::git::LocalRepositories;
use crate::handler::RequestHandler;
use crate::resolver::{MapBranchRedirect, ViewResolver};
use crate::signer::{HmacUrlSigner, KeySource, RawUrls, SystemClock};
use crate::visibility::VisibilityCache;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "REFSCOPE_CONFIG";

/// `[visibility]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    pub max_entries: u64,
    pub ttl_secs: u64,
    pub max_walk_commits: usize,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            max_entries: VISIBILITY_CACHE_MAX_ENTRIES,
            ttl_secs: VISIBILITY_CACHE_TTL.as_secs(),
            max_walk_commits: MAX_REACHABILITY_WALK,
        }
    }
}

/// `[blame]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlameConfig {
    /// Total cache weight, in regions.
    pub max_weight: u64,
}

impl Default for BlameConfig {
    fn default() -> Self {
        Self {
            max_weight: BLAME_CACHE_MAX_WEIGHT,
        }
    }
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory holding the served repositories.
    pub base_path: PathBuf,

    /// Host name requests are assumed to arrive on when none is given.
    pub host_name: String,

    /// Prefix of every URL; empty or starting with `/`.
    pub servlet_path: String,

    /// Host serving raw file content; raw links are disabled without it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_file_host_name: Option<String>,

    /// File holding the URL signer key. A key is generated per process when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_signer_key: Option<PathBuf>,

    pub url_signer_max_age_secs: u64,

    /// Repositories whose raw links need no authkey.
    pub public_repositories: Vec<String>,

    pub visibility: VisibilityConfig,

    pub blame: BlameConfig,

    /// Per repository, ref name to redirect target.
    pub branch_redirects: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("."),
            host_name: "localhost".to_string(),
            servlet_path: String::new(),
            raw_file_host_name: None,
            url_signer_key: None,
            url_signer_max_age_secs: URL_SIGNER_MAX_AGE.as_secs(),
            public_repositories: Vec::new(),
            visibility: VisibilityConfig::default(),
            blame: BlameConfig::default(),
            branch_redirects: BTreeMap::new(),
        }
    }
}

impl ServerConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// The file cannot be read, is not valid TOML, or fails [`validate`](Self::validate).
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from `path`, or the default location when `None`.
    ///
    /// A missing file gives the default configuration; an explicit path that does not
    /// exist is an error.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(RefscopeError::ConfigNotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            return Self::load(path).await;
        }
        match Self::default_path() {
            Ok(path) if path.exists() => Self::load(&path).await,
            _ => Ok(Self::default()),
        }
    }

    /// `<config dir>/refscope/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Unable to determine configuration directory"))?;
        Ok(dir.join("refscope").join("config.toml"))
    }

    /// Reject settings that would make every request fail.
    pub fn validate(&self) -> Result<(), RefscopeError> {
        let invalid = |message: String| RefscopeError::ConfigError {
            message,
        };
        if !self.servlet_path.is_empty()
            && (!self.servlet_path.starts_with('/') || self.servlet_path.ends_with('/'))
        {
            return Err(invalid(format!(
                "servlet_path '{}' must be empty or start with '/' and not end with '/'",
                self.servlet_path
            )));
        }
        if self.url_signer_max_age_secs == 0 {
            return Err(invalid("url_signer_max_age_secs must be positive".to_string()));
        }
        if self.visibility.max_walk_commits == 0 {
            return Err(invalid("visibility.max_walk_commits must be positive".to_string()));
        }
        let raw_host = self.raw_file_host_name.as_deref();
        if raw_host.is_some_and(|raw| raw.eq_ignore_ascii_case(&self.host_name)) {
            return Err(invalid("raw_file_host_name must differ from host_name".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn repositories(&self) -> LocalRepositories {
        LocalRepositories::new(&self.base_path)
    }

    #[must_use]
    pub fn visibility_cache(&self) -> VisibilityCache {
        VisibilityCache::with_limits(
            self.visibility.max_entries,
            Duration::from_secs(self.visibility.ttl_secs),
            self.visibility.max_walk_commits,
        )
    }

    #[must_use]
    pub fn blame_cache(&self) -> BlameCache {
        BlameCache::with_max_weight(self.blame.max_weight)
    }

    #[must_use]
    pub fn key_source(&self) -> KeySource {
        self.url_signer_key.clone().map_or(KeySource::Generated, KeySource::File)
    }

    /// Signer using the configured key and lifetime.
    pub fn signer(&self) -> crate::core::Result<HmacUrlSigner> {
        HmacUrlSigner::new(
            &self.key_source().load()?,
            Duration::from_secs(self.url_signer_max_age_secs),
            Arc::new(SystemClock),
        )
    }

    pub fn raw_urls(&self) -> crate::core::Result<RawUrls> {
        Ok(RawUrls::new(self.raw_file_host_name.clone(), Arc::new(self.signer()?))
            .with_public_repositories(self.public_repositories.iter().cloned()))
    }

    #[must_use]
    pub fn resolver(&self) -> ViewResolver {
        let mut resolver = ViewResolver::new(Arc::new(self.repositories()));
        if let Some(raw) = &self.raw_file_host_name {
            resolver = resolver.with_raw_file_host(raw.clone());
        }
        let redirects = MapBranchRedirect::from_config(&self.branch_redirects);
        if !redirects.is_empty() {
            resolver = resolver.with_branch_redirect(Arc::new(redirects));
        }
        resolver
    }

    /// Everything a request needs, wired from this configuration.
    pub fn handler(&self) -> crate::core::Result<RequestHandler> {
        Ok(RequestHandler::new(
            self.resolver(),
            Arc::new(self.visibility_cache()),
            self.raw_urls()?,
        ))
    }
}
