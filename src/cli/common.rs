//! Common utilities and traits for CLI commands

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::RefscopeError;
use crate::git::{ObjectId, RepositoryProvider, RepositoryStore};
use crate::resolver::RevisionParser;

/// Common trait for CLI command execution pattern
pub trait CommandExecutor: Sized {
    /// Run the command against a loaded configuration.
    fn execute(
        self,
        context: &CommandContext,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// What every command gets: the configuration and where it came from.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: ServerConfig,
    /// `None` when no file was given and the defaults (or the default file) apply.
    pub config_path: Option<PathBuf>,
}

impl CommandContext {
    /// Load the configuration from `config_path`, or the default location.
    pub async fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config = ServerConfig::load_or_default(config_path.as_deref()).await?;
        Ok(Self {
            config,
            config_path,
        })
    }

    #[must_use]
    pub const fn new(config: ServerConfig) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    /// Open a repository under the configured base path.
    pub async fn open_repository(&self, name: &str) -> Result<Arc<dyn RepositoryStore>> {
        crate::git::ensure_git_available()?;
        let repositories = self.config.repositories();
        repositories
            .open(name)
            .await?
            .ok_or_else(|| {
                RefscopeError::RepositoryNotFound {
                    name: name.to_string(),
                }
                .into()
            })
    }
}

/// Resolve a revision expression the way URLs do, then peel it to a commit.
pub async fn resolve_commit(store: &dyn RepositoryStore, revision: &str) -> Result<ObjectId> {
    let parser = RevisionParser::new(store);
    let resolved = parser
        .parse_revision(revision)
        .await
        .with_context(|| format!("Failed to resolve '{revision}'"))?
        .ok_or_else(|| RefscopeError::ObjectNotFound {
            id: revision.to_string(),
        })?;
    resolved.peeled_id().ok_or_else(|| {
        RefscopeError::ObjectNotFound {
            id: revision.to_string(),
        }
        .into()
    })
}
