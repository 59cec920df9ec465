//! `refscope visible`: would this object be disclosed to this user?

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandExecutor};
use crate::core::RefscopeError;
use crate::git::{ObjectId, RepositoryStore};
use crate::visibility::UserKey;

#[derive(Debug, Args)]
pub struct VisibleCommand {
    /// Repository name relative to the base path
    repository: String,

    /// Full or abbreviated object id
    #[arg(value_name = "ID")]
    object_id: String,

    /// Caller identity
    #[arg(long)]
    user: Option<String>,

    /// Commit already known to be visible to the caller (repeatable)
    #[arg(long = "known", value_name = "ID")]
    known: Vec<String>,
}

async fn lookup(store: &dyn RepositoryStore, spec: &str) -> Result<ObjectId> {
    store
        .resolve(spec)
        .await
        .with_context(|| format!("Failed to resolve '{spec}'"))?
        .ok_or_else(|| {
            RefscopeError::ObjectNotFound {
                id: spec.to_string(),
            }
            .into()
        })
}

impl CommandExecutor for VisibleCommand {
    async fn execute(self, context: &CommandContext) -> Result<()> {
        let store = context.open_repository(&self.repository).await?;
        let id = lookup(store.as_ref(), &self.object_id).await?;
        let mut known: Vec<ObjectId> = Vec::with_capacity(self.known.len());
        for spec in &self.known {
            known.push(lookup(store.as_ref(), spec).await?);
        }

        let user = self.user.as_deref().map_or_else(UserKey::anonymous, UserKey::new);
        let cache = context.config.visibility_cache();
        let visible =
            cache.is_visible(&user, &self.repository, store.as_ref(), id, &known).await?;

        if visible {
            println!("{} {} is visible to {}", "✓".green(), id, user);
        } else {
            println!("{} {} is not visible to {}", "✗".red(), id, user);
        }
        Ok(())
    }
}
