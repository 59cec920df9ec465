//! `refscope repos`: list served repositories.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandExecutor};
use crate::git::RepositoryProvider;

#[derive(Debug, Args)]
pub struct ReposCommand {}

impl CommandExecutor for ReposCommand {
    async fn execute(self, context: &CommandContext) -> Result<()> {
        let repositories = context.config.repositories();
        let names = repositories.list().await?;
        if names.is_empty() {
            println!(
                "{}",
                format!("No repositories under {}", repositories.base_path().display()).yellow()
            );
        }
        for name in names {
            println!("{name}");
        }
        Ok(())
    }
}
