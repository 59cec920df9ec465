//! `refscope blame` and `refscope last-commit`.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

use super::common::{CommandContext, CommandExecutor, resolve_commit};
use crate::blame::{RegionList, find_last_commit};

#[derive(Debug, Args)]
pub struct BlameCommand {
    repository: String,

    /// Branch, tag or commit id
    revision: String,

    path: String,

    /// Print the region list as JSON
    #[arg(long)]
    json: bool,
}

fn short(id: &crate::git::ObjectId) -> String {
    id.to_hex()[..8].to_string()
}

fn print_regions(list: &RegionList) {
    let mut line = 1;
    for region in list.regions() {
        let end = line + region.run_length - 1;
        let commit = list.commit(region.commit_index).map_or_else(|| "?".repeat(8), short);
        let author = list.author(region.author_index).map_or("unknown", |a| a.name.as_str());
        let path = list.path(region.path_index).unwrap_or("");
        println!("{:>5}-{:<5} {} {:<20} {}", line, end, commit.yellow(), author, path.dimmed());
        line = end + 1;
    }
}

impl CommandExecutor for BlameCommand {
    async fn execute(self, context: &CommandContext) -> Result<()> {
        let store = context.open_repository(&self.repository).await?;
        let commit = resolve_commit(store.as_ref(), &self.revision).await?;
        let cache = context.config.blame_cache();
        let list = cache.get(store.as_ref(), commit, &self.path).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(list.as_ref())?);
        } else if list.is_empty() {
            println!("{} has no lines at {}", self.path, short(&commit));
        } else {
            print_regions(&list);
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
pub struct LastCommitCommand {
    repository: String,

    /// Branch, tag or commit id to start from
    revision: String,

    path: String,
}

impl CommandExecutor for LastCommitCommand {
    async fn execute(self, context: &CommandContext) -> Result<()> {
        let store = context.open_repository(&self.repository).await?;
        let start = resolve_commit(store.as_ref(), &self.revision).await?;
        match find_last_commit(store.as_ref(), start, &self.path).await? {
            Some(id) => {
                println!("{id}");
                Ok(())
            }
            None => bail!("{} does not exist at {}", self.path, self.revision),
        }
    }
}
