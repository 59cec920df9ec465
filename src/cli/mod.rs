//! Command-line interface for refscope.
//!
//! The binary exposes the library's request path and its caches one operation at a
//! time, against the repositories under the configured base path. It is an operator
//! and debugging tool; no command starts a server.
//!
//! # Available Commands
//!
//! - `resolve` - Resolve a URL to a view, redirect or failure
//! - `visible` - Check whether an object would be disclosed to a user
//! - `sign` / `verify` - Issue and check raw-content tokens
//! - `blame` - Print the cached blame regions of a file
//! - `last-commit` - Find the commit that last changed a path
//! - `repos` - List served repositories
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug output
//! - `--quiet` - Only log errors
//! - `--config` - Path to the configuration file (also `REFSCOPE_CONFIG`)
//!
//! # Example
//!
//! ```bash
//! refscope --config /etc/refscope.toml resolve '/b/platform/build/+/main/README.md'
//! refscope blame platform/build main README.md --json
//! ```

mod blame;
pub mod common;
mod repos;
mod resolve;
mod sign;
mod visible;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_ENV;
use common::{CommandContext, CommandExecutor};

#[derive(Parser)]
#[command(
    name = "refscope",
    about = "Resolve, authorize and attribute views of git repositories",
    version,
    long_about = "refscope turns repository browsing URLs into typed views, decides whether \
                  objects named by id may be shown, signs raw-content links and caches \
                  blame for the repositories under a base path."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = CONFIG_ENV)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a URL to a view, redirect or failure
    Resolve(resolve::ResolveCommand),

    /// Check whether an object would be disclosed to a user
    Visible(visible::VisibleCommand),

    /// Sign a raw-content URL
    Sign(sign::SignCommand),

    /// Verify a raw-content token
    Verify(sign::VerifyCommand),

    /// Show blame regions of a file
    Blame(blame::BlameCommand),

    /// Find the commit that last changed a path
    LastCommit(blame::LastCommitCommand),

    /// List repositories under the base path
    Repos(repos::ReposCommand),
}

impl Cli {
    /// Log filter implied by the global flags; `RUST_LOG` wins when neither is given.
    #[must_use]
    pub fn log_filter(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }

    pub async fn execute(self) -> Result<()> {
        let context = CommandContext::load(self.config.clone()).await?;
        self.execute_with_context(&context).await
    }

    pub async fn execute_with_context(self, context: &CommandContext) -> Result<()> {
        match self.command {
            Commands::Resolve(cmd) => cmd.execute(context).await,
            Commands::Visible(cmd) => cmd.execute(context).await,
            Commands::Sign(cmd) => cmd.execute(context).await,
            Commands::Verify(cmd) => cmd.execute(context).await,
            Commands::Blame(cmd) => cmd.execute(context).await,
            Commands::LastCommit(cmd) => cmd.execute(context).await,
            Commands::Repos(cmd) => cmd.execute(context).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_select_filter() {
        let cli = Cli::try_parse_from(["refscope", "repos", "--verbose"]).unwrap();
        assert_eq!(cli.log_filter(), Some("debug"));
        let cli = Cli::try_parse_from(["refscope", "-q", "repos"]).unwrap();
        assert_eq!(cli.log_filter(), Some("error"));
        assert!(Cli::try_parse_from(["refscope", "-q", "-v", "repos"]).is_err());
    }

    #[test]
    fn test_subcommands_parse() {
        let cli = Cli::try_parse_from([
            "refscope",
            "visible",
            "repo",
            "deadbeef",
            "--known",
            "abc1234",
            "--known",
            "def5678",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Visible(_)));
        let cli = Cli::try_parse_from(["refscope", "last-commit", "repo", "main", "f"]).unwrap();
        assert!(matches!(cli.command, Commands::LastCommit(_)));
        assert!(Cli::try_parse_from(["refscope", "blame", "repo", "main"]).is_err());
    }
}
