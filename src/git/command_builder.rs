//! Type-safe Git command builder for consistent command execution
//!
//! Every read the on-disk repository store performs goes through [`GitCommand`], so
//! argument assembly, timeouts, logging and error mapping live in one place.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::GIT_COMMAND_TIMEOUT;
use crate::core::RefscopeError;

/// Name of the git executable on this platform.
#[must_use]
pub const fn git_binary() -> &'static str {
    if cfg!(windows) { "git.exe" } else { "git" }
}

/// Builder for a single `git` invocation.
///
/// # Examples
///
/// ```rust,no_run
/// use refscope::git::command_builder::GitCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// let refs = GitCommand::for_each_ref("refs/heads/")
///     .current_dir("/srv/git/platform.git")
///     .with_context("listing branches")
///     .execute_stdout()
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// New commands capture output and time out after [`GIT_COMMAND_TIMEOUT`].
pub struct GitCommand {
    /// Command arguments to pass to Git (e.g., ["cat-file", "-t", "HEAD"])
    args: Vec<String>,

    /// Repository directory, passed to git as `-C <dir>`
    current_dir: Option<std::path::PathBuf>,

    /// Environment variables to set for the Git process
    env_vars: Vec<(String, String)>,

    /// Maximum duration to wait for command completion (None = no timeout)
    timeout_duration: Option<Duration>,

    /// Optional context string for log lines
    context: Option<String>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            current_dir: None,
            // Keep git from consulting the user's config for pager or colors
            env_vars: vec![
                ("GIT_PAGER".to_string(), "cat".to_string()),
                ("GIT_TERMINAL_PROMPT".to_string(), "0".to_string()),
            ],
            timeout_duration: Some(GIT_COMMAND_TIMEOUT),
            context: None,
        }
    }
}

/// Output from a Git command
#[derive(Debug)]
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` if the process was killed by a signal.
    pub code: Option<i32>,
}

impl GitCommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl GitCommand {
    /// Creates a new Git command builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run git against `dir` (`git -C <dir> ...`).
    #[must_use]
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    fn operation(&self) -> String {
        self.args.first().cloned().unwrap_or_else(|| "unknown".to_string())
    }

    fn full_args(&self) -> Vec<String> {
        let mut full_args = Vec::with_capacity(self.args.len() + 2);
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.iter().cloned());
        full_args
    }

    /// Run the command and return its output whatever the exit status.
    ///
    /// # Errors
    ///
    /// Fails only when git cannot be spawned ([`RefscopeError::GitNotFound`]) or the
    /// timeout elapses.
    pub async fn execute_unchecked(self) -> Result<GitCommandOutput> {
        let start = std::time::Instant::now();
        let full_args = self.full_args();
        let operation = self.operation();

        let mut cmd = Command::new(git_binary());
        cmd.args(&full_args);
        for (key, value) in &self.env_vars {
            tracing::trace!(target: "git", "Setting env var: {}={}", key, value);
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        match self.context {
            Some(ref ctx) => tracing::debug!(
                target: "git",
                "({}) Executing command: {} {}",
                ctx,
                git_binary(),
                full_args.join(" ")
            ),
            None => tracing::debug!(
                target: "git",
                "Executing command: {} {}",
                git_binary(),
                full_args.join(" ")
            ),
        }

        let output_future = cmd.output();
        let spawned = if let Some(duration) = self.timeout_duration {
            match timeout(duration, output_future).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        target: "git",
                        "Command timed out after {} seconds: git {}",
                        duration.as_secs(),
                        full_args.join(" ")
                    );
                    return Err(RefscopeError::GitCommandError {
                        operation,
                        stderr: format!(
                            "Git command timed out after {} seconds: git {}",
                            duration.as_secs(),
                            full_args.join(" ")
                        ),
                    }
                    .into());
                }
            }
        } else {
            output_future.await
        };

        let output = match spawned {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RefscopeError::GitNotFound.into());
            }
            Err(e) => {
                return Err(e).context(format!("Failed to execute git {}", full_args.join(" ")));
            }
        };

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(target: "git::perf", "Git {} took {:.2}s", operation, elapsed.as_secs_f64());
        } else if elapsed.as_millis() > 100 {
            tracing::debug!(target: "git::perf", "Git {} took {}ms", operation, elapsed.as_millis());
        }

        Ok(GitCommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        })
    }

    /// Run the command, failing with [`RefscopeError::GitCommandError`] on a non-zero
    /// exit status.
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let operation = self.operation();
        let output = self.execute_unchecked().await?;

        if !output.success() {
            tracing::debug!(target: "git", "Command failed with exit code: {:?}", output.code);
            if !output.stderr.is_empty() {
                tracing::debug!(target: "git", "Error: {}", output.stderr.trim());
            }
            return Err(RefscopeError::GitCommandError {
                operation,
                stderr: output.stderr,
            }
            .into());
        }

        Ok(output)
    }

    /// Run the command and return trimmed stdout.
    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Run the command and report whether it exited with status 0.
    ///
    /// Exit status 1 is a normal "no" for predicates such as `merge-base --is-ancestor`;
    /// any other non-zero status is an error.
    pub async fn execute_predicate(self) -> Result<bool> {
        let operation = self.operation();
        let output = self.execute_unchecked().await?;
        match output.code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(RefscopeError::GitCommandError {
                operation,
                stderr: output.stderr,
            }
            .into()),
        }
    }
}

// Convenience builders for the reads the repository store performs

impl GitCommand {
    /// `for-each-ref` with a parseable format: id, type, peeled id, peeled type, name.
    #[must_use]
    pub fn for_each_ref(prefix: &str) -> Self {
        let cmd = Self::new().args([
            "for-each-ref",
            "--format=%(objectname) %(objecttype) %(*objectname) %(*objecttype) %(refname)",
        ]);
        if prefix.is_empty() { cmd } else { cmd.arg(prefix) }
    }

    /// Every object whose id starts with the hex `prefix`.
    #[must_use]
    pub fn disambiguate(prefix: &str) -> Self {
        Self::new().args(["rev-parse".to_string(), format!("--disambiguate={prefix}")])
    }

    /// Resolve a revision expression without falling back to DWIM ref lookup.
    #[must_use]
    pub fn rev_parse_verify(spec: &str) -> Self {
        Self::new().args(["rev-parse", "--verify", "--quiet", spec])
    }

    #[must_use]
    pub fn cat_file_type(id: &str) -> Self {
        Self::new().args(["cat-file", "-t", id])
    }

    /// Parents and committer time of a commit, NUL separated.
    #[must_use]
    pub fn commit_header(id: &str) -> Self {
        Self::new().args(["log", "-1", "--no-walk", "--format=%P%x00%ct", id, "--"])
    }

    /// `blame --porcelain` of one path at one commit.
    #[must_use]
    pub fn blame_porcelain(commit: &str, path: &str) -> Self {
        Self::new().args(["blame", "--porcelain", commit, "--", path])
    }

    /// Exit 0 when `ancestor` is reachable from `descendant`.
    #[must_use]
    pub fn merge_base_is_ancestor(ancestor: &str, descendant: &str) -> Self {
        Self::new().args(["merge-base", "--is-ancestor", ancestor, descendant])
    }

    /// Newest commit touching `path` from `start`, exact path matching.
    #[must_use]
    pub fn last_commit_for_path(start: &str, path: &str) -> Self {
        Self::new().args(["log", "-1", "--format=%H", "--no-renames", start, "--", path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder_basic() {
        let cmd = GitCommand::new().arg("status").arg("--short");
        assert_eq!(cmd.args, vec!["status", "--short"]);
    }

    #[test]
    fn test_command_builder_with_dir() {
        let cmd = GitCommand::new().current_dir("/tmp/repo").arg("status");
        assert_eq!(cmd.current_dir, Some(std::path::PathBuf::from("/tmp/repo")));
        assert_eq!(cmd.full_args(), vec!["-C", "/tmp/repo", "status"]);
    }

    #[test]
    fn test_for_each_ref_prefix_is_optional() {
        assert_eq!(GitCommand::for_each_ref("").args.len(), 2);
        let cmd = GitCommand::for_each_ref("refs/tags/");
        assert_eq!(cmd.args.last().map(String::as_str), Some("refs/tags/"));
    }

    #[test]
    fn test_blame_builder_separates_path() {
        let cmd = GitCommand::blame_porcelain("abc", "src/lib.rs");
        assert_eq!(cmd.args, vec!["blame", "--porcelain", "abc", "--", "src/lib.rs"]);
    }

    #[tokio::test]
    async fn test_git_version_runs() {
        let output = GitCommand::new().arg("--version").execute().await.unwrap();
        assert!(output.stdout.starts_with("git version"));
    }

    #[tokio::test]
    async fn test_predicate_failure_outside_repository() {
        let dir = tempfile::tempdir().unwrap();
        let result = GitCommand::merge_base_is_ancestor("HEAD", "HEAD")
            .current_dir(dir.path())
            .execute_predicate()
            .await;
        assert!(result.is_err());
    }
}
