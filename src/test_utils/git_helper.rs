//! Real git repositories for tests.
//!
//! Tests that exercise [`GitRepository`](crate::git::GitRepository) build small
//! repositories on disk with the system `git` binary. [`TestGit`] wraps the handful of
//! porcelain commands they need, with a fixed identity and fixed dates so that
//! commit ids are stable between runs.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::git::ObjectId;

const TEST_DATE: &str = "2024-01-01T00:00:00+0000";

/// Drives `git` inside one test repository.
pub struct TestGit {
    repo_path: PathBuf,
}

impl TestGit {
    fn run(&self, args: &[&str], action: &str) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .env("GIT_AUTHOR_DATE", TEST_DATE)
            .env("GIT_COMMITTER_DATE", TEST_DATE)
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .output()
            .with_context(|| action.to_string())?;

        if !output.status.success() {
            bail!("{} failed: {}", action, String::from_utf8_lossy(&output.stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    /// Create the directory and a repository in it whose unborn branch is `main`.
    pub fn init(repo_path: impl Into<PathBuf>) -> Result<Self> {
        let git = Self::new(repo_path);
        std::fs::create_dir_all(&git.repo_path)
            .with_context(|| format!("Failed to create {}", git.repo_path.display()))?;
        git.run(&["init", "--quiet"], "Failed to initialize git repository")?;
        git.run(&["symbolic-ref", "HEAD", "refs/heads/main"], "Failed to set HEAD")?;
        git.run(&["config", "user.email", "test@refscope.example"], "Failed to set email")?;
        git.run(&["config", "user.name", "Test User"], "Failed to set name")?;
        git.run(&["config", "commit.gpgsign", "false"], "Failed to disable signing")?;
        Ok(git)
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let full = self.repo_path.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&full, content).with_context(|| format!("Failed to write {path}"))
    }

    pub fn remove_file(&self, path: &str) -> Result<()> {
        self.run(&["rm", "--quiet", path], &format!("Failed to remove {path}"))?;
        Ok(())
    }

    /// Stage everything and commit; returns the new commit id.
    pub fn commit_all(&self, message: &str) -> Result<ObjectId> {
        self.run(&["add", "--all"], "Failed to add files to git")?;
        self.run(
            &["commit", "--quiet", "--allow-empty", "-m", message],
            "Failed to create git commit",
        )?;
        self.rev_parse("HEAD")
    }

    pub fn tag(&self, name: &str) -> Result<()> {
        self.run(&["tag", name], &format!("Failed to create tag: {name}"))?;
        Ok(())
    }

    /// Annotated tag at HEAD; returns the tag object id.
    pub fn annotated_tag(&self, name: &str, message: &str) -> Result<ObjectId> {
        self.run(&["tag", "-a", name, "-m", message], &format!("Failed to create tag: {name}"))?;
        self.rev_parse(&format!("refs/tags/{name}"))
    }

    pub fn create_branch(&self, name: &str) -> Result<()> {
        self.run(&["branch", name], &format!("Failed to create branch: {name}"))?;
        Ok(())
    }

    pub fn checkout(&self, name: &str) -> Result<()> {
        self.run(&["checkout", "--quiet", name], &format!("Failed to checkout: {name}"))?;
        Ok(())
    }

    /// Merge `branch` into the current branch with a merge commit.
    pub fn merge(&self, branch: &str) -> Result<ObjectId> {
        self.run(
            &["merge", "--quiet", "--no-ff", "--no-edit", branch],
            &format!("Failed to merge: {branch}"),
        )?;
        self.rev_parse("HEAD")
    }

    /// Commit on no branch at all, leaving HEAD where it was.
    pub fn dangling_commit(&self, message: &str) -> Result<ObjectId> {
        let tree = self.run(&["write-tree"], "Failed to write tree")?;
        let id = self.run(&["commit-tree", &tree, "-m", message], "Failed to commit tree")?;
        id.parse().with_context(|| format!("bad commit id {id}"))
    }

    pub fn rev_parse(&self, spec: &str) -> Result<ObjectId> {
        let id = self.run(&["rev-parse", "--verify", spec], &format!("Failed to resolve {spec}"))?;
        id.parse().with_context(|| format!("bad object id {id}"))
    }
}
