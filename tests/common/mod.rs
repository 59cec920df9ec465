//! Common test utilities for refscope test suites
//!
//! [`TestServer`] lays out a base directory of real git repositories plus a
//! configuration file pointing at it, and runs the `refscope` binary against both.

// Not every suite uses every helper
#![allow(dead_code)]

use anyhow::Result;
use assert_cmd::Command;
use refscope::config::ServerConfig;
use refscope::test_utils::TestGit;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Key material used by every test configuration.
pub const SIGNER_KEY: &[u8] = b"integration test signer key";

/// Tests that drive the system git binary skip themselves when it is missing.
pub fn git_available() -> bool {
    refscope::git::is_git_installed()
}

/// A base path with repositories and a `config.toml` describing it.
pub struct TestServer {
    _temp_dir: TempDir,
    base_path: PathBuf,
    config_path: PathBuf,
    pub config: ServerConfig,
}

impl TestServer {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let base_path = temp_dir.path().join("repos");
        std::fs::create_dir_all(&base_path)?;
        let key_path = temp_dir.path().join("signer.key");
        std::fs::write(&key_path, SIGNER_KEY)?;

        let config = ServerConfig {
            base_path: base_path.clone(),
            host_name: "git.example.com".to_string(),
            servlet_path: "/b".to_string(),
            raw_file_host_name: Some("raw.example.com".to_string()),
            url_signer_key: Some(key_path),
            url_signer_max_age_secs: 300,
            ..ServerConfig::default()
        };
        let config_path = temp_dir.path().join("config.toml");
        let server = Self {
            _temp_dir: temp_dir,
            base_path,
            config_path,
            config,
        };
        server.write_config()?;
        Ok(server)
    }

    /// Persist `self.config` after a test changed it.
    pub fn write_config(&self) -> Result<()> {
        std::fs::write(&self.config_path, toml::to_string_pretty(&self.config)?)?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// New repository with a work tree, served as `name`.
    pub fn create_repo(&self, name: &str) -> Result<TestGit> {
        TestGit::init(self.base_path.join(name))
    }

    /// `refscope --config <config.toml> <args>`.
    pub fn refscope(&self, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("refscope").expect("refscope binary is built");
        cmd.arg("--config").arg(&self.config_path).args(args).env_remove("RUST_LOG");
        cmd
    }
}

/// The small history most scenarios start from:
///
/// ```text
/// root (README, src/lib.rs) ── second (src/lib.rs changed) ── third (docs/index.md)
///                                                               main, tag v1 (annotated)
/// ```
pub struct History {
    pub git: TestGit,
    pub root: refscope::git::ObjectId,
    pub second: refscope::git::ObjectId,
    pub third: refscope::git::ObjectId,
    pub tag: refscope::git::ObjectId,
}

pub fn standard_history(server: &TestServer, name: &str) -> Result<History> {
    let git = server.create_repo(name)?;
    git.write_file("README", "hello\n")?;
    git.write_file("src/lib.rs", "fn a() {}\nfn b() {}\n")?;
    let root = git.commit_all("root")?;
    git.write_file("src/lib.rs", "fn a() {}\nfn b() { todo() }\nfn c() {}\n")?;
    let second = git.commit_all("second")?;
    git.write_file("docs/index.md", "# Docs\n")?;
    let third = git.commit_all("third")?;
    let tag = git.annotated_tag("v1", "release v1")?;
    Ok(History {
        git,
        root,
        second,
        third,
        tag,
    })
}
