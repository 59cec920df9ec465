//! The `refscope` binary end to end.

use anyhow::Result;
use predicates::prelude::*;

use crate::common::{TestServer, git_available, standard_history};

#[test]
fn test_repos_lists_repositories() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    standard_history(&server, "platform/build")?;
    standard_history(&server, "docs")?;

    server
        .refscope(&["repos"])
        .assert()
        .success()
        .stdout(predicate::str::diff("docs\nplatform/build\n"));
    Ok(())
}

#[test]
fn test_resolve_prints_canonical_url() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    standard_history(&server, "repo")?;

    server
        .refscope(&["resolve", "/b/repo/+/main/src/lib.rs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Path"))
        .stdout(predicate::str::contains("/b/repo/+/main/src/lib.rs"))
        .stdout(predicate::str::contains("//raw.example.com/b/git.example.com/repo/+/main/src/lib.rs?authkey="));

    server
        .refscope(&["resolve", "--json", "/b/repo/+log/main"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"outcome\": \"view\""))
        .stdout(predicate::str::contains("\"url\": \"/b/repo/+log/main\""));
    Ok(())
}

#[test]
fn test_resolve_failures_exit_nonzero() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    let history = standard_history(&server, "repo")?;
    let orphan = history.git.dangling_commit("orphan")?;

    server
        .refscope(&["resolve", &format!("/b/repo/+/{orphan}")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("object not found"))
        .stderr(predicate::str::contains("status 404"));

    server
        .refscope(&["resolve", "/b/repo/+/main?format=yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("status 400"));
    Ok(())
}

#[test]
fn test_visible_reports_orphans() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    let history = standard_history(&server, "repo")?;
    let orphan = history.git.dangling_commit("orphan")?;

    server
        .refscope(&["visible", "repo", &history.root.to_hex()[..8]])
        .assert()
        .success()
        .stdout(predicate::str::contains("is visible"));

    server
        .refscope(&["visible", "repo", &orphan.to_hex(), "--user", "bob"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is not visible to bob"));

    server
        .refscope(&["visible", "missing", "abcd1234"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Repository 'missing' not found"));
    Ok(())
}

#[test]
fn test_sign_then_verify() -> Result<()> {
    let server = TestServer::new()?;
    let url = "/b/git.example.com/repo/+/main/src/lib.rs";

    let output = server.refscope(&["sign", url]).assert().success().get_output().clone();
    let token = String::from_utf8(output.stdout)?.trim().to_string();
    assert!(!token.is_empty());

    server
        .refscope(&["verify", url, &token])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid until"));

    server
        .refscope(&["verify", "/b/git.example.com/repo/+/main/README", &token])
        .assert()
        .failure()
        .stderr(predicate::str::contains("token rejected"));
    Ok(())
}

#[test]
fn test_blame_and_last_commit() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    let history = standard_history(&server, "repo")?;

    server
        .refscope(&["blame", "repo", "main", "src/lib.rs", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"regions\""))
        .stdout(predicate::str::contains(history.second.to_hex()));

    server
        .refscope(&["blame", "repo", "v1", "src/lib.rs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Test User"));

    server
        .refscope(&["last-commit", "repo", "main", "src/lib.rs"])
        .assert()
        .success()
        .stdout(predicate::str::diff(format!("{}\n", history.second)));

    server
        .refscope(&["last-commit", "repo", "main", "nope.rs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
    Ok(())
}

#[test]
fn test_missing_config_file_is_reported() -> Result<()> {
    let server = TestServer::new()?;
    let missing = server.base_path().join("missing.toml");
    let mut cmd = assert_cmd::Command::cargo_bin("refscope")?;
    cmd.arg("--config")
        .arg(&missing)
        .arg("repos")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
    Ok(())
}

#[test]
fn test_config_from_environment() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    standard_history(&server, "repo")?;
    let mut cmd = assert_cmd::Command::cargo_bin("refscope")?;
    cmd.env("REFSCOPE_CONFIG", server.config_path())
        .arg("repos")
        .assert()
        .success()
        .stdout(predicate::str::contains("repo"));
    Ok(())
}
