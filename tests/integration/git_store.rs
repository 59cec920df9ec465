//! `GitRepository` against repositories built with the git binary.

use anyhow::Result;
use refscope::blame::{BlameCache, find_last_commit};
use refscope::git::{LocalRepositories, ObjectKind, RepositoryProvider, RepositoryStore};
use std::sync::Arc;

use crate::common::{TestServer, git_available, standard_history};

async fn open(server: &TestServer, name: &str) -> Result<Arc<dyn RepositoryStore>> {
    let repositories = LocalRepositories::new(server.base_path());
    Ok(repositories.open(name).await?.expect("repository exists"))
}

#[tokio::test]
async fn test_resolve_refs_and_abbreviations() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    refscope::test_utils::init_test_logging(None);
    let server = TestServer::new()?;
    let history = standard_history(&server, "repo")?;
    let store = open(&server, "repo").await?;

    assert_eq!(store.resolve("refs/heads/main").await?, Some(history.third));
    assert_eq!(store.resolve("refs/heads/main~2").await?, Some(history.root));
    assert_eq!(store.resolve("refs/heads/main^1").await?, Some(history.second));
    assert_eq!(store.resolve(&history.second.to_hex()[..10]).await?, Some(history.second));
    assert_eq!(store.resolve(&history.root.to_hex()).await?, Some(history.root));
    assert_eq!(store.resolve("refs/heads/missing").await?, None);
    // Short names are the parser's business, not the store's.
    assert_eq!(store.resolve("main").await?, None);

    let heads = store.refs("refs/heads/").await?;
    assert_eq!(heads.len(), 1);
    assert_eq!(heads[0].name, "refs/heads/main");
    assert!(store.exact_ref("refs/heads/mai").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_object_kinds_and_tags() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    let history = standard_history(&server, "repo")?;
    let store = open(&server, "repo").await?;

    assert_eq!(store.object_kind(&history.tag).await?, Some(ObjectKind::Tag));
    assert_eq!(store.object_kind(&history.third).await?, Some(ObjectKind::Commit));
    assert_eq!(store.peel(&history.tag).await?, history.third);
    assert_eq!(store.peel(&history.third).await?, history.third);

    let tag_ref = store.exact_ref("refs/tags/v1").await?.expect("tag ref");
    assert_eq!(tag_ref.id, history.tag);
    assert_eq!(tag_ref.target(), history.third);
    assert_eq!(tag_ref.target_kind, Some(ObjectKind::Commit));
    let head = store.exact_ref("refs/heads/main").await?.expect("branch ref");
    assert_eq!(head.target_kind, Some(ObjectKind::Commit));

    let commit = store.commit(&history.third).await?.expect("commit");
    assert_eq!(commit.parents, vec![history.second]);
    assert!(store.commit(&history.tag).await?.is_none());

    assert!(store.tree_entry(&history.third, "docs/index.md").await?.is_some());
    assert!(store.tree_entry(&history.root, "docs/index.md").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_blame_attributes_lines() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    let history = standard_history(&server, "repo")?;
    let store = open(&server, "repo").await?;

    let origins = store.blame(&history.third, "src/lib.rs").await?.expect("file exists");
    let commits: Vec<_> = origins.iter().map(|o| o.commit).collect();
    assert_eq!(commits, vec![Some(history.root), Some(history.second), Some(history.second)]);
    let author = origins[0].author.as_ref().expect("author");
    assert_eq!(author.name, "Test User");
    assert_eq!(origins[0].path.as_deref(), Some("src/lib.rs"));
    assert!(store.blame(&history.third, "missing.rs").await?.is_none());

    let cache = BlameCache::new();
    let list = cache.get(store.as_ref(), history.third, "src/lib.rs").await?;
    let runs: Vec<i32> = list.regions().iter().map(|r| r.run_length).collect();
    assert_eq!(runs, vec![1, 2]);
    assert_eq!(list.lines(), origins);
    Ok(())
}

#[tokio::test]
async fn test_reachability_and_last_commit() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    let history = standard_history(&server, "repo")?;
    let orphan = history.git.dangling_commit("orphan")?;
    let store = open(&server, "repo").await?;

    assert!(store.is_reachable_from(&history.root, &[history.third], 100).await?);
    assert!(store.is_reachable_from(&history.third, &[history.third], 100).await?);
    assert!(!store.is_reachable_from(&history.third, &[history.root], 100).await?);
    assert!(!store.is_reachable_from(&orphan, &[history.third], 100).await?);

    let store = store.as_ref();
    assert_eq!(find_last_commit(store, history.third, "src/lib.rs").await?, Some(history.second));
    assert_eq!(find_last_commit(store, history.third, "README").await?, Some(history.root));
    assert_eq!(find_last_commit(store, history.third, "docs/index.md").await?, Some(history.third));
    assert_eq!(find_last_commit(store, history.third, "missing").await?, None);
    Ok(())
}

#[tokio::test]
async fn test_last_commit_of_deleted_file() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    let history = standard_history(&server, "repo")?;
    history.git.remove_file("README")?;
    let deletion = history.git.commit_all("drop readme")?;
    let store = open(&server, "repo").await?;
    assert_eq!(find_last_commit(store.as_ref(), deletion, "README").await?, Some(deletion));
    Ok(())
}

#[tokio::test]
async fn test_provider_lists_and_rejects_escapes() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    standard_history(&server, "platform/build")?;
    standard_history(&server, "docs")?;
    let repositories = LocalRepositories::new(server.base_path());

    assert_eq!(repositories.list().await?, vec!["docs".to_string(), "platform/build".to_string()]);
    assert!(repositories.open("platform/build").await?.is_some());
    assert!(repositories.open("platform").await?.is_none());
    assert!(repositories.open("../repos/docs").await?.is_none());
    Ok(())
}
