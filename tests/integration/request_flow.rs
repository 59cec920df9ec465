//! The full request path over git-backed repositories.

use anyhow::Result;
use refscope::core::FailureReason;
use refscope::git::ObjectKind;
use refscope::handler::{Outcome, RequestHandler};
use refscope::resolver::ViewRequest;
use refscope::view::{View, ViewType};
use refscope::visibility::UserKey;

use crate::common::{TestServer, git_available, standard_history};

async fn handle(handler: &RequestHandler, host: &str, url: &str) -> Outcome {
    let request = ViewRequest::from_url(host, "/b", url).expect("well-formed url");
    handler.handle(&request, &UserKey::new("alice")).await
}

fn expect_view(outcome: Outcome) -> View {
    match outcome {
        Outcome::View(view) => view,
        other => panic!("expected a view, got {other:?}"),
    }
}

fn expect_failure(outcome: Outcome) -> FailureReason {
    match outcome {
        Outcome::Failure(failure) => failure.reason,
        other => panic!("expected a failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_parent_diff_of_branch() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    let history = standard_history(&server, "repo")?;
    let handler = server.config.handler()?;

    let diff = expect_view(handle(&handler, "git.example.com", "/b/repo/+/main^!").await);
    assert_eq!(diff.view_type(), ViewType::Diff);
    assert_eq!(diff.revision().id(), Some(history.third));
    assert_eq!(diff.old_revision().name(), "main^");
    assert_eq!(diff.old_revision().id(), Some(history.second));
    assert_eq!(diff.to_url(), "/b/repo/+/main^!/");
    Ok(())
}

#[tokio::test]
async fn test_ids_need_reachability() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    let history = standard_history(&server, "repo")?;
    let orphan = history.git.dangling_commit("orphan")?;
    let handler = server.config.handler()?;

    let url = format!("/b/repo/+/{}/README", &history.root.to_hex()[..12]);
    let view = expect_view(handle(&handler, "git.example.com", &url).await);
    assert_eq!(view.revision().id(), Some(history.root));

    let url = format!("/b/repo/+/{}", orphan.to_hex());
    let reason = expect_failure(handle(&handler, "git.example.com", &url).await);
    assert_eq!(reason, FailureReason::ObjectNotFound);

    // Diff against a hidden commit is refused too.
    let url = format!("/b/repo/+/{}..main", orphan.to_hex());
    let reason = expect_failure(handle(&handler, "git.example.com", &url).await);
    assert_eq!(reason, FailureReason::ObjectNotFound);
    Ok(())
}

#[tokio::test]
async fn test_tag_and_path_views() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    let history = standard_history(&server, "repo")?;
    let handler = server.config.handler()?;

    let tag = expect_view(handle(&handler, "git.example.com", "/b/repo/+/v1").await);
    assert_eq!(tag.view_type(), ViewType::Revision);
    assert_eq!(tag.revision().kind(), Some(ObjectKind::Tag));
    assert_eq!(tag.revision().id(), Some(history.tag));
    assert_eq!(tag.revision().peeled_id(), Some(history.third));

    let doc = expect_view(handle(&handler, "git.example.com", "/b/repo/+/main/docs/index.md").await);
    assert_eq!(doc.view_type(), ViewType::Doc);
    assert_eq!(doc.path_part(), Some("docs/index.md"));

    let blame = expect_view(handle(&handler, "git.example.com", "/b/repo/+blame/v1/src/lib.rs").await);
    assert_eq!(blame.view_type(), ViewType::Blame);

    let missing = expect_failure(handle(&handler, "git.example.com", "/b/nope/+/main").await);
    assert_eq!(missing, FailureReason::RepositoryNotFound);
    Ok(())
}

#[tokio::test]
async fn test_raw_links_round_trip() -> Result<()> {
    if !git_available() {
        return Ok(());
    }
    let server = TestServer::new()?;
    standard_history(&server, "repo")?;
    let handler = server.config.handler()?;

    let page = expect_view(handle(&handler, "git.example.com", "/b/repo/+/main/src/lib.rs").await);
    let link = handler.raw_urls().create_raw_url(&page).expect("raw host configured");
    assert_eq!(link.host, "raw.example.com");
    assert!(link.path.starts_with("/b/git.example.com/repo/+/main/src/lib.rs?authkey="));

    let raw = expect_view(handle(&handler, "raw.example.com", &link.path).await);
    assert_eq!(raw.view_type(), ViewType::RawContent);
    assert_eq!(raw.host_name_in_path(), Some("git.example.com"));

    let tampered = link.path.replace("src/lib.rs", "README");
    let reason = expect_failure(handle(&handler, "raw.example.com", &tampered).await);
    assert_eq!(reason, FailureReason::ObjectNotFound);
    Ok(())
}
