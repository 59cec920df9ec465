//! What a caller is allowed to learn about objects they name by id.

use refscope::blame::BlameCache;
use refscope::core::FailureReason;
use refscope::git::ObjectId;
use refscope::handler::{Outcome, RequestHandler};
use refscope::resolver::{ViewRequest, ViewResolver};
use refscope::signer::{HmacUrlSigner, ManualClock, RawUrls};
use refscope::test_utils::{MemoryRepositories, MemoryRepository};
use refscope::visibility::{UserKey, VisibilityCache};
use std::sync::Arc;
use std::time::Duration;

struct Site {
    repo: Arc<MemoryRepository>,
    visibility: Arc<VisibilityCache>,
    handler: RequestHandler,
    history: Vec<ObjectId>,
    orphan: ObjectId,
}

/// A linear history of `depth` commits on `main` plus one unreferenced commit.
fn site(depth: usize, max_walk: usize) -> Site {
    let repo = Arc::new(MemoryRepository::new("repo"));
    let mut history = vec![repo.commit_with_files(&[], &[("f", "0\n")])];
    for i in 1..depth {
        let parent = history[i - 1];
        let content = format!("{i}\n");
        history.push(repo.commit_with_files(&[parent], &[("f", content.as_str())]));
    }
    repo.set_branch("main", history[depth - 1]);
    let orphan = repo.commit_with_files(&[history[0]], &[("secret", "x\n")]);

    let visibility =
        Arc::new(VisibilityCache::with_limits(1_000, Duration::from_secs(60), max_walk));
    let provider = Arc::new(MemoryRepositories::new().with(Arc::clone(&repo)));
    let resolver = ViewResolver::new(provider).with_raw_file_host("raw.example.com");
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let signer = HmacUrlSigner::new(b"unit", Duration::from_secs(60), clock).unwrap();
    let raw_urls = RawUrls::new(Some("raw.example.com".to_string()), Arc::new(signer));
    let handler = RequestHandler::new(resolver, Arc::clone(&visibility), raw_urls);
    Site {
        repo,
        visibility,
        handler,
        history,
        orphan,
    }
}

async fn get(site: &Site, user: &str, url: &str) -> Outcome {
    let request = ViewRequest::from_url("git.example.com", "/b", url).unwrap();
    site.handler.handle(&request, &UserKey::new(user)).await
}

fn failure(outcome: &Outcome) -> Option<FailureReason> {
    match outcome {
        Outcome::Failure(failure) => Some(failure.reason),
        _ => None,
    }
}

#[tokio::test]
async fn test_decisions_are_cached_per_user() {
    let site = site(4, 100);
    let url = format!("/b/repo/+/{}/f", site.history[1].to_hex());

    assert!(matches!(get(&site, "alice", &url).await, Outcome::View(_)));
    let listings = site.repo.ref_listings();
    assert!(listings > 0);

    assert!(matches!(get(&site, "alice", &url).await, Outcome::View(_)));
    assert_eq!(site.repo.ref_listings(), listings);

    // Another user computes their own decision.
    assert!(matches!(get(&site, "bob", &url).await, Outcome::View(_)));
    assert!(site.repo.ref_listings() > listings);

    let cached = site.visibility.cached(&UserKey::new("alice"), "repo", site.history[1]).await;
    assert_eq!(cached, Some(true));
}

#[tokio::test]
async fn test_ref_named_requests_skip_visibility() {
    let site = site(3, 100);
    assert!(matches!(get(&site, "alice", "/b/repo/+/main~2/f").await, Outcome::Redirect(_)));
    assert!(matches!(get(&site, "alice", "/b/repo/+log/main").await, Outcome::View(_)));
    assert_eq!(site.repo.ref_listings(), 0);
    assert_eq!(site.visibility.entry_count().await, 0);
}

#[tokio::test]
async fn test_orphan_hidden_on_either_side_of_a_diff() {
    let site = site(3, 100);
    let orphan = site.orphan.to_hex();

    let outcome = get(&site, "alice", &format!("/b/repo/+/{orphan}")).await;
    assert_eq!(failure(&outcome), Some(FailureReason::ObjectNotFound));

    let outcome = get(&site, "alice", &format!("/b/repo/+/{orphan}..main")).await;
    assert_eq!(failure(&outcome), Some(FailureReason::ObjectNotFound));

    let outcome = get(&site, "alice", &format!("/b/repo/+/main..{}", &orphan[..10])).await;
    assert_eq!(failure(&outcome), Some(FailureReason::ObjectNotFound));

    let outcome = get(&site, "alice", &format!("/b/repo/+log/{orphan}")).await;
    assert_eq!(failure(&outcome), Some(FailureReason::ObjectNotFound));

    // Navigating to a visible parent is fine; the resolved commit is what counts.
    let outcome = get(&site, "alice", &format!("/b/repo/+log/{orphan}~1")).await;
    assert!(matches!(outcome, Outcome::View(_)), "{outcome:?}");
}

#[tokio::test]
async fn test_old_side_reached_through_new_side() {
    let site = site(3, 100);
    let old = site.history[0].to_hex();
    let new = site.history[2].to_hex();
    let outcome = get(&site, "alice", &format!("/b/repo/+/{old}..{new}/f")).await;
    assert!(matches!(outcome, Outcome::View(_)), "{outcome:?}");
}

#[tokio::test]
async fn test_exhausted_walk_fails_closed_and_is_retried() {
    let site = site(10, 3);
    let deep = site.history[0].to_hex();

    let outcome = get(&site, "alice", &format!("/b/repo/+/{deep}")).await;
    assert_eq!(failure(&outcome), Some(FailureReason::ObjectNotFound));
    assert_eq!(site.visibility.cached(&UserKey::new("alice"), "repo", site.history[0]).await, None);

    let listings = site.repo.ref_listings();
    get(&site, "alice", &format!("/b/repo/+/{deep}")).await;
    assert!(site.repo.ref_listings() > listings);

    // Shallow ids still fit inside the walk budget.
    let shallow = site.history[8].to_hex();
    assert!(matches!(get(&site, "alice", &format!("/b/repo/+/{shallow}")).await, Outcome::View(_)));
}

#[tokio::test]
async fn test_rebuilt_cache_forgets_decisions() {
    let site = site(3, 100);
    let alice = UserKey::new("alice");
    let url = format!("/b/repo/+/{}", site.history[0].to_hex());
    assert!(matches!(get(&site, "alice", &url).await, Outcome::View(_)));
    assert_eq!(site.visibility.entry_count().await, 1);

    site.repo.delete_ref("refs/heads/main");
    assert!(matches!(get(&site, "alice", &url).await, Outcome::View(_)));

    let rebuilt = VisibilityCache::with_limits(1_000, Duration::from_secs(60), 100);
    assert_eq!(rebuilt.cached(&alice, "repo", site.history[0]).await, None);
    let visible =
        rebuilt.is_visible(&alice, "repo", site.repo.as_ref(), site.history[0], &[]).await.unwrap();
    assert!(!visible);
}

#[tokio::test]
async fn test_blame_view_and_cache_agree() {
    let site = site(3, 100);
    let outcome = get(&site, "alice", "/b/repo/+blame/main/f").await;
    let Outcome::View(view) = outcome else {
        panic!("expected a view, got {outcome:?}");
    };
    let commit = view.revision().peeled_id().expect("resolved");

    let cache = BlameCache::new();
    let first = cache.get(site.repo.as_ref(), commit, "f").await.unwrap();
    let second = cache.get(site.repo.as_ref(), commit, "f").await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(site.repo.blame_calls(), 1);
    assert_eq!(first.line_count(), 1);
    assert_eq!(first.commit(first.regions()[0].commit_index), Some(&commit));
}
