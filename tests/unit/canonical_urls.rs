//! Canonical URLs resolve back to the view they were rendered from.

use refscope::resolver::{Resolution, ViewRequest, ViewResolver};
use refscope::test_utils::{MemoryRepositories, MemoryRepository};
use refscope::view::{View, ViewType};
use std::sync::Arc;

fn resolver() -> ViewResolver {
    let repo = Arc::new(MemoryRepository::new("platform/build"));
    let root = repo.commit_with_files(
        &[],
        &[("docs/index.md", "# Docs\n"), ("my file.txt", "x\n"), ("src/ünï.rs", "y\n")],
    );
    let main = repo.commit_with_files(&[root], &[("src/lib.rs", "z\n")]);
    repo.set_branch("main", main);
    repo.set_branch("release/1.x", root);
    repo.lightweight_tag("v1.0", root);
    ViewResolver::new(Arc::new(MemoryRepositories::new().with(repo)))
}

async fn resolve_url(resolver: &ViewResolver, url: &str) -> View {
    let request = ViewRequest::from_url("git.example.com", "/b", url).expect("parseable");
    match resolver.resolve(&request).await {
        Ok(Resolution::View(view)) => view,
        other => panic!("{url}: expected a view, got {other:?}"),
    }
}

#[tokio::test]
async fn test_round_trips_are_stable() {
    let resolver = resolver();
    let urls = [
        "/b/platform/build/+/main",
        "/b/platform/build/+/release/1.x/src/lib.rs",
        "/b/platform/build/+/v1.0..main/src",
        "/b/platform/build/+/main/docs/index.md",
        "/b/platform/build/+/main/my%20file.txt",
        "/b/platform/build/+/main/src/%C3%BCn%C3%AF.rs",
        "/b/platform/build/+log/release/1.x..main/docs",
        "/b/platform/build/+archive/main.tar.gz",
        "/b/platform/build/+refs/heads",
        "/b/platform/build/+/main?format=JSON",
        "/b/platform/build/+log/main?format=TEXT&n=5",
        "/b/platform/build/+/main^!",
        "/b/platform/build/+/v1.0^!",
        "/b/platform/build/+diff/main",
        "/b/platform/build/+diff/release/1.x..main/src",
        "/b/platform/build/+show/main/docs/index.md",
    ];
    for url in urls {
        let first = resolve_url(&resolver, url).await;
        let rendered = first.to_url();
        let second = resolve_url(&resolver, &rendered).await;
        assert_eq!(second, first, "{url} rendered as {rendered}");
        assert_eq!(second.to_url(), rendered);
    }
}

#[tokio::test]
async fn test_escaped_paths_decode() {
    let resolver = resolver();
    let view = resolve_url(&resolver, "/b/platform/build/+/main/my%20file.txt").await;
    assert_eq!(view.path_part(), Some("my file.txt"));
    assert_eq!(view.to_url(), "/b/platform/build/+/main/my%20file.txt");
}

#[tokio::test]
async fn test_longest_ref_wins_over_path() {
    let resolver = resolver();
    let view = resolve_url(&resolver, "/b/platform/build/+/release/1.x/src/lib.rs").await;
    assert_eq!(view.view_type(), ViewType::Path);
    assert_eq!(view.revision().name(), "release/1.x");
    assert_eq!(view.path_part(), Some("src/lib.rs"));
}

#[tokio::test]
async fn test_format_rendered_first() {
    let resolver = resolver();
    let view = resolve_url(&resolver, "/b/platform/build/+log/main?n=5&format=text").await;
    assert_eq!(view.param("n"), Some("5"));
    assert_eq!(view.to_url(), "/b/platform/build/+log/main?format=TEXT&n=5");
}

#[tokio::test]
async fn test_diff_without_parent_side_keeps_its_shape() {
    let resolver = resolver();
    let view = resolve_url(&resolver, "/b/platform/build/+diff/main").await;
    assert_eq!(view.view_type(), ViewType::Diff);
    assert!(view.old_revision().is_null());
    assert_eq!(view.to_url(), "/b/platform/build/+diff/main/");

    let root = resolve_url(&resolver, "/b/platform/build/+/v1.0^!").await;
    assert!(root.old_revision().is_null());
    assert_eq!(root.to_url(), "/b/platform/build/+diff/v1.0/");
}

#[tokio::test]
async fn test_markdown_shown_as_file_stays_a_file() {
    let resolver = resolver();
    let view = resolve_url(&resolver, "/b/platform/build/+show/main/docs/index.md").await;
    assert_eq!(view.view_type(), ViewType::Path);
    let again = resolve_url(&resolver, &view.to_url()).await;
    assert_eq!(again.view_type(), ViewType::Path);
}
