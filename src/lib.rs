//! refscope - URL resolution, disclosure checks and blame caching for git browsing
//!
//! refscope is the core of a read-only git repository browser. It takes the paths users
//! type or paste, like `/b/platform/build/+/main/docs/index.md` or
//! `/b/platform/build/+/3f2a9c1^!`, and turns them into typed [`view::View`]s. It also
//! decides whether an object named directly by id may be shown. A signed link to raw
//! file content is issued on a separate host, and blame output is kept in a compact
//! cache.
//!
//! # Architecture Overview
//!
//! ```text
//!  ViewRequest ──► ViewResolver ──► View ──► RequestHandler ──► Outcome
//!                      │                          │
//!                      ▼                          ├──► VisibilityCache (reachability)
//!               RepositoryProvider                └──► RawUrls / UrlSigner (authkey)
//!                      │
//!                      ▼
//!               RepositoryStore ◄── BlameCache, find_last_commit
//! ```
//!
//! # Core Modules
//!
//! - [`view`] - immutable views, their builder and canonical URL rendering
//! - [`resolver`] - URL grammar, revision/path splitting, redirects
//! - [`visibility`] - reachability-based disclosure with a TTL cache
//! - [`signer`] - HMAC tokens for raw-content links
//! - [`blame`] - run-length blame regions with a weighted cache
//! - [`handler`] - composition of the above for one request
//!
//! ## Supporting Modules
//!
//! - [`git`] - repository access traits and the git CLI implementation
//! - [`config`] - TOML server configuration
//! - [`core`] - error types and request failures
//! - [`cli`] - the `refscope` command line
//!
//! # Example
//!
//! ```rust,no_run
//! use refscope::config::ServerConfig;
//! use refscope::handler::Outcome;
//! use refscope::resolver::ViewRequest;
//! use refscope::visibility::UserKey;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServerConfig {
//!     base_path: "/srv/git".into(),
//!     servlet_path: "/b".to_string(),
//!     ..ServerConfig::default()
//! };
//! let handler = config.handler()?;
//! let request = ViewRequest::from_url("git.example.com", "/b", "/b/platform/build/+/main/")?;
//! match handler.handle(&request, &UserKey::anonymous()).await {
//!     Outcome::View(view) => println!("{:?} at {}", view.view_type(), view.to_url()),
//!     Outcome::Redirect(url) => println!("redirect to {url}"),
//!     Outcome::Failure(failure) => println!("{failure}"),
//! }
//! # Ok(())
//! # }
//! ```

// Request path
pub mod handler;
pub mod resolver;
pub mod view;

// Caches and checks
pub mod blame;
pub mod signer;
pub mod visibility;

// Repository access
pub mod git;

// Supporting modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
