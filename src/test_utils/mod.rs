//! Test utilities for refscope
//!
//! Two kinds of repository back the tests:
//!
//! - [`MemoryRepository`]: an in-memory object graph implementing
//!   [`RepositoryStore`](crate::git::RepositoryStore), with call counters so tests can
//!   assert how often the store was consulted
//! - [`TestGit`]: a real repository on disk driven through the system `git` binary
//!
//! # Example
//!
//! ```rust,no_run
//! use refscope::test_utils::MemoryRepository;
//!
//! let repo = MemoryRepository::new("platform/build");
//! let root = repo.commit_with_files(&[], &[("README", "hello\n")]);
//! repo.set_branch("main", root);
//! ```

pub mod git_helper;
pub mod memory_repo;

pub use git_helper::TestGit;
pub use memory_repo::{MemoryRepositories, MemoryRepository, test_author, test_object_id};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests, once per process.
///
/// Uses `level` when given, otherwise `RUST_LOG`; with neither, tests stay silent.
///
/// ```bash
/// RUST_LOG=visibility=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
