//! Repository access for refscope.
//!
//! Everything above this module talks to repositories through two traits:
//!
//! - [`RepositoryStore`]: primitive reads of one repository (refs, object kinds, commit
//!   parents, tree entries, blame) plus two graph walks with default implementations
//! - [`RepositoryProvider`]: lookup of a repository by its served name
//!
//! The production implementation shells out to the system `git` binary, the same way
//! Cargo does, through the [`GitCommand`] builder:
//!
//! | Trait method            | git invocation                               |
//! |-------------------------|----------------------------------------------|
//! | `refs`, `exact_ref`     | `for-each-ref --format=...`                  |
//! | `resolve`               | `rev-parse --disambiguate`, `rev-parse --verify` |
//! | `object_kind`           | `cat-file -t`                                |
//! | `commit`                | `log -1 --no-walk --format=%P%x00%ct`        |
//! | `tree_entry`, `peel`    | `rev-parse --verify <commit>:<path>`, `<id>^{}` |
//! | `blame`                 | `blame --porcelain`                          |
//! | `is_reachable_from`     | `merge-base --is-ancestor`                   |
//! | `find_last_commit`      | `log -1 --no-renames -- <path>`              |
//!
//! # Examples
//!
//! ```rust,no_run
//! use refscope::git::{LocalRepositories, RepositoryProvider};
//!
//! # async fn example() -> refscope::core::Result<()> {
//! let repos = LocalRepositories::new("/srv/git");
//! if let Some(repo) = repos.open("platform/build").await? {
//!     let branches = repo.refs("refs/heads/").await?;
//!     println!("{} branches", branches.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod command_builder;
pub mod object;
pub mod porcelain;
pub mod repository;
pub mod store;
pub mod walk;

pub use command_builder::{GitCommand, GitCommandOutput};
pub use object::{
    Author, Commit, LineOrigin, ObjectId, ObjectKind, Ref, is_hex_abbreviation,
    split_relative_suffix,
};
pub use repository::{GitRepository, LocalRepositories};
pub use store::{RepositoryProvider, RepositoryStore};

use crate::core::{RefscopeError, Result};

/// Checks whether the git binary can be found in `PATH`.
#[must_use]
pub fn is_git_installed() -> bool {
    which::which(command_builder::git_binary()).is_ok()
}

/// Ensures Git is available on the system or returns [`RefscopeError::GitNotFound`].
pub fn ensure_git_available() -> Result<()> {
    if !is_git_installed() {
        return Err(RefscopeError::GitNotFound);
    }
    Ok(())
}
