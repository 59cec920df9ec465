//! Collaborator traits through which the core reads repositories.
//!
//! The resolver, the visibility checker and the blame cache never touch an object
//! database directly. They go through [`RepositoryStore`], which is implemented by
//! [`crate::git::GitRepository`] for repositories on disk and by the in-memory
//! repository in `test_utils` for tests. Repositories are looked up by name through a
//! [`RepositoryProvider`].
//!
//! The two graph walks ([`RepositoryStore::is_reachable_from`] and
//! [`RepositoryStore::find_last_commit`]) have default implementations in
//! [`crate::git::walk`] built on the primitive reads; implementations with a faster
//! native path may override them.

use async_trait::async_trait;
use std::sync::Arc;

use super::object::{Commit, LineOrigin, ObjectId, ObjectKind, Ref};
use super::walk;
use crate::core::Result;

/// Read access to a single repository.
#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// Repository name as served (used for logging).
    fn name(&self) -> &str;

    /// All refs whose full name starts with `prefix` (`""` for every ref).
    async fn refs(&self, prefix: &str) -> Result<Vec<Ref>>;

    /// The ref with exactly this full name, if any.
    async fn exact_ref(&self, name: &str) -> Result<Option<Ref>>;

    /// Resolve a revision expression to an object id.
    ///
    /// `spec` is either a full ref name or a full or abbreviated hex object id, in both
    /// cases optionally followed by relative navigation (`~N`, `^N`). Returns `Ok(None)`
    /// when nothing matches.
    ///
    /// # Errors
    ///
    /// [`crate::core::RefscopeError::AmbiguousObject`] when an abbreviation matches more
    /// than one object; other errors for store failures.
    async fn resolve(&self, spec: &str) -> Result<Option<ObjectId>>;

    /// Kind of the object, or `None` if it does not exist.
    async fn object_kind(&self, id: &ObjectId) -> Result<Option<ObjectKind>>;

    /// Follow annotated tags until a non-tag object is reached.
    ///
    /// Non-tag objects peel to themselves.
    async fn peel(&self, id: &ObjectId) -> Result<ObjectId>;

    /// Parents and commit time, or `None` if `id` is not a readable commit.
    async fn commit(&self, id: &ObjectId) -> Result<Option<Commit>>;

    /// Object id of the tree entry at `path` in `commit`, or `None` if absent.
    async fn tree_entry(&self, commit: &ObjectId, path: &str) -> Result<Option<ObjectId>>;

    /// Per-line origins of `path` at `commit`, or `None` if the file does not exist.
    async fn blame(&self, commit: &ObjectId, path: &str) -> Result<Option<Vec<LineOrigin>>>;

    /// Whether `target` equals or is an ancestor of any commit in `starts`.
    ///
    /// # Errors
    ///
    /// [`crate::core::RefscopeError::ReachabilityLimitExceeded`] when the walk would
    /// visit more than `limit` commits.
    async fn is_reachable_from(
        &self,
        target: &ObjectId,
        starts: &[ObjectId],
        limit: usize,
    ) -> Result<bool> {
        walk::is_reachable_from(self, target, starts, limit).await
    }

    /// Most recent commit reachable from `start` that modifies `path` under exact-path
    /// matching (no rename detection).
    async fn find_last_commit(&self, start: &ObjectId, path: &str) -> Result<Option<ObjectId>> {
        walk::find_last_commit(self, start, path).await
    }
}

/// Looks repositories up by name.
#[async_trait]
pub trait RepositoryProvider: Send + Sync {
    /// Open the named repository, or `Ok(None)` if no such repository is served.
    async fn open(&self, name: &str) -> Result<Option<Arc<dyn RepositoryStore>>>;

    /// Names of every served repository, sorted.
    async fn list(&self) -> Result<Vec<String>>;
}
