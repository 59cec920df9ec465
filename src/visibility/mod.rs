//! Deciding whether an object may be shown.
//!
//! An object named directly by id is only disclosed when it is reachable from something
//! the caller can already see: a ref tip, or a commit the caller reached through one.
//! Reachability is a graph walk, so answers are cached per `(user, repository, object)`
//! with bounded size and a time-to-live.
//!
//! A walk that exceeds its commit ceiling fails closed: the object is reported as not
//! visible and nothing is cached, so a later request can try again.

use moka::future::Cache;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::constants::{
    ANONYMOUS_USER, MAX_REACHABILITY_WALK, VISIBILITY_CACHE_MAX_ENTRIES, VISIBILITY_CACHE_TTL,
};
use crate::core::{RefscopeError, Result};
use crate::git::{ObjectId, ObjectKind, Ref, RepositoryStore};

/// Opaque caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UserKey(String);

impl UserKey {
    #[must_use]
    pub fn new(user: impl Into<String>) -> Self {
        Self(user.into())
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self(ANONYMOUS_USER.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cache key for one visibility decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisibilityKey {
    pub user: UserKey,
    pub repository: String,
    pub object_id: ObjectId,
}

/// Memoized visibility checks.
pub struct VisibilityCache {
    cache: Cache<VisibilityKey, bool>,
    max_walk_commits: usize,
}

impl Default for VisibilityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl VisibilityCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(VISIBILITY_CACHE_MAX_ENTRIES, VISIBILITY_CACHE_TTL, MAX_REACHABILITY_WALK)
    }

    #[must_use]
    pub fn with_limits(max_entries: u64, ttl: Duration, max_walk_commits: usize) -> Self {
        let cache = Cache::builder().max_capacity(max_entries).time_to_live(ttl).build();
        Self {
            cache,
            max_walk_commits,
        }
    }

    /// Whether `object_id` in `repository` may be shown to `user`.
    ///
    /// `known_reachable` lists commits the caller already reached legitimately (for a
    /// diff, the new side); they are tried as extra walk starts.
    ///
    /// # Errors
    ///
    /// Store failures other than an exhausted walk. They are not cached.
    pub async fn is_visible(
        &self,
        user: &UserKey,
        repository: &str,
        store: &dyn RepositoryStore,
        object_id: ObjectId,
        known_reachable: &[ObjectId],
    ) -> Result<bool> {
        let key = VisibilityKey {
            user: user.clone(),
            repository: repository.to_string(),
            object_id,
        };
        let limit = self.max_walk_commits;
        let result = self
            .cache
            .try_get_with(key, async move {
                check_visible(store, &object_id, known_reachable, limit).await
            })
            .await;

        match result {
            Ok(visible) => Ok(visible),
            Err(error) => match error.as_ref() {
                RefscopeError::ReachabilityLimitExceeded {
                    limit,
                } => {
                    tracing::warn!(
                        target: "visibility",
                        "reachability walk for {} in {} gave up after {} commits; treating as not visible",
                        object_id,
                        repository,
                        limit
                    );
                    Ok(false)
                }
                other => Err(other.clone()),
            },
        }
    }

    /// Cached decision, if any.
    pub async fn cached(&self, user: &UserKey, repository: &str, object_id: ObjectId) -> Option<bool> {
        let key = VisibilityKey {
            user: user.clone(),
            repository: repository.to_string(),
            object_id,
        };
        self.cache.get(&key).await
    }

    /// Approximate number of cached decisions.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

/// Heads first, then tags, then everything else; only affects how fast a hit is found.
fn ref_rank(r: &Ref) -> u8 {
    if r.name.starts_with("refs/heads/") {
        0
    } else if r.name.starts_with("refs/tags/") {
        1
    } else {
        2
    }
}

async fn check_visible(
    store: &dyn RepositoryStore,
    object_id: &ObjectId,
    known_reachable: &[ObjectId],
    limit: usize,
) -> Result<bool> {
    let mut refs = store.refs("").await?;
    if refs.iter().any(|r| r.points_at(object_id)) {
        tracing::debug!(target: "visibility", "{} is a ref tip", object_id);
        return Ok(true);
    }

    // Tags named by id stand for the commit they peel to.
    let commit = store.peel(object_id).await?;
    if store.object_kind(&commit).await? != Some(ObjectKind::Commit) {
        tracing::debug!(target: "visibility", "{} is not a reachable commit", object_id);
        return Ok(false);
    }
    if commit != *object_id && refs.iter().any(|r| r.points_at(&commit)) {
        tracing::debug!(target: "visibility", "{} peels to ref tip {}", object_id, commit);
        return Ok(true);
    }

    refs.sort_by_key(ref_rank);
    let mut starts: Vec<ObjectId> = known_reachable.to_vec();
    for r in &refs {
        let tip = r.target();
        if starts.contains(&tip) {
            continue;
        }
        let kind = match r.target_kind {
            Some(kind) => Some(kind),
            None => store.object_kind(&tip).await?,
        };
        if kind == Some(ObjectKind::Commit) {
            starts.push(tip);
        }
    }

    let visible = store.is_reachable_from(&commit, &starts, limit).await?;
    tracing::debug!(
        target: "visibility",
        "{} reachable from {} starts: {}",
        commit,
        starts.len(),
        visible
    );
    Ok(visible)
}
