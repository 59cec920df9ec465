//! Commit-graph walks built on [`RepositoryStore`] primitives.
//!
//! These are the default implementations behind
//! [`RepositoryStore::is_reachable_from`] and [`RepositoryStore::find_last_commit`].
//! Both are iterative so that deep histories cost heap, not stack.

use std::collections::{HashSet, VecDeque};

use super::object::ObjectId;
use super::store::RepositoryStore;
use crate::core::{RefscopeError, Result};

/// Breadth-first ancestry test.
///
/// Returns `true` when `target` is one of `starts` or an ancestor of one of them. The
/// walk is exact; it gives up with [`RefscopeError::ReachabilityLimitExceeded`] after
/// reading `limit` commits.
pub async fn is_reachable_from<S>(
    store: &S,
    target: &ObjectId,
    starts: &[ObjectId],
    limit: usize,
) -> Result<bool>
where
    S: RepositoryStore + ?Sized,
{
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut queue: VecDeque<ObjectId> = VecDeque::new();
    for start in starts {
        if seen.insert(*start) {
            queue.push_back(*start);
        }
    }

    let mut visited = 0usize;
    while let Some(id) = queue.pop_front() {
        if id == *target {
            tracing::trace!(target: "visibility", "{} reached after {} commits", target, visited);
            return Ok(true);
        }
        if visited >= limit {
            return Err(RefscopeError::ReachabilityLimitExceeded {
                limit,
            });
        }
        visited += 1;

        let Some(commit) = store.commit(&id).await? else {
            continue;
        };
        for parent in commit.parents {
            if seen.insert(parent) {
                queue.push_back(parent);
            }
        }
    }

    Ok(false)
}

/// Newest commit reachable from `start` whose entry at `path` differs from every
/// parent's entry.
///
/// When a commit leaves the path unchanged relative to one of its parents, only that
/// parent is followed, matching git's default history simplification. A root commit
/// counts as modifying the path when the path exists in it.
pub async fn find_last_commit<S>(store: &S, start: &ObjectId, path: &str) -> Result<Option<ObjectId>>
where
    S: RepositoryStore + ?Sized,
{
    let mut seen: HashSet<ObjectId> = HashSet::new();
    let mut current = *start;

    while seen.insert(current) {
        let Some(commit) = store.commit(&current).await? else {
            return Ok(None);
        };
        let entry = store.tree_entry(&current, path).await?;

        if commit.parents.is_empty() {
            return Ok(entry.map(|_| current));
        }

        let mut same_as: Option<ObjectId> = None;
        for parent in &commit.parents {
            if store.tree_entry(parent, path).await? == entry {
                same_as = Some(*parent);
                break;
            }
        }

        match same_as {
            Some(parent) => current = parent,
            None => return Ok(Some(current)),
        }
    }

    Ok(None)
}
