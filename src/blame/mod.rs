//! Cached per-line history attribution.
//!
//! Blame output is one origin per line, but neighbouring lines almost always share one.
//! [`RegionList`] stores runs of identical origins against deduplicated symbol tables,
//! so a ten thousand line file touched by a dozen commits costs a few dozen regions.
//! [`BlameCache`] keeps those lists keyed by `(commit, path)` and weighs them by region
//! count.

use moka::future::Cache;
use serde::Serialize;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::constants::BLAME_CACHE_MAX_WEIGHT;
use crate::core::{RefscopeError, Result};
use crate::git::{Author, LineOrigin, ObjectId, RepositoryStore};

/// Index value meaning "unknown".
pub const UNKNOWN_INDEX: i32 = -1;

/// A run of consecutive lines with the same origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub commit_index: i32,
    pub author_index: i32,
    pub path_index: i32,
    pub run_length: i32,
}

impl Region {
    const fn same_origin(&self, commit: i32, author: i32, path: i32) -> bool {
        self.commit_index == commit && self.author_index == author && self.path_index == path
    }
}

/// Blame result as runs over deduplicated commit, author and path tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegionList {
    commits: Vec<ObjectId>,
    authors: Vec<Author>,
    paths: Vec<String>,
    regions: Vec<Region>,
}

/// Assigns dense indices to distinct values in first-seen order.
struct Interner<T> {
    values: Vec<T>,
    index: HashMap<T, i32>,
}

impl<T: Clone + Eq + Hash> Interner<T> {
    fn new() -> Self {
        Self {
            values: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn intern(&mut self, value: Option<&T>) -> i32 {
        let Some(value) = value else {
            return UNKNOWN_INDEX;
        };
        if let Some(&i) = self.index.get(value) {
            return i;
        }
        let i = i32::try_from(self.values.len()).unwrap_or(UNKNOWN_INDEX);
        self.values.push(value.clone());
        self.index.insert(value.clone(), i);
        i
    }
}

fn lookup<T>(table: &[T], index: i32) -> Option<&T> {
    usize::try_from(index).ok().and_then(|i| table.get(i))
}

impl RegionList {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Collapse per-line origins into runs.
    ///
    /// A new region starts whenever any of commit, author or path differs from the
    /// previous line.
    #[must_use]
    pub fn from_origins(origins: &[LineOrigin]) -> Self {
        let mut commits = Interner::new();
        let mut authors = Interner::new();
        let mut paths = Interner::new();
        let mut regions: Vec<Region> = Vec::new();

        for origin in origins {
            let commit = commits.intern(origin.commit.as_ref());
            let author = authors.intern(origin.author.as_ref());
            let path = paths.intern(origin.path.as_ref());
            match regions.last_mut() {
                Some(last) if last.same_origin(commit, author, path) => last.run_length += 1,
                _ => regions.push(Region {
                    commit_index: commit,
                    author_index: author,
                    path_index: path,
                    run_length: 1,
                }),
            }
        }

        Self {
            commits: commits.values,
            authors: authors.values,
            paths: paths.values,
            regions,
        }
    }

    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    #[must_use]
    pub fn commit(&self, index: i32) -> Option<&ObjectId> {
        lookup(&self.commits, index)
    }

    #[must_use]
    pub fn author(&self, index: i32) -> Option<&Author> {
        lookup(&self.authors, index)
    }

    #[must_use]
    pub fn path(&self, index: i32) -> Option<&str> {
        lookup(&self.paths, index).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Lines covered by all regions.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.regions.iter().map(|r| usize::try_from(r.run_length).unwrap_or(0)).sum()
    }

    /// Cache weight: the number of regions.
    #[must_use]
    pub fn weight(&self) -> usize {
        self.regions.len()
    }

    /// Expand back to one origin per line.
    #[must_use]
    pub fn lines(&self) -> Vec<LineOrigin> {
        let mut lines = Vec::with_capacity(self.line_count());
        for region in &self.regions {
            let origin = LineOrigin {
                commit: self.commit(region.commit_index).copied(),
                author: self.author(region.author_index).cloned(),
                path: self.path(region.path_index).map(str::to_string),
            };
            for _ in 0..region.run_length {
                lines.push(origin.clone());
            }
        }
        lines
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BlameKey {
    commit: ObjectId,
    path: String,
}

/// Memoized blame, weighed by region count.
pub struct BlameCache {
    cache: Cache<BlameKey, Arc<RegionList>>,
}

impl Default for BlameCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BlameCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_weight(BLAME_CACHE_MAX_WEIGHT)
    }

    #[must_use]
    pub fn with_max_weight(max_weight: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_weight)
            .weigher(|_key: &BlameKey, value: &Arc<RegionList>| {
                u32::try_from(value.weight()).unwrap_or(u32::MAX).max(1)
            })
            .build();
        Self {
            cache,
        }
    }

    /// Blame of `path` at `commit`; an absent file gives an empty list.
    ///
    /// Concurrent calls for the same key share one computation.
    ///
    /// # Errors
    ///
    /// Store failures; they are not cached.
    pub async fn get(
        &self,
        store: &dyn RepositoryStore,
        commit: ObjectId,
        path: &str,
    ) -> Result<Arc<RegionList>> {
        let key = BlameKey {
            commit,
            path: path.to_string(),
        };
        self.cache
            .try_get_with(key, async move {
                let origins = store.blame(&commit, path).await?;
                let list = match origins {
                    Some(origins) => RegionList::from_origins(&origins),
                    None => RegionList::empty(),
                };
                tracing::debug!(
                    target: "blame",
                    "blamed {}:{} into {} regions over {} lines",
                    commit,
                    path,
                    list.weight(),
                    list.line_count()
                );
                Ok(Arc::new(list))
            })
            .await
            .map_err(|e: Arc<RefscopeError>| (*e).clone())
    }

    /// Total cached weight.
    pub async fn weighted_size(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.weighted_size()
    }
}

/// Most recent commit reachable from `start` that modified `path`.
///
/// # Errors
///
/// Store failures.
pub async fn find_last_commit(
    store: &dyn RepositoryStore,
    start: ObjectId,
    path: &str,
) -> Result<Option<ObjectId>> {
    store.find_last_commit(&start, path).await
}
