//! In-memory repositories for deterministic tests.
//!
//! [`MemoryRepository`] implements [`RepositoryStore`] over a hash map of objects, with
//! call counters so tests can assert how often the caches went to the store.
//!
//! ```rust,no_run
//! use refscope::test_utils::MemoryRepository;
//!
//! let repo = MemoryRepository::new("repo");
//! let root = repo.commit_with_files(&[], &[("README.md", "hello\n")]);
//! let next = repo.commit(&[root]);
//! repo.set_branch("main", next);
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::core::{RefscopeError, Result};
use crate::git::{
    Author, Commit, LineOrigin, ObjectId, ObjectKind, Ref, RepositoryProvider, RepositoryStore,
    is_hex_abbreviation, split_relative_suffix,
};

#[derive(Debug, Clone)]
enum Object {
    Commit {
        parents: Vec<ObjectId>,
        time: i64,
        files: BTreeMap<String, ObjectId>,
    },
    Blob(String),
    Tag {
        target: ObjectId,
    },
}

impl Object {
    const fn kind(&self) -> ObjectKind {
        match self {
            Self::Commit {
                ..
            } => ObjectKind::Commit,
            Self::Blob(_) => ObjectKind::Blob,
            Self::Tag {
                ..
            } => ObjectKind::Tag,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    objects: HashMap<ObjectId, Object>,
    refs: BTreeMap<String, ObjectId>,
    blames: HashMap<(ObjectId, String), Vec<LineOrigin>>,
    blame_delay: Option<Duration>,
    blame_failure: Option<String>,
    sequence: i64,
}

/// Hash `data` down to an object id.
#[must_use]
pub fn test_object_id(data: &str) -> ObjectId {
    let digest = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&digest[..20]);
    ObjectId::from_bytes(bytes)
}

/// Author used for synthesized blame lines.
#[must_use]
pub fn test_author(name: &str) -> Author {
    Author {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        time: 1_700_000_000,
        tz_offset_minutes: 0,
    }
}

/// A repository held entirely in memory.
#[derive(Debug)]
pub struct MemoryRepository {
    name: String,
    state: RwLock<State>,
    commit_reads: AtomicUsize,
    blame_calls: AtomicUsize,
    ref_listings: AtomicUsize,
    kind_lookups: AtomicUsize,
}

impl MemoryRepository {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: RwLock::new(State::default()),
            commit_reads: AtomicUsize::new(0),
            blame_calls: AtomicUsize::new(0),
            ref_listings: AtomicUsize::new(0),
            kind_lookups: AtomicUsize::new(0),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// A commit that changes no files.
    pub fn commit(&self, parents: &[ObjectId]) -> ObjectId {
        self.commit_with_files(parents, &[])
    }

    /// A commit whose files are the first parent's files with `files` written on top.
    pub fn commit_with_files(&self, parents: &[ObjectId], files: &[(&str, &str)]) -> ObjectId {
        self.commit_changes(parents, files, &[])
    }

    /// A commit that writes `files` and deletes `removed` relative to the first parent.
    pub fn commit_changes(
        &self,
        parents: &[ObjectId],
        files: &[(&str, &str)],
        removed: &[&str],
    ) -> ObjectId {
        let mut state = self.write();
        state.sequence += 1;
        let sequence = state.sequence;
        let id = test_object_id(&format!("commit:{}:{sequence}", self.name));
        Self::insert_commit(&mut state, id, parents, files, removed);
        id
    }

    /// A commit with a caller-chosen id.
    pub fn commit_with_id(&self, id: ObjectId, parents: &[ObjectId]) -> ObjectId {
        let mut state = self.write();
        state.sequence += 1;
        Self::insert_commit(&mut state, id, parents, &[], &[]);
        id
    }

    fn insert_commit(
        state: &mut State,
        id: ObjectId,
        parents: &[ObjectId],
        files: &[(&str, &str)],
        removed: &[&str],
    ) {
        let mut tree = match parents.first().and_then(|p| state.objects.get(p)) {
            Some(Object::Commit {
                files,
                ..
            }) => files.clone(),
            _ => BTreeMap::new(),
        };
        for (path, content) in files {
            let blob = test_object_id(&format!("blob:{content}"));
            state.objects.insert(blob, Object::Blob((*content).to_string()));
            tree.insert((*path).to_string(), blob);
        }
        for path in removed {
            tree.remove(*path);
        }
        state.objects.insert(
            id,
            Object::Commit {
                parents: parents.to_vec(),
                time: 1_700_000_000 + state.sequence,
                files: tree,
            },
        );
    }

    /// Store a blob that no commit references.
    pub fn blob(&self, content: &str) -> ObjectId {
        let id = test_object_id(&format!("blob:{content}"));
        self.write().objects.insert(id, Object::Blob(content.to_string()));
        id
    }

    pub fn set_ref(&self, name: &str, id: ObjectId) {
        self.write().refs.insert(name.to_string(), id);
    }

    pub fn set_branch(&self, name: &str, id: ObjectId) {
        self.set_ref(&format!("refs/heads/{name}"), id);
    }

    pub fn lightweight_tag(&self, name: &str, id: ObjectId) {
        self.set_ref(&format!("refs/tags/{name}"), id);
    }

    /// Create an annotated tag object pointing at `target` and a `refs/tags/` ref to it.
    pub fn annotated_tag(&self, name: &str, target: ObjectId) -> ObjectId {
        let id = test_object_id(&format!("tag:{}:{name}", self.name));
        let mut state = self.write();
        state.objects.insert(
            id,
            Object::Tag {
                target,
            },
        );
        state.refs.insert(format!("refs/tags/{name}"), id);
        id
    }

    pub fn delete_ref(&self, name: &str) {
        self.write().refs.remove(name);
    }

    pub fn set_blame(&self, commit: ObjectId, path: &str, origins: Vec<LineOrigin>) {
        self.write().blames.insert((commit, path.to_string()), origins);
    }

    /// Make every blame call sleep first, to widen race windows in tests.
    pub fn set_blame_delay(&self, delay: Duration) {
        self.write().blame_delay = Some(delay);
    }

    /// Make blame calls fail with `stderr` until cleared with `None`.
    pub fn set_blame_failure(&self, stderr: Option<&str>) {
        self.write().blame_failure = stderr.map(str::to_string);
    }

    /// Number of [`RepositoryStore::commit`] calls so far.
    pub fn commit_reads(&self) -> usize {
        self.commit_reads.load(Ordering::SeqCst)
    }

    /// Number of [`RepositoryStore::blame`] calls so far.
    pub fn blame_calls(&self) -> usize {
        self.blame_calls.load(Ordering::SeqCst)
    }

    /// Number of [`RepositoryStore::refs`] calls so far.
    pub fn ref_listings(&self) -> usize {
        self.ref_listings.load(Ordering::SeqCst)
    }

    /// Number of [`RepositoryStore::object_kind`] calls so far.
    pub fn kind_lookups(&self) -> usize {
        self.kind_lookups.load(Ordering::SeqCst)
    }

    fn peel_in(state: &State, id: ObjectId) -> ObjectId {
        let mut current = id;
        while let Some(Object::Tag {
            target,
        }) = state.objects.get(&current)
        {
            current = *target;
        }
        current
    }

    fn make_ref(state: &State, name: &str, id: ObjectId) -> Ref {
        let mut r = Ref::new(name, id);
        let peeled = Self::peel_in(state, id);
        if peeled != id {
            r.peeled_id = Some(peeled);
        }
        match state.objects.get(&peeled) {
            Some(object) => r.with_target_kind(object.kind()),
            None => r,
        }
    }

    fn parents_in(state: &State, id: ObjectId) -> Option<&[ObjectId]> {
        match state.objects.get(&Self::peel_in(state, id)) {
            Some(Object::Commit {
                parents,
                ..
            }) => Some(parents),
            _ => None,
        }
    }

    /// Apply `~N` / `^N` navigation.
    fn navigate(state: &State, start: ObjectId, suffix: &str) -> Option<ObjectId> {
        let bytes = suffix.as_bytes();
        let mut current = start;
        let mut i = 0;
        while i < bytes.len() {
            let op = bytes[i];
            i += 1;
            let digits_start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let count = if digits_start == i {
                1
            } else {
                suffix[digits_start..i].parse::<usize>().ok()?
            };
            current = Self::peel_in(state, current);
            match op {
                b'~' => {
                    for _ in 0..count {
                        current = *Self::parents_in(state, current)?.first()?;
                    }
                }
                b'^' if count == 0 => {
                    Self::parents_in(state, current)?;
                }
                b'^' => {
                    current = *Self::parents_in(state, current)?.get(count - 1)?;
                }
                _ => return None,
            }
        }
        Some(current)
    }

    fn lookup_base(state: &State, base: &str) -> Result<Option<ObjectId>> {
        if base.starts_with("refs/") {
            return Ok(state.refs.get(base).copied());
        }
        if !is_hex_abbreviation(base) {
            return Ok(None);
        }
        let prefix = base.to_ascii_lowercase();
        let mut matches = state.objects.keys().filter(|id| id.starts_with_hex(&prefix));
        let first = matches.next().copied();
        if matches.next().is_some() {
            return Err(RefscopeError::AmbiguousObject {
                spec: base.to_string(),
            });
        }
        Ok(first)
    }
}

#[async_trait]
impl RepositoryStore for MemoryRepository {
    fn name(&self) -> &str {
        &self.name
    }

    async fn refs(&self, prefix: &str) -> Result<Vec<Ref>> {
        self.ref_listings.fetch_add(1, Ordering::SeqCst);
        let state = self.read();
        Ok(state
            .refs
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, id)| Self::make_ref(&state, name, *id))
            .collect())
    }

    async fn exact_ref(&self, name: &str) -> Result<Option<Ref>> {
        let state = self.read();
        Ok(state.refs.get(name).map(|id| Self::make_ref(&state, name, *id)))
    }

    async fn resolve(&self, spec: &str) -> Result<Option<ObjectId>> {
        let (base, suffix) = split_relative_suffix(spec);
        let state = self.read();
        let Some(start) = Self::lookup_base(&state, base)? else {
            return Ok(None);
        };
        if suffix.is_empty() {
            return Ok(Some(start));
        }
        Ok(Self::navigate(&state, start, suffix))
    }

    async fn object_kind(&self, id: &ObjectId) -> Result<Option<ObjectKind>> {
        self.kind_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.read().objects.get(id).map(Object::kind))
    }

    async fn peel(&self, id: &ObjectId) -> Result<ObjectId> {
        Ok(Self::peel_in(&self.read(), *id))
    }

    async fn commit(&self, id: &ObjectId) -> Result<Option<Commit>> {
        self.commit_reads.fetch_add(1, Ordering::SeqCst);
        match self.read().objects.get(id) {
            Some(Object::Commit {
                parents,
                time,
                ..
            }) => Ok(Some(Commit {
                id: *id,
                parents: parents.clone(),
                commit_time: *time,
            })),
            _ => Ok(None),
        }
    }

    async fn tree_entry(&self, commit: &ObjectId, path: &str) -> Result<Option<ObjectId>> {
        let state = self.read();
        let Some(Object::Commit {
            files,
            ..
        }) = state.objects.get(commit)
        else {
            return Ok(None);
        };
        let path = path.trim_matches('/');
        if let Some(id) = files.get(path) {
            return Ok(Some(*id));
        }
        // Directories are synthesized from the files below them.
        let dir = format!("{path}/");
        let listing: Vec<String> = files
            .iter()
            .filter(|(name, _)| path.is_empty() || name.starts_with(&dir))
            .map(|(name, id)| format!("{name} {id}"))
            .collect();
        if listing.is_empty() {
            return Ok(None);
        }
        Ok(Some(test_object_id(&format!("tree:{}", listing.join("\n")))))
    }

    async fn blame(&self, commit: &ObjectId, path: &str) -> Result<Option<Vec<LineOrigin>>> {
        self.blame_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.read().blame_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.read();
        if let Some(stderr) = &state.blame_failure {
            return Err(RefscopeError::GitCommandError {
                operation: "blame".to_string(),
                stderr: stderr.clone(),
            });
        }
        if let Some(origins) = state.blames.get(&(*commit, path.to_string())) {
            return Ok(Some(origins.clone()));
        }
        let Some(Object::Commit {
            files,
            ..
        }) = state.objects.get(commit)
        else {
            return Ok(None);
        };
        let Some(Object::Blob(content)) = files.get(path).and_then(|id| state.objects.get(id))
        else {
            return Ok(None);
        };
        Ok(Some(
            content
                .lines()
                .map(|_| LineOrigin::new(*commit, test_author("Tester"), path))
                .collect(),
        ))
    }
}

/// A [`RepositoryProvider`] over a fixed set of in-memory repositories.
#[derive(Debug, Default)]
pub struct MemoryRepositories {
    repositories: RwLock<BTreeMap<String, Arc<MemoryRepository>>>,
}

impl MemoryRepositories {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, repository: Arc<MemoryRepository>) {
        self.repositories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(repository.name.clone(), repository);
    }

    #[must_use]
    pub fn with(self, repository: Arc<MemoryRepository>) -> Self {
        self.add(repository);
        self
    }
}

#[async_trait]
impl RepositoryProvider for MemoryRepositories {
    async fn open(&self, name: &str) -> Result<Option<Arc<dyn RepositoryStore>>> {
        let repositories = self.repositories.read().unwrap_or_else(PoisonError::into_inner);
        Ok(repositories.get(name).map(|repo| Arc::clone(repo) as Arc<dyn RepositoryStore>))
    }

    async fn list(&self) -> Result<Vec<String>> {
        Ok(self
            .repositories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_refs_and_navigation() {
        let repo = MemoryRepository::new("repo");
        let a = repo.commit(&[]);
        let b = repo.commit(&[a]);
        let c = repo.commit(&[b]);
        repo.set_branch("main", c);

        assert_eq!(repo.resolve("refs/heads/main").await.unwrap(), Some(c));
        assert_eq!(repo.resolve("refs/heads/main~1").await.unwrap(), Some(b));
        assert_eq!(repo.resolve("refs/heads/main~2").await.unwrap(), Some(a));
        assert_eq!(repo.resolve("refs/heads/main^^").await.unwrap(), Some(a));
        assert_eq!(repo.resolve("refs/heads/main~3").await.unwrap(), None);
        assert_eq!(repo.resolve(&c.to_hex()[..8]).await.unwrap(), Some(c));
    }

    #[tokio::test]
    async fn test_annotated_tag_peels() {
        let repo = MemoryRepository::new("repo");
        let a = repo.commit(&[]);
        let tag = repo.annotated_tag("v1", a);
        let r = repo.exact_ref("refs/tags/v1").await.unwrap().unwrap();
        assert_eq!(r.id, tag);
        assert_eq!(r.peeled_id, Some(a));
        assert_eq!(repo.object_kind(&tag).await.unwrap(), Some(ObjectKind::Tag));
        assert_eq!(repo.peel(&tag).await.unwrap(), a);
    }

    #[tokio::test]
    async fn test_files_carry_forward() {
        let repo = MemoryRepository::new("repo");
        let a = repo.commit_with_files(&[], &[("a.txt", "1"), ("dir/b.txt", "2")]);
        let b = repo.commit_changes(&[a], &[("a.txt", "3")], &["dir/b.txt"]);
        assert!(repo.tree_entry(&a, "dir").await.unwrap().is_some());
        assert!(repo.tree_entry(&b, "dir/b.txt").await.unwrap().is_none());
        assert_ne!(
            repo.tree_entry(&a, "a.txt").await.unwrap(),
            repo.tree_entry(&b, "a.txt").await.unwrap()
        );
    }
}
