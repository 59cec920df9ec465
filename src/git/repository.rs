//! Repositories on disk, read through the system git binary.
//!
//! [`GitRepository`] implements [`RepositoryStore`] with one `git` subprocess per
//! primitive read; [`LocalRepositories`] serves every repository found below a base
//! directory, bare (`name.git`) or with a work tree (`name/.git`).

use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use super::command_builder::GitCommand;
use super::object::{
    Commit, LineOrigin, ObjectId, ObjectKind, Ref, is_hex_abbreviation, split_relative_suffix,
};
use super::porcelain::{parse_blame_porcelain, parse_for_each_ref};
use super::store::{RepositoryProvider, RepositoryStore};
use crate::core::{RefscopeError, Result};

/// A single repository on disk.
#[derive(Debug, Clone)]
pub struct GitRepository {
    name: String,
    path: PathBuf,
}

impl GitRepository {
    /// Handle for the repository at `path`, served as `name`.
    ///
    /// # Errors
    ///
    /// [`RefscopeError::GitRepoInvalid`] if `path` is neither a bare repository nor a
    /// work tree with a `.git` entry.
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !is_repository_dir(path) {
            return Err(RefscopeError::GitRepoInvalid {
                path: path.display().to_string(),
            });
        }
        Ok(Self {
            name: name.into(),
            path: path.to_path_buf(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn git(&self, cmd: GitCommand) -> GitCommand {
        cmd.current_dir(&self.path).with_context(self.name.clone())
    }

    async fn rev_parse(&self, spec: &str) -> Result<Option<ObjectId>> {
        let output = self
            .git(GitCommand::rev_parse_verify(spec))
            .execute_unchecked()
            .await
            .map_err(|e| RefscopeError::from_anyhow(&e))?;
        if !output.success() {
            return Ok(None);
        }
        Ok(Some(ObjectId::from_hex(output.stdout.trim())?))
    }

    async fn resolve_abbreviation(&self, prefix: &str) -> Result<Option<ObjectId>> {
        let output = self
            .git(GitCommand::disambiguate(prefix))
            .execute_unchecked()
            .await
            .map_err(|e| RefscopeError::from_anyhow(&e))?;
        if !output.success() {
            return Ok(None);
        }
        let candidates: Vec<&str> =
            output.stdout.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
        match candidates.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(ObjectId::from_hex(only)?)),
            _ => Err(RefscopeError::AmbiguousObject {
                spec: prefix.to_string(),
            }),
        }
    }
}

/// Bare repositories hold `HEAD` and `objects/` directly; work trees hold `.git`.
fn is_repository_dir(path: &Path) -> bool {
    (path.join("HEAD").is_file() && path.join("objects").is_dir()) || path.join(".git").exists()
}

#[async_trait]
impl RepositoryStore for GitRepository {
    fn name(&self) -> &str {
        &self.name
    }

    async fn refs(&self, prefix: &str) -> Result<Vec<Ref>> {
        let stdout = self
            .git(GitCommand::for_each_ref(prefix))
            .execute_stdout()
            .await
            .map_err(|e| RefscopeError::from_anyhow(&e))?;
        parse_for_each_ref(&stdout)
    }

    async fn exact_ref(&self, name: &str) -> Result<Option<Ref>> {
        // for-each-ref patterns match whole path components, so filter for equality
        Ok(self.refs(name).await?.into_iter().find(|r| r.name == name))
    }

    async fn resolve(&self, spec: &str) -> Result<Option<ObjectId>> {
        let (base, suffix) = split_relative_suffix(spec);
        let base_id = if base.starts_with("refs/") {
            match self.exact_ref(base).await? {
                Some(r) => r.id,
                None => return Ok(None),
            }
        } else if is_hex_abbreviation(base) {
            match self.resolve_abbreviation(base).await? {
                Some(id) => id,
                None => return Ok(None),
            }
        } else {
            return Ok(None);
        };

        if suffix.is_empty() {
            return Ok(Some(base_id));
        }
        self.rev_parse(&format!("{base_id}{suffix}")).await
    }

    async fn object_kind(&self, id: &ObjectId) -> Result<Option<ObjectKind>> {
        let output = self
            .git(GitCommand::cat_file_type(&id.to_hex()))
            .execute_unchecked()
            .await
            .map_err(|e| RefscopeError::from_anyhow(&e))?;
        if !output.success() {
            return Ok(None);
        }
        Ok(Some(output.stdout.parse()?))
    }

    async fn peel(&self, id: &ObjectId) -> Result<ObjectId> {
        Ok(self.rev_parse(&format!("{id}^{{}}")).await?.unwrap_or(*id))
    }

    async fn commit(&self, id: &ObjectId) -> Result<Option<Commit>> {
        if self.object_kind(id).await? != Some(ObjectKind::Commit) {
            return Ok(None);
        }
        let stdout = self
            .git(GitCommand::commit_header(&id.to_hex()))
            .execute_stdout()
            .await
            .map_err(|e| RefscopeError::from_anyhow(&e))?;
        let (parents, time) = stdout.split_once('\0').ok_or_else(|| RefscopeError::GitOutputParse {
            operation: "log".to_string(),
            reason: format!("missing separator in '{stdout}'"),
        })?;
        let parents = parents
            .split_whitespace()
            .map(ObjectId::from_hex)
            .collect::<Result<Vec<_>>>()?;
        let commit_time = time.trim().parse().map_err(|_| RefscopeError::GitOutputParse {
            operation: "log".to_string(),
            reason: format!("bad commit time '{time}'"),
        })?;
        Ok(Some(Commit {
            id: *id,
            parents,
            commit_time,
        }))
    }

    async fn tree_entry(&self, commit: &ObjectId, path: &str) -> Result<Option<ObjectId>> {
        self.rev_parse(&format!("{commit}:{path}")).await
    }

    async fn blame(&self, commit: &ObjectId, path: &str) -> Result<Option<Vec<LineOrigin>>> {
        if self.tree_entry(commit, path).await?.is_none() {
            return Ok(None);
        }
        let output = self
            .git(GitCommand::blame_porcelain(&commit.to_hex(), path))
            .execute()
            .await
            .map_err(|e| RefscopeError::from_anyhow(&e))?;
        parse_blame_porcelain(&output.stdout).map(Some)
    }

    async fn is_reachable_from(
        &self,
        target: &ObjectId,
        starts: &[ObjectId],
        _limit: usize,
    ) -> Result<bool> {
        let target_hex = target.to_hex();
        for start in starts {
            if start == target {
                return Ok(true);
            }
            let reachable = self
                .git(GitCommand::merge_base_is_ancestor(&target_hex, &start.to_hex()))
                .execute_predicate()
                .await
                .map_err(|e| RefscopeError::from_anyhow(&e))?;
            if reachable {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn find_last_commit(&self, start: &ObjectId, path: &str) -> Result<Option<ObjectId>> {
        let stdout = self
            .git(GitCommand::last_commit_for_path(&start.to_hex(), path))
            .execute_stdout()
            .await
            .map_err(|e| RefscopeError::from_anyhow(&e))?;
        if stdout.is_empty() {
            return Ok(None);
        }
        Ok(Some(ObjectId::from_hex(&stdout)?))
    }
}

/// Every repository below a base directory, addressed by relative path.
///
/// `platform/build` names either `<base>/platform/build.git` or
/// `<base>/platform/build`. Handles are cached after the first successful open.
pub struct LocalRepositories {
    base_path: PathBuf,
    handles: DashMap<String, Arc<GitRepository>>,
}

impl LocalRepositories {
    #[must_use]
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            handles: DashMap::new(),
        }
    }

    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn candidate_dirs(&self, name: &str) -> [PathBuf; 2] {
        [self.base_path.join(format!("{name}.git")), self.base_path.join(name)]
    }
}

/// Repository names are relative, slash separated and never escape the base path.
fn is_valid_repository_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('\\')
        && name.split('/').all(|part| !part.is_empty() && part != "." && part != "..")
}

#[async_trait]
impl RepositoryProvider for LocalRepositories {
    async fn open(&self, name: &str) -> Result<Option<Arc<dyn RepositoryStore>>> {
        if let Some(handle) = self.handles.get(name) {
            return Ok(Some(handle.value().clone() as Arc<dyn RepositoryStore>));
        }
        if !is_valid_repository_name(name) {
            tracing::debug!(target: "git", "Rejecting repository name '{}'", name);
            return Ok(None);
        }

        for dir in self.candidate_dirs(name) {
            if dir.is_dir() && is_repository_dir(&dir) {
                let repo = Arc::new(GitRepository::open(name, &dir)?);
                self.handles.insert(name.to_string(), repo.clone());
                return Ok(Some(repo as Arc<dyn RepositoryStore>));
            }
        }
        Ok(None)
    }

    async fn list(&self) -> Result<Vec<String>> {
        let base = self.base_path.clone();
        let names = tokio::task::spawn_blocking(move || scan_repositories(&base))
            .await
            .map_err(|e| RefscopeError::Other {
                message: format!("Repository scan panicked: {e}"),
            })?;
        Ok(names)
    }
}

fn scan_repositories(base: &Path) -> Vec<String> {
    let mut names = Vec::new();
    let mut walker = WalkDir::new(base).min_depth(1).follow_links(false).into_iter();
    while let Some(entry) = walker.next() {
        let Ok(entry) = entry else {
            continue;
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let path = entry.path();
        if !is_repository_dir(path) {
            continue;
        }
        walker.skip_current_dir();
        let Ok(relative) = path.strip_prefix(base) else {
            continue;
        };
        let relative = relative.to_string_lossy().replace('\\', "/");
        let name = relative.strip_suffix(".git").unwrap_or(&relative).to_string();
        names.push(name);
    }
    names.sort();
    names.dedup();
    names
}
