//! Branch redirect policies.
//!
//! Hosts that rename branches (say `master` to `main`) keep old links working by
//! remapping the old name before it is resolved.

use std::collections::{BTreeMap, HashMap};

/// Decides whether a branch name should be replaced by another one.
pub trait BranchRedirect: Send + Sync {
    /// Replacement name for `name` in `repository`, or `None` to keep it.
    ///
    /// `name` is the revision as typed with any relative suffix removed.
    fn redirect_branch(&self, repository: &str, name: &str) -> Option<String>;
}

/// Never remaps anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBranchRedirect;

impl BranchRedirect for NoBranchRedirect {
    fn redirect_branch(&self, _repository: &str, _name: &str) -> Option<String> {
        None
    }
}

/// Per-repository `from -> to` table, usually built from configuration.
#[derive(Debug, Clone, Default)]
pub struct MapBranchRedirect {
    repositories: HashMap<String, HashMap<String, String>>,
}

impl MapBranchRedirect {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[branch_redirects.<repo>]` configuration tables.
    #[must_use]
    pub fn from_config(config: &BTreeMap<String, BTreeMap<String, String>>) -> Self {
        let mut redirects = Self::new();
        for (repository, table) in config {
            for (from, to) in table {
                redirects.insert(repository, from, to);
            }
        }
        redirects
    }

    pub fn insert(&mut self, repository: &str, from: &str, to: &str) {
        self.repositories
            .entry(repository.to_string())
            .or_default()
            .insert(from.to_string(), to.to_string());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repositories.values().all(HashMap::is_empty)
    }
}

impl BranchRedirect for MapBranchRedirect {
    fn redirect_branch(&self, repository: &str, name: &str) -> Option<String> {
        let table = self.repositories.get(repository)?;
        table
            .get(name)
            .or_else(|| table.get(name.strip_prefix("refs/heads/")?))
            .cloned()
    }
}

/// Turn a short branch name into a full ref name; names under `refs/` are kept.
#[must_use]
pub fn guess_full_ref_name(name: &str) -> String {
    if name.starts_with("refs/") {
        name.to_string()
    } else {
        format!("refs/heads/{name}")
    }
}
