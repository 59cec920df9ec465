//! Splitting `<revision>/<path>` and resolving the revision half.
//!
//! Ref names may contain `/`, so the boundary between revision and path is not
//! syntactic. Every `/`-delimited prefix is tried as a revision, longest first, and the
//! first one that resolves wins.

use crate::core::{FailureReason, RefscopeError, RequestFailure, Result};
use crate::git::{ObjectId, ObjectKind, RepositoryStore, is_hex_abbreviation, split_relative_suffix};
use crate::view::Revision;

/// Revisions and path found at the front of a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionSplit {
    pub revision: Revision,
    pub old_revision: Revision,
    /// Path after the revision; `None` when the revision consumed everything.
    pub path: Option<String>,
    /// Whether the revision was written as a diff (`a..b` or `x^!`).
    pub is_diff: bool,
}

/// Resolves revision names against one repository.
pub struct RevisionParser<'a> {
    store: &'a dyn RepositoryStore,
}

fn has_unsupported_syntax(candidate: &str) -> bool {
    candidate.contains(':') || candidate.contains("@{")
}

impl<'a> RevisionParser<'a> {
    #[must_use]
    pub fn new(store: &'a dyn RepositoryStore) -> Self {
        Self {
            store,
        }
    }

    /// Find the longest revision prefix of `rest` and the path after it.
    ///
    /// With `allow_ranges`, `a..b` and `x^!` are accepted as diff revisions.
    pub async fn split(
        &self,
        rest: &str,
        allow_ranges: bool,
    ) -> std::result::Result<RevisionSplit, RequestFailure> {
        for (candidate, path) in candidates(rest) {
            let parsed = if allow_ranges {
                self.parse_diff(candidate).await?
            } else {
                None
            };
            let parsed = match parsed {
                Some(found) => Some(found),
                None => self.parse_revision(candidate).await?.map(|r| (r, Revision::NULL, false)),
            };
            if let Some((revision, old_revision, is_diff)) = parsed {
                tracing::debug!(
                    target: "resolver",
                    "revision '{}' resolved to {:?}, path {:?}",
                    candidate,
                    revision.id(),
                    path
                );
                return Ok(RevisionSplit {
                    revision,
                    old_revision,
                    path: path.map(|p| p.trim_end_matches('/').to_string()),
                    is_diff,
                });
            }
        }

        let first_segment = rest.split('/').next().unwrap_or_default();
        if has_unsupported_syntax(first_segment) {
            return Err(RequestFailure::with_message(
                FailureReason::UnsupportedRevisionNames,
                first_segment.to_string(),
            ));
        }
        Err(RequestFailure::with_message(
            FailureReason::CannotParseView,
            format!("no revision found in '{rest}'"),
        ))
    }

    /// Resolve `a..b` or `x^!`. Plain revisions yield `Ok(None)`.
    async fn parse_diff(&self, candidate: &str) -> Result<Option<(Revision, Revision, bool)>> {
        if candidate.contains("...") {
            return Ok(None);
        }
        if let Some((old, new)) = candidate.split_once("..") {
            if old.is_empty() || new.is_empty() {
                return Ok(None);
            }
            let Some(old_revision) = self.parse_revision(old).await? else {
                return Ok(None);
            };
            let Some(revision) = self.parse_revision(new).await? else {
                return Ok(None);
            };
            return Ok(Some((revision, old_revision, true)));
        }
        if let Some(base) = candidate.strip_suffix("^!") {
            let Some(revision) = self.parse_revision(base).await? else {
                return Ok(None);
            };
            let old_revision = self.first_parent(base, &revision).await?;
            return Ok(Some((revision, old_revision, true)));
        }
        Ok(None)
    }

    async fn first_parent(&self, base: &str, revision: &Revision) -> Result<Revision> {
        let Some(id) = revision.peeled_id() else {
            return Ok(Revision::NULL);
        };
        if revision.peeled_kind() != Some(ObjectKind::Commit) {
            return Ok(Revision::NULL);
        }
        let parent = self.store.commit(&id).await?.and_then(|c| c.parents.first().copied());
        Ok(match parent {
            Some(parent) => Revision::new(format!("{base}^"), parent, ObjectKind::Commit),
            None => Revision::NULL,
        })
    }

    /// Resolve a single revision name, possibly with a relative suffix.
    ///
    /// Precedence for the base name: `refs/<name>` (or the name itself under `refs/`),
    /// then `refs/tags/<name>`, then `refs/heads/<name>`, then a hex object id.
    pub async fn parse_revision(&self, candidate: &str) -> Result<Option<Revision>> {
        if candidate.is_empty() || has_unsupported_syntax(candidate) || candidate.contains("..") {
            return Ok(None);
        }
        let (base, suffix) = split_relative_suffix(candidate);
        if base.is_empty() {
            return Ok(None);
        }

        let full = if base.starts_with("refs/") {
            base.to_string()
        } else {
            format!("refs/{base}")
        };
        let ref_names = [full, format!("refs/tags/{base}"), format!("refs/heads/{base}")];
        for ref_name in &ref_names {
            if let Some(r) = self.store.exact_ref(ref_name).await? {
                let id = if suffix.is_empty() {
                    Some(r.id)
                } else {
                    self.store.resolve(&format!("{}{suffix}", r.name)).await?
                };
                return match id {
                    Some(id) => self.describe(candidate, id).await,
                    None => Ok(None),
                };
            }
            if base.starts_with("refs/") {
                break;
            }
        }

        if is_hex_abbreviation(base) {
            if let Some(id) = self.store.resolve(candidate).await? {
                return self.describe(candidate, id).await;
            }
        }
        Ok(None)
    }

    /// Bind `name` to `id`, peeling annotated tags.
    pub async fn describe(&self, name: &str, id: ObjectId) -> Result<Option<Revision>> {
        let Some(kind) = self.store.object_kind(&id).await? else {
            return Ok(None);
        };
        if kind != ObjectKind::Tag {
            return Ok(Some(Revision::new(name, id, kind)));
        }
        let peeled = self.store.peel(&id).await?;
        let peeled_kind =
            self.store.object_kind(&peeled).await?.ok_or_else(|| RefscopeError::ObjectNotFound {
                id: peeled.to_hex(),
            })?;
        Ok(Some(Revision::peeled(name, id, kind, peeled, peeled_kind)))
    }
}

/// `(revision candidate, path)` pairs for `rest`, longest candidate first.
pub(crate) fn candidates(rest: &str) -> Vec<(&str, Option<&str>)> {
    let mut out = Vec::new();
    if !rest.is_empty() && !rest.ends_with('/') {
        out.push((rest, None));
    }
    for (index, _) in rest.match_indices('/').collect::<Vec<_>>().into_iter().rev() {
        if index == 0 {
            continue;
        }
        out.push((&rest[..index], Some(&rest[index + 1..])));
    }
    out
}
