//! Turning request paths into [`View`]s.
//!
//! The URL grammar, below the servlet path, is:
//!
//! ```text
//! /                                  host index
//! /<repo>/                           repository index
//! /<repo>/+<command>[/<rest>]        everything else
//! ```
//!
//! On the raw content host the first path segment is the host the link was created on
//! and is peeled off before anything else.
//!
//! | Command    | Rest                          | View type                   |
//! |------------|-------------------------------|-----------------------------|
//! | (empty)    | `rev[/path]`, `a..b`, `x^!`   | Revision, Path, Doc, Diff   |
//! | `show`     | `rev[/path]`                  | Revision, Path              |
//! | `doc`      | `rev[/path]`                  | Doc                         |
//! | `log`      | `[[a..]b[/path]]`             | Log                         |
//! | `diff`     | `a..b[/path]`, `x^!`, `x`     | Diff                        |
//! | `refs`     | `[prefix]`                    | Refs                        |
//! | `describe` | `expr`                        | Describe                    |
//! | `archive`  | `rev[/path].ext`              | Archive                     |
//! | `blame`    | `rev/path`                    | Blame                       |
//!
//! The split between `rev` and `path` is ambiguous because ref names may contain `/`;
//! [`RevisionParser`] resolves it by trying the longest prefix first.
//!
//! After the view is built two rewrites may apply: a configured [`BranchRedirect`], and
//! normalization of relative revisions (`main~2`) to the commit they name. Both answer
//! interactive requests with [`Resolution::Redirect`] and automation requests with the
//! rewritten view. Names that resolve to nothing at all (a branch deleted after being
//! renamed) are offered to the branch redirect while splitting, so they take the same
//! route.

pub mod branch_redirect;
pub mod request;
pub mod revision_parser;

pub use branch_redirect::{BranchRedirect, MapBranchRedirect, NoBranchRedirect, guess_full_ref_name};
pub use request::ViewRequest;
pub use revision_parser::{RevisionParser, RevisionSplit};

use std::sync::Arc;

use crate::constants::FORMAT_PARAM;
use crate::core::{FailureReason, RequestFailure};
use crate::git::{RepositoryProvider, RepositoryStore, split_relative_suffix};
use crate::view::{FormatType, Revision, View, ViewBuilder, ViewType, is_markdown_path};

/// Extensions accepted by `+archive`, longest match first.
pub const ARCHIVE_EXTENSIONS: &[&str] =
    &[".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tbz", ".tar.xz", ".txz", ".tar"];

type Failed<T> = std::result::Result<T, RequestFailure>;

/// What a request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    View(View),
    /// Send the client to this URL instead.
    Redirect(String),
}

fn cannot_parse(message: impl Into<String>) -> RequestFailure {
    RequestFailure::with_message(FailureReason::CannotParseView, message)
}

/// Resolves [`ViewRequest`]s against a set of repositories.
pub struct ViewResolver {
    repositories: Arc<dyn RepositoryProvider>,
    raw_file_host_name: Option<String>,
    branch_redirect: Arc<dyn BranchRedirect>,
}

impl ViewResolver {
    #[must_use]
    pub fn new(repositories: Arc<dyn RepositoryProvider>) -> Self {
        Self {
            repositories,
            raw_file_host_name: None,
            branch_redirect: Arc::new(NoBranchRedirect),
        }
    }

    /// Serve raw content from `host`; requests to it carry the origin host in the path.
    #[must_use]
    pub fn with_raw_file_host(mut self, host: impl Into<String>) -> Self {
        self.raw_file_host_name = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_branch_redirect(mut self, redirect: Arc<dyn BranchRedirect>) -> Self {
        self.branch_redirect = redirect;
        self
    }

    #[must_use]
    pub fn repositories(&self) -> &Arc<dyn RepositoryProvider> {
        &self.repositories
    }

    #[must_use]
    pub fn is_raw_domain(&self, host: &str) -> bool {
        self.raw_file_host_name.as_deref().is_some_and(|raw| raw.eq_ignore_ascii_case(host))
    }

    /// Open a repository or fail with [`FailureReason::RepositoryNotFound`].
    pub async fn open(&self, name: &str) -> Failed<Arc<dyn RepositoryStore>> {
        self.repositories.open(name).await?.ok_or_else(|| {
            RequestFailure::with_message(FailureReason::RepositoryNotFound, name.to_string())
        })
    }

    /// Resolve a request to a view or a redirect.
    pub async fn resolve(&self, request: &ViewRequest) -> Failed<Resolution> {
        let format = match request.param(FORMAT_PARAM) {
            None => FormatType::Default,
            Some(value) => FormatType::parse(value).ok_or_else(|| {
                RequestFailure::with_message(
                    FailureReason::IncorrectParameter,
                    format!("{FORMAT_PARAM}={value}"),
                )
            })?,
        };

        let mut path = request.path_info.trim_start_matches('/');
        let mut host_in_path = None;
        let raw_domain = self.is_raw_domain(&request.host_name);
        if raw_domain {
            let (host, rest) = path.split_once('/').unwrap_or((path, ""));
            if host.is_empty() {
                return Err(cannot_parse("raw content request without origin host"));
            }
            host_in_path = Some(host.to_string());
            path = rest;
        }

        let mut builder = ViewBuilder::new(ViewType::HostIndex)
            .host_name(request.host_name.clone())
            .servlet_path(request.servlet_path.clone())
            .format(format);
        for (key, value) in &request.params {
            if key != FORMAT_PARAM {
                builder = builder.param(key.clone(), value.clone());
            }
        }

        if path.trim_matches('/').is_empty() {
            return Self::finish(builder).map(Resolution::View);
        }

        let Some((repo_name, after_plus)) = split_at_command(path) else {
            let builder = builder
                .view_type(ViewType::RepositoryIndex)
                .repository_name(path.trim_matches('/'));
            let view = Self::finish(builder)?;
            self.open(view.repository_name()).await?;
            return Ok(Resolution::View(view));
        };

        let command_len =
            after_plus.bytes().take_while(u8::is_ascii_lowercase).count();
        let (command, remainder) = after_plus.split_at(command_len);
        let rest = match remainder {
            "" => None,
            r if r.starts_with('/') => Some(&r[1..]),
            _ => return Err(cannot_parse(format!("malformed command '+{after_plus}'"))),
        };
        if rest.is_some_and(|r| r.contains("//")) {
            return Err(cannot_parse("empty path segment"));
        }

        let store = self.open(repo_name).await?;
        tracing::debug!(target: "resolver", "repository '{}' command '+{}'", repo_name, command);

        let builder = builder.repository_name(repo_name);
        let parser = RevisionParser::new(store.as_ref());
        let mut redirected = false;
        let builder = match command {
            "" => {
                let (builder, r) = self.auto_view(&parser, repo_name, builder, rest, true).await?;
                redirected = r;
                builder
            }
            "show" => {
                let (builder, r) = self.auto_view(&parser, repo_name, builder, rest, false).await?;
                redirected = r;
                builder
            }
            "doc" => {
                let (split, r) = self.split(&parser, repo_name, required(rest)?, false).await?;
                redirected = r;
                builder
                    .view_type(ViewType::Doc)
                    .revision(split.revision)
                    .path_part(split.path.unwrap_or_default())
            }
            "log" => match rest.filter(|r| !r.is_empty()) {
                None => builder.view_type(ViewType::Log),
                Some(rest) => {
                    let (split, r) = self.split(&parser, repo_name, rest, true).await?;
                    redirected = r;
                    builder
                        .view_type(ViewType::Log)
                        .revision(split.revision)
                        .old_revision(split.old_revision)
                        .path_part(split.path.unwrap_or_default())
                }
            },
            "diff" => {
                let (split, r) = self.split(&parser, repo_name, required(rest)?, true).await?;
                redirected = r;
                builder
                    .view_type(ViewType::Diff)
                    .revision(split.revision)
                    .old_revision(split.old_revision)
                    .path_part(split.path.unwrap_or_default())
            }
            "refs" => {
                builder.view_type(ViewType::Refs).path_part(rest.unwrap_or_default().trim_matches('/'))
            }
            "describe" => {
                let expr = required(rest)?.trim_end_matches('/');
                if expr.is_empty() {
                    return Err(cannot_parse("+describe needs an expression"));
                }
                builder.view_type(ViewType::Describe).path_part(expr)
            }
            "archive" => {
                let rest = required(rest)?;
                let Some(extension) = ARCHIVE_EXTENSIONS.iter().find(|ext| rest.ends_with(*ext))
                else {
                    return Err(cannot_parse(format!("unknown archive extension in '{rest}'")));
                };
                let target = &rest[..rest.len() - extension.len()];
                if target.is_empty() || target.ends_with('/') {
                    return Err(cannot_parse(format!("malformed archive '{rest}'")));
                }
                let (split, r) = self.split(&parser, repo_name, target, false).await?;
                redirected = r;
                let builder = builder
                    .view_type(ViewType::Archive)
                    .revision(split.revision)
                    .extension(*extension);
                match split.path {
                    Some(path) => builder.path_part(path),
                    None => builder,
                }
            }
            "blame" => {
                let (split, r) = self.split(&parser, repo_name, required(rest)?, false).await?;
                redirected = r;
                match split.path.filter(|p| !p.is_empty()) {
                    Some(path) => builder.view_type(ViewType::Blame).revision(split.revision).path_part(path),
                    None => return Err(cannot_parse("+blame needs a path")),
                }
            }
            other => return Err(cannot_parse(format!("unknown command '+{other}'"))),
        };

        // Raw content is served as is, documents included
        let raw_view = match builder.current_view_type() {
            ViewType::Path => true,
            ViewType::Doc => command.is_empty(),
            _ => false,
        };
        let builder = match host_in_path {
            Some(host) if raw_view => builder.view_type(ViewType::RawContent).host_name_in_path(host),
            _ => builder,
        };
        let view = Self::finish(builder)?;

        let (mut view, mut rewritten) = match self.apply_branch_redirect(&parser, &view).await? {
            Some(view) => (view, true),
            None => (view, redirected),
        };

        if matches!(command, "" | "show") {
            if let Some(normalized) = normalize_relative(&view)? {
                view = normalized;
                rewritten = true;
            }
        }

        if rewritten && view.format().is_interactive() {
            tracing::debug!(target: "resolver", "redirecting to {}", view.to_url());
            return Ok(Resolution::Redirect(view.to_url()));
        }
        Ok(Resolution::View(view))
    }

    async fn auto_view(
        &self,
        parser: &RevisionParser<'_>,
        repository: &str,
        builder: ViewBuilder,
        rest: Option<&str>,
        allow_diff: bool,
    ) -> Failed<(ViewBuilder, bool)> {
        let rest = required(rest)?;
        let (split, redirected) = self.split(parser, repository, rest, allow_diff).await?;
        if split.is_diff {
            let builder = builder
                .view_type(ViewType::Diff)
                .revision(split.revision)
                .old_revision(split.old_revision)
                .path_part(split.path.unwrap_or_default());
            return Ok((builder, redirected));
        }
        let builder = builder.revision(split.revision);
        let builder = match split.path {
            None => builder.view_type(ViewType::Revision),
            Some(path) if allow_diff && is_markdown_path(&path) => {
                builder.view_type(ViewType::Doc).path_part(path)
            }
            Some(path) => builder.view_type(ViewType::Path).path_part(path),
        };
        Ok((builder, redirected))
    }

    /// Split `rest` into revisions and path. When no prefix resolves, prefixes the
    /// branch redirect policy remaps are retried under their new name.
    ///
    /// The flag is set when a remapped name was used.
    async fn split(
        &self,
        parser: &RevisionParser<'_>,
        repository: &str,
        rest: &str,
        allow_ranges: bool,
    ) -> Failed<(RevisionSplit, bool)> {
        let failure = match parser.split(rest, allow_ranges).await {
            Ok(split) => return Ok((split, false)),
            Err(failure) if failure.reason == FailureReason::CannotParseView => failure,
            Err(failure) => return Err(failure),
        };

        for (candidate, path) in revision_parser::candidates(rest) {
            let Some(rewritten) = self.redirect_expression(repository, candidate, allow_ranges)
            else {
                continue;
            };
            let retry = match path {
                Some(path) => format!("{rewritten}/{path}"),
                None => rewritten,
            };
            if let Ok(split) = parser.split(&retry, allow_ranges).await {
                tracing::debug!(target: "resolver", "unresolved '{}' remapped to '{}'", candidate, retry);
                return Ok((split, true));
            }
        }
        Err(failure)
    }

    /// Remap each side of `a..b`, the base of `x^!`, or a single revision.
    fn redirect_expression(
        &self,
        repository: &str,
        candidate: &str,
        allow_ranges: bool,
    ) -> Option<String> {
        if allow_ranges {
            if let Some((old, new)) = candidate.split_once("..") {
                let old_target = self.redirect_name(repository, old);
                let new_target = self.redirect_name(repository, new);
                if old_target.is_none() && new_target.is_none() {
                    return None;
                }
                return Some(format!(
                    "{}..{}",
                    old_target.unwrap_or_else(|| old.to_string()),
                    new_target.unwrap_or_else(|| new.to_string())
                ));
            }
            if let Some(base) = candidate.strip_suffix("^!") {
                return self.redirect_name(repository, base).map(|name| format!("{name}^!"));
            }
        }
        self.redirect_name(repository, candidate)
    }

    /// Full replacement for `name`, relative suffix kept, if the policy remaps its base.
    fn redirect_name(&self, repository: &str, name: &str) -> Option<String> {
        let (base, suffix) = split_relative_suffix(name);
        if base.is_empty() {
            return None;
        }
        let target = self.branch_redirect.redirect_branch(repository, base)?;
        Some(format!("{}{suffix}", guess_full_ref_name(&target)))
    }

    fn finish(builder: ViewBuilder) -> Failed<View> {
        let view_type = builder.current_view_type();
        let requested = builder.current_format();
        if !view_type.accepts(requested) {
            return Err(RequestFailure::with_message(
                FailureReason::UnsupportedFormat,
                format!("{requested} for {view_type:?}"),
            ));
        }
        builder.build().map_err(|e| cannot_parse(e.to_string()))
    }

    /// Rewrite revisions whose base name the branch redirect policy remaps.
    async fn apply_branch_redirect(
        &self,
        parser: &RevisionParser<'_>,
        view: &View,
    ) -> Failed<Option<View>> {
        let repository = view.repository_name();
        let revision = self.redirect_revision(parser, repository, view.revision()).await?;
        let old_revision = self.redirect_revision(parser, repository, view.old_revision()).await?;
        if revision.is_none() && old_revision.is_none() {
            return Ok(None);
        }

        let mut builder = ViewBuilder::copy_from(view);
        if let Some(revision) = revision {
            builder = builder.revision(revision);
        }
        if let Some(old_revision) = old_revision {
            builder = builder.old_revision(old_revision);
        }
        Self::finish(builder).map(Some)
    }

    async fn redirect_revision(
        &self,
        parser: &RevisionParser<'_>,
        repository: &str,
        revision: &Revision,
    ) -> Failed<Option<Revision>> {
        if revision.is_null() || revision.is_named_by_id() {
            return Ok(None);
        }
        let Some(name) = self.redirect_name(repository, revision.name()) else {
            return Ok(None);
        };
        let redirected = parser.parse_revision(&name).await?;
        if redirected.is_none() {
            tracing::debug!(
                target: "resolver",
                "branch redirect {} -> {} does not resolve in {}",
                revision.name(),
                name,
                repository
            );
        }
        Ok(redirected)
    }
}

fn required(rest: Option<&str>) -> Failed<&str> {
    rest.filter(|r| !r.is_empty()).ok_or_else(|| cannot_parse("missing revision"))
}

/// Split `path` at the first `/+` that follows a non-empty repository name.
fn split_at_command(path: &str) -> Option<(&str, &str)> {
    path.match_indices("/+").find_map(|(index, _)| {
        let repo = path[..index].trim_matches('/');
        (!repo.is_empty()).then(|| (repo, &path[index + 2..]))
    })
}

/// Replace a relatively named single revision by the commit id it resolved to.
fn normalize_relative(view: &View) -> Failed<Option<View>> {
    if !matches!(view.view_type(), ViewType::Revision | ViewType::Path | ViewType::Doc) {
        return Ok(None);
    }
    let revision = view.revision();
    if !revision.has_relative_suffix() {
        return Ok(None);
    }
    let (Some(id), Some(kind), Some(peeled_id), Some(peeled_kind)) =
        (revision.id(), revision.kind(), revision.peeled_id(), revision.peeled_kind())
    else {
        return Ok(None);
    };
    let named = Revision::peeled(id.to_hex(), id, kind, peeled_id, peeled_kind);
    ViewResolver::finish(ViewBuilder::copy_from(view).revision(named)).map(Some)
}
