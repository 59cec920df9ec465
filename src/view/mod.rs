//! Typed, immutable views of a repository.
//!
//! A [`View`] is what a request resolves to: which repository, which revision (or pair
//! of revisions), which path, and which output format. Views are only built through
//! [`ViewBuilder`], which checks that each [`ViewType`] carries the fields it needs, and
//! render back to a canonical URL with [`View::to_url`].
//!
//! # Examples
//!
//! ```rust
//! use refscope::git::{ObjectId, ObjectKind};
//! use refscope::view::{Revision, View, ViewType};
//!
//! # fn example() -> refscope::core::Result<()> {
//! let id = ObjectId::from_bytes([7; 20]);
//! let view = View::builder(ViewType::Path)
//!     .servlet_path("/b")
//!     .repository_name("platform/build")
//!     .revision(Revision::new("main", id, ObjectKind::Commit))
//!     .path_part("docs/index.md")
//!     .build()?;
//! assert_eq!(view.to_url(), "/b/platform/build/+/main/docs/index.md");
//! # Ok(())
//! # }
//! ```

pub mod escape;
pub mod format;
pub mod revision;
pub mod view_type;

pub use format::FormatType;
pub use revision::Revision;
pub use view_type::{FormatRow, ViewType};

use serde::Serialize;

use crate::constants::FORMAT_PARAM;
use crate::core::{RefscopeError, Result};
use escape::{escape_path, escape_query};

/// Paths that `+/` shows as rendered documents rather than as files.
#[must_use]
pub fn is_markdown_path(path: &str) -> bool {
    path.ends_with(".md")
}

/// A resolved request. Immutable; derive variants with [`ViewBuilder::copy_from`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    view_type: ViewType,
    host_name: String,
    servlet_path: String,
    repository_name: String,
    revision: Revision,
    old_revision: Revision,
    path_part: Option<String>,
    extension: Option<String>,
    host_name_in_path: Option<String>,
    format: FormatType,
    params: Vec<(String, String)>,
}

impl View {
    #[must_use]
    pub fn builder(view_type: ViewType) -> ViewBuilder {
        ViewBuilder::new(view_type)
    }

    #[must_use]
    pub const fn view_type(&self) -> ViewType {
        self.view_type
    }

    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    #[must_use]
    pub fn servlet_path(&self) -> &str {
        &self.servlet_path
    }

    #[must_use]
    pub fn repository_name(&self) -> &str {
        &self.repository_name
    }

    #[must_use]
    pub const fn revision(&self) -> &Revision {
        &self.revision
    }

    #[must_use]
    pub const fn old_revision(&self) -> &Revision {
        &self.old_revision
    }

    #[must_use]
    pub fn path_part(&self) -> Option<&str> {
        self.path_part.as_deref()
    }

    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    #[must_use]
    pub fn host_name_in_path(&self) -> Option<&str> {
        self.host_name_in_path.as_deref()
    }

    /// The format as requested, possibly [`FormatType::Default`].
    #[must_use]
    pub const fn requested_format(&self) -> FormatType {
        self.format
    }

    /// The format the view renders in once `Default` is replaced by the type's default.
    #[must_use]
    pub fn format(&self) -> FormatType {
        match self.format {
            FormatType::Default => self.view_type.default_format(),
            format => format,
        }
    }

    /// Query parameters other than `format`, in the order they were given.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// First value of a query parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// Render the canonical URL of this view.
    #[must_use]
    pub fn to_url(&self) -> String {
        let mut url = self.servlet_path.trim_end_matches('/').to_string();
        url.push('/');

        match self.view_type {
            ViewType::HostIndex => {}
            ViewType::RepositoryIndex => {
                self.push_repository(&mut url);
                url.push('/');
            }
            ViewType::Refs => {
                self.push_command(&mut url, "refs");
                self.push_optional_path(&mut url);
            }
            ViewType::Describe => {
                self.push_command(&mut url, "describe");
                url.push('/');
                url.push_str(&escape_path(self.path_part.as_deref().unwrap_or_default()));
            }
            ViewType::Revision => {
                self.push_command(&mut url, "");
                url.push('/');
                url.push_str(&escape_path(self.revision.name()));
            }
            ViewType::Path | ViewType::Blame | ViewType::Doc => {
                let path = self.path_part.as_deref().unwrap_or_default();
                let command = match self.view_type {
                    ViewType::Blame => "blame",
                    ViewType::Doc => "doc",
                    // `+/` would render this path as a document
                    _ if is_markdown_path(path) => "show",
                    _ => "",
                };
                self.push_command(&mut url, command);
                url.push('/');
                url.push_str(&escape_path(self.revision.name()));
                url.push('/');
                url.push_str(&escape_path(path));
            }
            ViewType::Diff => {
                if self.old_revision.is_null() {
                    self.push_command(&mut url, "diff");
                    url.push('/');
                    url.push_str(&escape_path(self.revision.name()));
                } else if self.old_revision.name() == format!("{}^", self.revision.name()) {
                    self.push_command(&mut url, "");
                    url.push('/');
                    url.push_str(&escape_path(self.revision.name()));
                    url.push_str("^!");
                } else {
                    self.push_command(&mut url, "");
                    url.push('/');
                    self.push_range(&mut url);
                }
                url.push('/');
                url.push_str(&escape_path(self.path_part.as_deref().unwrap_or_default()));
            }
            ViewType::Log => {
                self.push_command(&mut url, "log");
                if !self.revision.is_null() {
                    url.push('/');
                    if self.old_revision.is_null() {
                        url.push_str(&escape_path(self.revision.name()));
                    } else {
                        self.push_range(&mut url);
                    }
                }
                self.push_optional_path(&mut url);
            }
            ViewType::Archive => {
                self.push_command(&mut url, "archive");
                url.push('/');
                url.push_str(&escape_path(self.revision.name()));
                self.push_optional_path(&mut url);
                url.push_str(&escape_path(self.extension.as_deref().unwrap_or_default()));
            }
            ViewType::RawContent => {
                url.push_str(&escape_path(self.host_name_in_path.as_deref().unwrap_or_default()));
                url.push('/');
                self.push_command(&mut url, "");
                url.push('/');
                url.push_str(&escape_path(self.revision.name()));
                url.push('/');
                url.push_str(&escape_path(self.path_part.as_deref().unwrap_or_default()));
            }
        }

        self.push_query(&mut url);
        url
    }

    fn push_repository(&self, url: &mut String) {
        url.push_str(&escape_path(&self.repository_name));
    }

    fn push_command(&self, url: &mut String, command: &str) {
        self.push_repository(url);
        url.push_str("/+");
        url.push_str(command);
    }

    fn push_range(&self, url: &mut String) {
        url.push_str(&escape_path(self.old_revision.name()));
        url.push_str("..");
        url.push_str(&escape_path(self.revision.name()));
    }

    fn push_optional_path(&self, url: &mut String) {
        if let Some(path) = self.path_part.as_deref().filter(|p| !p.is_empty()) {
            url.push('/');
            url.push_str(&escape_path(path));
        }
    }

    fn push_query(&self, url: &mut String) {
        let mut separator = '?';
        if self.format != FormatType::Default {
            url.push(separator);
            url.push_str(FORMAT_PARAM);
            url.push('=');
            url.push_str(self.format.as_str());
            separator = '&';
        }
        for (key, value) in &self.params {
            url.push(separator);
            url.push_str(&escape_query(key));
            url.push('=');
            url.push_str(&escape_query(value));
            separator = '&';
        }
    }
}

/// Builder for [`View`].
#[derive(Debug, Clone)]
pub struct ViewBuilder {
    view: View,
}

impl ViewBuilder {
    #[must_use]
    pub fn new(view_type: ViewType) -> Self {
        Self {
            view: View {
                view_type,
                host_name: String::new(),
                servlet_path: String::new(),
                repository_name: String::new(),
                revision: Revision::NULL,
                old_revision: Revision::NULL,
                path_part: None,
                extension: None,
                host_name_in_path: None,
                format: FormatType::Default,
                params: Vec::new(),
            },
        }
    }

    /// Start from every field of an existing view.
    #[must_use]
    pub fn copy_from(view: &View) -> Self {
        Self {
            view: view.clone(),
        }
    }

    #[must_use]
    pub const fn view_type(mut self, view_type: ViewType) -> Self {
        self.view.view_type = view_type;
        self
    }

    #[must_use]
    pub fn host_name(mut self, host_name: impl Into<String>) -> Self {
        self.view.host_name = host_name.into();
        self
    }

    #[must_use]
    pub fn servlet_path(mut self, servlet_path: impl Into<String>) -> Self {
        self.view.servlet_path = servlet_path.into();
        self
    }

    #[must_use]
    pub fn repository_name(mut self, name: impl Into<String>) -> Self {
        self.view.repository_name = name.into();
        self
    }

    #[must_use]
    pub fn revision(mut self, revision: Revision) -> Self {
        self.view.revision = revision;
        self
    }

    #[must_use]
    pub fn old_revision(mut self, revision: Revision) -> Self {
        self.view.old_revision = revision;
        self
    }

    #[must_use]
    pub fn path_part(mut self, path: impl Into<String>) -> Self {
        self.view.path_part = Some(path.into());
        self
    }

    #[must_use]
    pub fn clear_path_part(mut self) -> Self {
        self.view.path_part = None;
        self
    }

    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.view.extension = Some(extension.into());
        self
    }

    #[must_use]
    pub fn host_name_in_path(mut self, host: impl Into<String>) -> Self {
        self.view.host_name_in_path = Some(host.into());
        self
    }

    #[must_use]
    pub const fn format(mut self, format: FormatType) -> Self {
        self.view.format = format;
        self
    }

    /// Append a query parameter. `format` is carried separately; see [`Self::format`].
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.view.params.push((key.into(), value.into()));
        self
    }

    /// Drop every value of a query parameter.
    #[must_use]
    pub fn remove_param(mut self, key: &str) -> Self {
        self.view.params.retain(|(k, _)| k != key);
        self
    }

    #[must_use]
    pub fn clear_params(mut self) -> Self {
        self.view.params.clear();
        self
    }

    #[must_use]
    pub const fn current_view_type(&self) -> ViewType {
        self.view.view_type
    }

    #[must_use]
    pub const fn current_format(&self) -> FormatType {
        self.view.format
    }

    /// Validate and produce the view.
    pub fn build(self) -> Result<View> {
        let view = self.view;
        let view_type = view.view_type;
        let invalid = |reason: &str| RefscopeError::InvalidView {
            reason: format!("{view_type:?}: {reason}"),
        };

        if view_type != ViewType::HostIndex && view.repository_name.is_empty() {
            return Err(invalid("repository name is required"));
        }
        if view_type.needs_revision() && view.revision.is_null() {
            return Err(invalid("revision is required"));
        }
        if !view_type.allows_old_revision() && !view.old_revision.is_null() {
            return Err(invalid("old revision is not allowed"));
        }
        if view_type == ViewType::Log && view.revision.is_null() {
            if !view.old_revision.is_null() {
                return Err(invalid("old revision without a revision"));
            }
            if view.path_part.as_deref().is_some_and(|p| !p.is_empty()) {
                return Err(invalid("path without a revision"));
            }
        }
        if view_type.needs_path() && view.path_part.is_none() {
            return Err(invalid("path is required"));
        }
        if matches!(view_type, ViewType::Describe | ViewType::Blame | ViewType::RawContent)
            && view.path_part.as_deref().is_some_and(str::is_empty)
        {
            return Err(invalid("path must not be empty"));
        }
        if matches!(
            view_type,
            ViewType::HostIndex | ViewType::RepositoryIndex | ViewType::Revision
        ) && view.path_part.is_some()
        {
            return Err(invalid("path is not allowed"));
        }
        if view_type == ViewType::Archive && view.extension.as_deref().is_none_or(str::is_empty) {
            return Err(invalid("archive extension is required"));
        }
        if view_type == ViewType::RawContent
            && view.host_name_in_path.as_deref().is_none_or(str::is_empty)
        {
            return Err(invalid("host name in path is required"));
        }
        if !view_type.accepts(view.format) {
            return Err(invalid(&format!("format {} is not offered", view.format)));
        }

        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::{ObjectId, ObjectKind};

    fn commit(name: &str, byte: u8) -> Revision {
        Revision::new(name, ObjectId::from_bytes([byte; 20]), ObjectKind::Commit)
    }

    fn base(view_type: ViewType) -> ViewBuilder {
        View::builder(view_type).servlet_path("/b").host_name("host").repository_name("repo")
    }

    #[test]
    fn test_host_and_repository_index_urls() {
        let host = View::builder(ViewType::HostIndex).servlet_path("/b").build().unwrap();
        assert_eq!(host.to_url(), "/b/");
        let repo = base(ViewType::RepositoryIndex).build().unwrap();
        assert_eq!(repo.to_url(), "/b/repo/");
    }

    #[test]
    fn test_revision_and_path_urls() {
        let rev = base(ViewType::Revision).revision(commit("main", 1)).build().unwrap();
        assert_eq!(rev.to_url(), "/b/repo/+/main");

        let root = base(ViewType::Path).revision(commit("main", 1)).path_part("").build().unwrap();
        assert_eq!(root.to_url(), "/b/repo/+/main/");

        let file = base(ViewType::Path)
            .revision(commit("main", 1))
            .path_part("src/lib.rs")
            .build()
            .unwrap();
        assert_eq!(file.to_url(), "/b/repo/+/main/src/lib.rs");
    }

    #[test]
    fn test_diff_urls() {
        let range = base(ViewType::Diff)
            .revision(commit("b", 2))
            .old_revision(commit("a", 1))
            .path_part("")
            .build()
            .unwrap();
        assert_eq!(range.to_url(), "/b/repo/+/a..b/");

        let parent = base(ViewType::Diff)
            .revision(commit("main", 2))
            .old_revision(commit("main^", 1))
            .path_part("f")
            .build()
            .unwrap();
        assert_eq!(parent.to_url(), "/b/repo/+/main^!/f");

        let unrelated = base(ViewType::Diff)
            .revision(commit("main", 2))
            .old_revision(commit("stable", 1))
            .path_part("f")
            .build()
            .unwrap();
        assert_eq!(unrelated.to_url(), "/b/repo/+/stable..main/f");
    }

    #[test]
    fn test_diff_without_old_revision_uses_diff_command() {
        let root = base(ViewType::Diff).revision(commit("main", 2)).path_part("f").build().unwrap();
        assert_eq!(root.to_url(), "/b/repo/+diff/main/f");
        let whole = base(ViewType::Diff).revision(commit("main", 2)).path_part("").build().unwrap();
        assert_eq!(whole.to_url(), "/b/repo/+diff/main/");
    }

    #[test]
    fn test_markdown_path_view_uses_show_command() {
        let md = base(ViewType::Path)
            .revision(commit("main", 1))
            .path_part("docs/index.md")
            .build()
            .unwrap();
        assert_eq!(md.to_url(), "/b/repo/+show/main/docs/index.md");
        let doc = base(ViewType::Doc)
            .revision(commit("main", 1))
            .path_part("docs/index.md")
            .build()
            .unwrap();
        assert_eq!(doc.to_url(), "/b/repo/+doc/main/docs/index.md");
    }

    #[test]
    fn test_log_urls() {
        let all = base(ViewType::Log).build().unwrap();
        assert_eq!(all.to_url(), "/b/repo/+log");
        let ranged = base(ViewType::Log)
            .revision(commit("b", 2))
            .old_revision(commit("a", 1))
            .path_part("dir")
            .build()
            .unwrap();
        assert_eq!(ranged.to_url(), "/b/repo/+log/a..b/dir");
        let no_path = base(ViewType::Log).revision(commit("main", 2)).path_part("").build().unwrap();
        assert_eq!(no_path.to_url(), "/b/repo/+log/main");
    }

    #[test]
    fn test_archive_blame_doc_refs_describe_urls() {
        let archive = base(ViewType::Archive)
            .revision(commit("main", 1))
            .extension(".tar.gz")
            .build()
            .unwrap();
        assert_eq!(archive.to_url(), "/b/repo/+archive/main.tar.gz");
        let sub = base(ViewType::Archive)
            .revision(commit("main", 1))
            .path_part("dir")
            .extension(".tgz")
            .build()
            .unwrap();
        assert_eq!(sub.to_url(), "/b/repo/+archive/main/dir.tgz");

        let blame =
            base(ViewType::Blame).revision(commit("main", 1)).path_part("a.c").build().unwrap();
        assert_eq!(blame.to_url(), "/b/repo/+blame/main/a.c");

        let doc = base(ViewType::Doc).revision(commit("main", 1)).path_part("README.md").build().unwrap();
        assert_eq!(doc.to_url(), "/b/repo/+doc/main/README.md");

        let refs = base(ViewType::Refs).path_part("heads").build().unwrap();
        assert_eq!(refs.to_url(), "/b/repo/+refs/heads");
        let all_refs = base(ViewType::Refs).build().unwrap();
        assert_eq!(all_refs.to_url(), "/b/repo/+refs");

        let describe = base(ViewType::Describe).path_part("deadbeef").build().unwrap();
        assert_eq!(describe.to_url(), "/b/repo/+describe/deadbeef");
    }

    #[test]
    fn test_raw_content_url_includes_host() {
        let raw = base(ViewType::RawContent)
            .host_name_in_path("git.example.com")
            .revision(commit("main", 1))
            .path_part("bin/tool")
            .build()
            .unwrap();
        assert_eq!(raw.to_url(), "/b/git.example.com/repo/+/main/bin/tool");
    }

    #[test]
    fn test_query_rendering() {
        let view = base(ViewType::Revision)
            .revision(commit("main", 1))
            .format(FormatType::Json)
            .param("s", "a b")
            .param("n", "2")
            .build()
            .unwrap();
        assert_eq!(view.to_url(), "/b/repo/+/main?format=JSON&s=a%20b&n=2");
        assert_eq!(view.param("n"), Some("2"));
        assert_eq!(view.format(), FormatType::Json);
    }

    #[test]
    fn test_default_format_resolves_per_type() {
        let view = base(ViewType::Describe).path_part("x").build().unwrap();
        assert_eq!(view.requested_format(), FormatType::Default);
        assert_eq!(view.format(), FormatType::Text);
    }

    #[test]
    fn test_build_rejects_missing_fields() {
        assert!(View::builder(ViewType::RepositoryIndex).build().is_err());
        assert!(base(ViewType::Path).path_part("x").build().is_err());
        assert!(base(ViewType::Blame).revision(commit("m", 1)).build().is_err());
        assert!(base(ViewType::Archive).revision(commit("m", 1)).build().is_err());
        assert!(
            base(ViewType::Revision)
                .revision(commit("m", 1))
                .old_revision(commit("o", 2))
                .build()
                .is_err()
        );
        assert!(
            base(ViewType::Doc)
                .revision(commit("m", 1))
                .path_part("a.md")
                .format(FormatType::Json)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_copy_from_changes_only_what_is_set() {
        let path = base(ViewType::Path).revision(commit("main", 1)).path_part("f").build().unwrap();
        let raw = ViewBuilder::copy_from(&path)
            .view_type(ViewType::RawContent)
            .host_name_in_path("host")
            .build()
            .unwrap();
        assert_eq!(raw.revision(), path.revision());
        assert_eq!(raw.path_part(), Some("f"));
        assert_eq!(raw.view_type(), ViewType::RawContent);
    }
}
