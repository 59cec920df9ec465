//! The kinds of view a request can resolve to, and what each one can be rendered as.

use serde::Serialize;

use super::format::FormatType;

/// What a request is asking to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewType {
    HostIndex,
    RepositoryIndex,
    Refs,
    Describe,
    Revision,
    Path,
    Doc,
    Diff,
    Log,
    Archive,
    Blame,
    RawContent,
}

/// Row of the format table: formats a type accepts and the one it uses when asked for
/// [`FormatType::Default`].
#[derive(Debug, Clone, Copy)]
pub struct FormatRow {
    pub allowed: &'static [FormatType],
    pub default: FormatType,
}

const HTML_TEXT_JSON: &[FormatType] = &[FormatType::Html, FormatType::Text, FormatType::Json];
const HTML_JSON: &[FormatType] = &[FormatType::Html, FormatType::Json];
const TEXT_JSON: &[FormatType] = &[FormatType::Text, FormatType::Json];
const HTML_ONLY: &[FormatType] = &[FormatType::Html];
const NONE: &[FormatType] = &[];

impl ViewType {
    /// Every view type, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::HostIndex,
        Self::RepositoryIndex,
        Self::Refs,
        Self::Describe,
        Self::Revision,
        Self::Path,
        Self::Doc,
        Self::Diff,
        Self::Log,
        Self::Archive,
        Self::Blame,
        Self::RawContent,
    ];

    #[must_use]
    pub const fn formats(self) -> FormatRow {
        let (allowed, default) = match self {
            Self::HostIndex | Self::Refs | Self::Revision | Self::Path | Self::Diff | Self::Log => {
                (HTML_TEXT_JSON, FormatType::Html)
            }
            Self::RepositoryIndex | Self::Blame => (HTML_JSON, FormatType::Html),
            Self::Describe => (TEXT_JSON, FormatType::Text),
            Self::Doc => (HTML_ONLY, FormatType::Html),
            Self::Archive | Self::RawContent => (NONE, FormatType::Default),
        };
        FormatRow {
            allowed,
            default,
        }
    }

    #[must_use]
    pub const fn default_format(self) -> FormatType {
        self.formats().default
    }

    /// Whether an explicit `format` of `format` is acceptable for this type.
    ///
    /// [`FormatType::Default`] is always acceptable.
    #[must_use]
    pub fn accepts(self, format: FormatType) -> bool {
        format == FormatType::Default || self.formats().allowed.contains(&format)
    }

    /// Whether views of this type carry a revision.
    #[must_use]
    pub const fn needs_revision(self) -> bool {
        matches!(
            self,
            Self::Revision
                | Self::Path
                | Self::Doc
                | Self::Diff
                | Self::Archive
                | Self::Blame
                | Self::RawContent
        )
    }

    /// Whether views of this type carry a path.
    #[must_use]
    pub const fn needs_path(self) -> bool {
        matches!(
            self,
            Self::Path | Self::Doc | Self::Blame | Self::RawContent | Self::Describe
        )
    }

    /// Whether views of this type may carry an old revision.
    #[must_use]
    pub const fn allows_old_revision(self) -> bool {
        matches!(self, Self::Diff | Self::Log)
    }
}
