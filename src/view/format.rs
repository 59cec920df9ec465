//! Output formats a view can be rendered in.

use serde::Serialize;
use std::fmt;

/// Requested output format.
///
/// `Default` means "whatever the view type prefers"; see
/// [`ViewType::default_format`](super::ViewType::default_format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FormatType {
    Html,
    Text,
    Json,
    Default,
}

impl FormatType {
    /// Parse a `format` query value, ignoring ASCII case.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "html" => Some(Self::Html),
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "default" => Some(Self::Default),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "HTML",
            Self::Text => "TEXT",
            Self::Json => "JSON",
            Self::Default => "DEFAULT",
        }
    }

    /// Formats consumed by people in a browser; these may be redirected.
    #[must_use]
    pub const fn is_interactive(self) -> bool {
        matches!(self, Self::Html | Self::Default)
    }
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
