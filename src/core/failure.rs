//! Typed request failures.
//!
//! Resolution and disclosure checks report failures as values carrying a
//! [`FailureReason`]; each reason has a fixed [`StatusClass`] so the transport layer can
//! map it to a response code without inspecting messages.

use serde::Serialize;
use std::fmt;

use super::error::RefscopeError;

/// Externally visible status class of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    NotFound,
    BadRequest,
    Internal,
}

impl StatusClass {
    /// HTTP status code conventionally used for this class.
    #[must_use]
    pub const fn http_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::BadRequest => 400,
            Self::Internal => 500,
        }
    }
}

/// Why a request could not be turned into a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    /// The path does not match the URL grammar, or no revision could be found in it.
    CannotParseView,
    /// An abbreviated object id matched more than one object.
    AmbiguousObject,
    /// The named repository does not exist.
    RepositoryNotFound,
    /// The revision uses syntax that is deliberately not supported (`:`, `@{...}`).
    UnsupportedRevisionNames,
    /// The object exists but may not be shown, or does not exist at all.
    ObjectNotFound,
    /// A query parameter has a value that is not recognized.
    IncorrectParameter,
    /// The requested format is valid but not offered by this kind of view.
    UnsupportedFormat,
    /// The object store failed underneath the request.
    Internal,
}

impl FailureReason {
    /// Status class the transport layer should answer with.
    #[must_use]
    pub const fn status(self) -> StatusClass {
        match self {
            Self::CannotParseView
            | Self::AmbiguousObject
            | Self::RepositoryNotFound
            | Self::UnsupportedRevisionNames
            | Self::ObjectNotFound => StatusClass::NotFound,
            Self::IncorrectParameter | Self::UnsupportedFormat => StatusClass::BadRequest,
            Self::Internal => StatusClass::Internal,
        }
    }

    const fn describe(self) -> &'static str {
        match self {
            Self::CannotParseView => "cannot parse view",
            Self::AmbiguousObject => "ambiguous object",
            Self::RepositoryNotFound => "repository not found",
            Self::UnsupportedRevisionNames => "unsupported revision names",
            Self::ObjectNotFound => "object not found",
            Self::IncorrectParameter => "incorrect parameter",
            Self::UnsupportedFormat => "unsupported format",
            Self::Internal => "internal error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A request-level failure: a reason plus an optional human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestFailure {
    pub reason: FailureReason,
    pub message: Option<String>,
}

impl RequestFailure {
    #[must_use]
    pub const fn new(reason: FailureReason) -> Self {
        Self {
            reason,
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: Some(message.into()),
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusClass {
        self.reason.status()
    }
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

impl std::error::Error for RequestFailure {}

impl From<RefscopeError> for RequestFailure {
    fn from(error: RefscopeError) -> Self {
        match error {
            RefscopeError::AmbiguousObject {
                spec,
            } => Self::with_message(FailureReason::AmbiguousObject, spec),
            RefscopeError::RepositoryNotFound {
                name,
            } => Self::with_message(FailureReason::RepositoryNotFound, name),
            RefscopeError::ObjectNotFound {
                id,
            } => Self::with_message(FailureReason::ObjectNotFound, id),
            other => Self::with_message(FailureReason::Internal, other.to_string()),
        }
    }
}
