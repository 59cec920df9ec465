//! Error handling for refscope
//!
//! This module provides the library error type and user-friendly error reporting for the
//! `refscope` command-line tool. The error system follows two rules:
//! 1. **Strongly-typed errors** for precise handling inside the library
//! 2. **User-friendly messages** with actionable suggestions at the CLI boundary
//!
//! # Architecture
//!
//! - [`RefscopeError`] - Enumerated failure cases for repository access, configuration,
//!   signing keys and graph walks
//! - [`ErrorContext`] - Wrapper that adds suggestions and details for terminal output
//!
//! Request-level failures that map to a transport status (not found, bad request) are
//! not errors in this sense; they live in [`crate::core::failure`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use refscope::core::{RefscopeError, user_friendly_error};
//!
//! let err = RefscopeError::RepositoryNotFound {
//!     name: "platform/build".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(err));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Library result alias.
pub type Result<T> = std::result::Result<T, RefscopeError>;

/// The main error type for refscope operations.
///
/// Values are cheap to clone so that cache loaders can share a single failure between
/// every caller waiting on the same key.
#[derive(Error, Debug)]
pub enum RefscopeError {
    /// Git operation failed during execution
    ///
    /// Raised when a `git` subprocess exits with a non-zero status that the caller did
    /// not expect.
    ///
    /// # Fields
    /// - `operation`: The git operation that failed (e.g., "for-each-ref", "blame")
    /// - `stderr`: The error output from the git command
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        /// The git operation that failed
        operation: String,
        /// The error output from the git command
        stderr: String,
    },

    /// Git executable not found in PATH
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    /// A directory was expected to hold a git repository but does not.
    #[error("Not a valid git repository: {path}")]
    GitRepoInvalid {
        /// The path that was expected to contain a git repository
        path: String,
    },

    /// No repository with this name is served.
    #[error("Repository '{name}' not found")]
    RepositoryNotFound {
        /// Repository name as requested
        name: String,
    },

    /// An object id could not be read from the object store.
    #[error("Object {id} not found")]
    ObjectNotFound {
        /// Hex object id or revision expression
        id: String,
    },

    /// An abbreviated object id matched more than one object.
    #[error("Abbreviated object id '{spec}' is ambiguous")]
    AmbiguousObject {
        /// The abbreviation that matched several objects
        spec: String,
    },

    /// A string is not a valid hex object id.
    #[error("Invalid object id: {value}")]
    InvalidObjectId {
        /// The rejected input
        value: String,
    },

    /// A history walk visited more commits than allowed.
    ///
    /// Visibility checks treat this as "not visible" instead of surfacing it.
    #[error("Reachability walk exceeded {limit} commits")]
    ReachabilityLimitExceeded {
        /// The configured ceiling that was hit
        limit: usize,
    },

    /// Output from git could not be understood.
    #[error("Unexpected git output from {operation}: {reason}")]
    GitOutputParse {
        /// The git operation whose output was rejected
        operation: String,
        /// What was wrong with it
        reason: String,
    },

    /// A view was built without the fields its type requires.
    #[error("Invalid view: {reason}")]
    InvalidView {
        /// Which requirement was violated
        reason: String,
    },

    /// URL signer key material could not be loaded.
    #[error("Failed to load URL signer key from {path}: {reason}")]
    SignerKeyError {
        /// Key file path
        path: String,
        /// Reason for the failure
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for RefscopeError {
    fn clone(&self) -> Self {
        match self {
            Self::GitCommandError {
                operation,
                stderr,
            } => Self::GitCommandError {
                operation: operation.clone(),
                stderr: stderr.clone(),
            },
            Self::GitNotFound => Self::GitNotFound,
            Self::GitRepoInvalid {
                path,
            } => Self::GitRepoInvalid {
                path: path.clone(),
            },
            Self::RepositoryNotFound {
                name,
            } => Self::RepositoryNotFound {
                name: name.clone(),
            },
            Self::ObjectNotFound {
                id,
            } => Self::ObjectNotFound {
                id: id.clone(),
            },
            Self::AmbiguousObject {
                spec,
            } => Self::AmbiguousObject {
                spec: spec.clone(),
            },
            Self::InvalidObjectId {
                value,
            } => Self::InvalidObjectId {
                value: value.clone(),
            },
            Self::ReachabilityLimitExceeded {
                limit,
            } => Self::ReachabilityLimitExceeded {
                limit: *limit,
            },
            Self::GitOutputParse {
                operation,
                reason,
            } => Self::GitOutputParse {
                operation: operation.clone(),
                reason: reason.clone(),
            },
            Self::InvalidView {
                reason,
            } => Self::InvalidView {
                reason: reason.clone(),
            },
            Self::SignerKeyError {
                path,
                reason,
            } => Self::SignerKeyError {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::ConfigNotFound {
                path,
            } => Self::ConfigNotFound {
                path: path.clone(),
            },
            // io, toml errors are not Clone; keep their message
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::TomlError(e) => Self::Other {
                message: format!("TOML parsing error: {e}"),
            },
            Self::TomlSerError(e) => Self::Other {
                message: format!("TOML serialization error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

impl RefscopeError {
    /// Recover a [`RefscopeError`] from an [`anyhow::Error`] produced by lower layers.
    ///
    /// Typed errors are cloned out of the chain; anything else becomes
    /// [`RefscopeError::Other`] carrying the full message chain.
    #[must_use]
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        if let Some(typed) = error.downcast_ref::<Self>() {
            return typed.clone();
        }
        for cause in error.chain() {
            if let Some(typed) = cause.downcast_ref::<Self>() {
                return typed.clone();
            }
        }
        Self::Other {
            message: format!("{error:#}"),
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// Displayed by the CLI with the error in red, details in yellow and the suggestion in
/// green.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: RefscopeError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: RefscopeError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with actionable suggestions
///
/// Recognizes [`RefscopeError`] anywhere in the chain, IO errors and TOML errors; other
/// errors keep their full cause chain in the message.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(typed) = cause.downcast_ref::<RefscopeError>() {
            return create_error_context(typed.clone());
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(RefscopeError::Other {
                    message: format!("Permission denied: {io_error}"),
                })
                .with_suggestion("Check ownership and permissions of the repository base path");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(RefscopeError::Other {
                    message: format!("File not found: {io_error}"),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(RefscopeError::ConfigError {
            message: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax of your refscope configuration file");
    }

    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(RefscopeError::Other {
        message,
    })
}

fn create_error_context(error: RefscopeError) -> ErrorContext {
    match &error {
        RefscopeError::GitNotFound => ErrorContext::new(error)
            .with_suggestion("Install git from https://git-scm.com/ and make sure it is in PATH")
            .with_details("refscope reads repositories through the system git binary"),
        RefscopeError::GitCommandError {
            stderr,
            ..
        } => {
            let ctx = ErrorContext::new(error.clone());
            if stderr.is_empty() {
                ctx.with_suggestion("Run with --verbose to see the git invocation")
            } else {
                ctx.with_details(stderr.trim().to_string())
            }
        }
        RefscopeError::RepositoryNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Run 'refscope repos' to list the repositories under the base path"),
        RefscopeError::AmbiguousObject {
            ..
        } => ErrorContext::new(error).with_suggestion("Use a longer object id prefix"),
        RefscopeError::SignerKeyError {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Point url_signer_key at a readable file with owner-only permissions (chmod 600)",
        ),
        RefscopeError::ConfigNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Create the file or pass --config with an existing path"),
        RefscopeError::TomlError(_) | RefscopeError::ConfigError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the TOML syntax of your refscope configuration file"),
        _ => ErrorContext::new(error),
    }
}
