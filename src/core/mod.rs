//! Core types shared by every subsystem.
//!
//! - [`error`]: the library error type [`RefscopeError`] and the CLI-facing
//!   [`ErrorContext`] / [`user_friendly_error`] pair
//! - [`failure`]: request failures ([`RequestFailure`]) with a fixed [`StatusClass`] per
//!   [`FailureReason`]
//!
//! Library code returns [`Result`]; the CLI layer works in `anyhow::Result` and converts
//! at the edge.

pub mod error;
pub mod failure;

pub use error::{ErrorContext, RefscopeError, Result, user_friendly_error};
pub use failure::{FailureReason, RequestFailure, StatusClass};
