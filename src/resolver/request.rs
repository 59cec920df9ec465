//! The transport-neutral form of an incoming request.

use crate::core::{FailureReason, RequestFailure};
use crate::view::escape::{unescape_path, unescape_query};

/// What the resolver needs to know about a request.
///
/// `path_info` is the already-decoded path below the servlet path; `params` keeps query
/// parameters in the order they appeared, duplicates included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewRequest {
    pub host_name: String,
    pub servlet_path: String,
    pub path_info: String,
    pub params: Vec<(String, String)>,
}

impl ViewRequest {
    #[must_use]
    pub fn new(
        host_name: impl Into<String>,
        servlet_path: impl Into<String>,
        path_info: impl Into<String>,
    ) -> Self {
        Self {
            host_name: host_name.into(),
            servlet_path: servlet_path.into(),
            path_info: path_info.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// First value of a query parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// Split an escaped URL (path plus optional query) into a request.
    ///
    /// The path must start with `servlet_path`. Malformed escapes are
    /// [`FailureReason::CannotParseView`].
    pub fn from_url(
        host_name: &str,
        servlet_path: &str,
        url: &str,
    ) -> Result<Self, RequestFailure> {
        let (raw_path, query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };

        let servlet = servlet_path.trim_end_matches('/');
        let below = raw_path.strip_prefix(servlet).ok_or_else(|| {
            RequestFailure::with_message(
                FailureReason::CannotParseView,
                format!("{raw_path} is outside {servlet_path}"),
            )
        })?;
        if !below.is_empty() && !below.starts_with('/') {
            return Err(RequestFailure::with_message(
                FailureReason::CannotParseView,
                format!("{raw_path} is outside {servlet_path}"),
            ));
        }

        let path_info = unescape_path(below).ok_or_else(|| {
            RequestFailure::with_message(FailureReason::CannotParseView, "malformed path escape")
        })?;

        let mut request = Self::new(host_name, servlet, path_info);
        for pair in query.into_iter().flat_map(|q| q.split('&')).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let decode = |s: &str| {
                unescape_query(s).ok_or_else(|| {
                    RequestFailure::with_message(
                        FailureReason::IncorrectParameter,
                        "malformed query escape",
                    )
                })
            };
            request.params.push((decode(key)?, decode(value)?));
        }
        Ok(request)
    }
}
