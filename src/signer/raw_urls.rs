//! Links to, and admission checks for, the raw content host.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use std::collections::HashSet;
use std::sync::Arc;

use super::UrlSigner;
use crate::constants::AUTHKEY_PARAM;
use crate::view::{FormatType, View, ViewBuilder, ViewType};

/// A link to raw content on the raw host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUrl {
    pub host: String,
    /// Path and query, `authkey` included when the repository is not public.
    pub path: String,
    /// `None` for public repositories, whose links do not expire.
    pub expires_at_millis: Option<u64>,
}

impl RawUrl {
    /// Scheme-relative URL, `//host/path`.
    #[must_use]
    pub fn url(&self) -> String {
        format!("//{}{}", self.host, self.path)
    }
}

/// Outcome of a successful authkey check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedAuthKey {
    /// `false` when the repository is public and no key was needed.
    pub from_key: bool,
    pub expires_at_millis: Option<u64>,
}

/// Builds signed links to the raw host and validates the keys they carry.
pub struct RawUrls {
    raw_file_host_name: Option<String>,
    signer: Arc<dyn UrlSigner>,
    public_repositories: HashSet<String>,
}

impl RawUrls {
    #[must_use]
    pub fn new(raw_file_host_name: Option<String>, signer: Arc<dyn UrlSigner>) -> Self {
        Self {
            raw_file_host_name,
            signer,
            public_repositories: HashSet::new(),
        }
    }

    /// Repositories whose raw links need no key.
    #[must_use]
    pub fn with_public_repositories<I, S>(mut self, repositories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_repositories.extend(repositories.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn is_raw_domain(&self, host: &str) -> bool {
        self.raw_file_host_name.as_deref().is_some_and(|raw| raw.eq_ignore_ascii_case(host))
    }

    #[must_use]
    pub fn is_public(&self, repository: &str) -> bool {
        self.public_repositories.contains(repository)
    }

    /// Link to the raw bytes of the file `view` shows.
    ///
    /// `None` when no raw host is configured or the view does not name a file at a
    /// revision.
    #[must_use]
    pub fn create_raw_url(&self, view: &View) -> Option<RawUrl> {
        let raw_host = self.raw_file_host_name.as_deref()?;
        if !matches!(view.view_type(), ViewType::Path | ViewType::RawContent) {
            return None;
        }
        let origin = view.host_name_in_path().unwrap_or(view.host_name()).to_string();
        let raw = ViewBuilder::copy_from(view)
            .view_type(ViewType::RawContent)
            .host_name(raw_host)
            .host_name_in_path(origin)
            .format(FormatType::Default)
            .clear_params()
            .build()
            .ok()?;

        if self.is_public(raw.repository_name()) {
            return Some(RawUrl {
                host: raw_host.to_string(),
                path: raw.to_url(),
                expires_at_millis: None,
            });
        }

        let signature = self.signer.sign(&raw.to_url());
        let signed = ViewBuilder::copy_from(&raw)
            .param(AUTHKEY_PARAM, URL_SAFE_NO_PAD.encode(&signature.bytes))
            .build()
            .ok()?;
        tracing::debug!(
            target: "signer",
            "signed raw link for {} expiring at {}",
            raw.to_url(),
            signature.expires_at_millis
        );
        Some(RawUrl {
            host: raw_host.to_string(),
            path: signed.to_url(),
            expires_at_millis: Some(signature.expires_at_millis),
        })
    }

    /// Check the `authkey` presented with a raw-content request.
    ///
    /// Every failure is `None`.
    #[must_use]
    pub fn validate_auth_key(&self, view: &View, authkey: Option<&str>) -> Option<ValidatedAuthKey> {
        if self.is_public(view.repository_name()) {
            return Some(ValidatedAuthKey {
                from_key: false,
                expires_at_millis: None,
            });
        }
        let token = URL_SAFE_NO_PAD.decode(authkey?).ok()?;
        let canonical = ViewBuilder::copy_from(view).remove_param(AUTHKEY_PARAM).build().ok()?;
        let validated = self.signer.verify(&canonical.to_url(), &token)?;
        Some(ValidatedAuthKey {
            from_key: true,
            expires_at_millis: Some(validated.expires_at_millis),
        })
    }
}
