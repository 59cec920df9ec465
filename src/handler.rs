//! One entry point per request: resolve, then apply disclosure checks.
//!
//! Objects named by id rather than by ref must be reachable from something the caller
//! can see, and raw-content requests on the raw host must carry a valid authkey. Both
//! failures answer [`FailureReason::ObjectNotFound`] so that a caller cannot tell a
//! hidden object from a missing one.

use std::sync::Arc;

use crate::constants::AUTHKEY_PARAM;
use crate::core::{FailureReason, RequestFailure};
use crate::git::{RepositoryStore, is_hex_abbreviation, split_relative_suffix};
use crate::resolver::{Resolution, ViewRequest, ViewResolver};
use crate::signer::RawUrls;
use crate::view::{Revision, View, ViewType};
use crate::visibility::{UserKey, VisibilityCache};

/// Final answer for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    View(View),
    Redirect(String),
    Failure(RequestFailure),
}

/// Composes the resolver, the visibility cache and raw-host admission.
pub struct RequestHandler {
    resolver: ViewResolver,
    visibility: Arc<VisibilityCache>,
    raw_urls: RawUrls,
}

/// Whether the revision was named by object id, so no ref vouches for it.
fn named_by_object_id(revision: &Revision) -> bool {
    let (base, _) = split_relative_suffix(revision.name());
    !revision.is_null() && is_hex_abbreviation(base)
}

impl RequestHandler {
    #[must_use]
    pub fn new(resolver: ViewResolver, visibility: Arc<VisibilityCache>, raw_urls: RawUrls) -> Self {
        Self {
            resolver,
            visibility,
            raw_urls,
        }
    }

    #[must_use]
    pub const fn resolver(&self) -> &ViewResolver {
        &self.resolver
    }

    #[must_use]
    pub const fn raw_urls(&self) -> &RawUrls {
        &self.raw_urls
    }

    pub async fn handle(&self, request: &ViewRequest, user: &UserKey) -> Outcome {
        let view = match self.resolver.resolve(request).await {
            Ok(Resolution::View(view)) => view,
            Ok(Resolution::Redirect(url)) => return Outcome::Redirect(url),
            Err(failure) => return Outcome::Failure(failure),
        };
        match self.admit(request, &view, user).await {
            Ok(()) => Outcome::View(view),
            Err(failure) => Outcome::Failure(failure),
        }
    }

    async fn admit(
        &self,
        request: &ViewRequest,
        view: &View,
        user: &UserKey,
    ) -> Result<(), RequestFailure> {
        let revision = view.revision();
        let old_revision = view.old_revision();
        if named_by_object_id(revision) || named_by_object_id(old_revision) {
            let store = self.resolver.open(view.repository_name()).await?;
            if named_by_object_id(revision) {
                self.require_visible(user, view, store.as_ref(), revision, &[]).await?;
            }
            if named_by_object_id(old_revision) {
                let known: Vec<_> = revision.peeled_id().into_iter().collect();
                self.require_visible(user, view, store.as_ref(), old_revision, &known).await?;
            }
        }

        if view.view_type() == ViewType::RawContent
            && self.raw_urls.is_raw_domain(&request.host_name)
            && self.raw_urls.validate_auth_key(view, view.param(AUTHKEY_PARAM)).is_none()
        {
            tracing::debug!(target: "signer", "rejected authkey for {}", view.to_url());
            return Err(RequestFailure::new(FailureReason::ObjectNotFound));
        }
        Ok(())
    }

    async fn require_visible(
        &self,
        user: &UserKey,
        view: &View,
        store: &dyn RepositoryStore,
        revision: &Revision,
        known_reachable: &[crate::git::ObjectId],
    ) -> Result<(), RequestFailure> {
        let Some(id) = revision.id() else {
            return Ok(());
        };
        let visible = self
            .visibility
            .is_visible(user, view.repository_name(), store, id, known_reachable)
            .await?;
        if visible {
            Ok(())
        } else {
            tracing::debug!(target: "visibility", "{} hidden from {}", id, user);
            Err(RequestFailure::with_message(FailureReason::ObjectNotFound, revision.name()))
        }
    }
}
