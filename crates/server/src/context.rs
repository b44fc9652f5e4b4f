//! Per-request context.
//!
//! Every request gets a fresh [`RequestContext`]: its resolved identity plus
//! fetcher handles bound to that identity. Nothing caller-specific is ever
//! stored on [`AppState`], so concurrent requests cannot see each other's
//! identity.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use launchpad_core::{Email, Launch, LaunchId, Page, User};
use tracing::{Span, debug};

use crate::datasources::{DataSourceError, LaunchCatalog, UserStore};
use crate::error::{AppError, set_sentry_user};
use crate::identity::Identity;
use crate::pagination::paginate;
use crate::state::AppState;

/// Launch lookups for one request.
#[derive(Clone)]
pub struct LaunchApi {
    catalog: Arc<dyn LaunchCatalog>,
    default_page_size: usize,
}

impl LaunchApi {
    /// One page of launches, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog fails.
    pub async fn page(
        &self,
        after: Option<&str>,
        page_size: Option<usize>,
    ) -> Result<Page<Launch>, DataSourceError> {
        let mut all = self.catalog.get_all().await?;
        all.reverse();
        Ok(paginate(
            &all,
            after,
            page_size.unwrap_or(self.default_page_size),
        ))
    }

    /// # Errors
    ///
    /// Returns an error if the catalog fails.
    pub async fn get_by_id(&self, id: &LaunchId) -> Result<Option<Launch>, DataSourceError> {
        self.catalog.get_by_id(id).await
    }

    /// # Errors
    ///
    /// Returns an error if the catalog fails.
    pub async fn get_many(&self, ids: &[LaunchId]) -> Result<Vec<Launch>, DataSourceError> {
        self.catalog.get_many(ids).await
    }
}

/// User operations for one request, acting as its identity.
#[derive(Clone)]
pub struct UserApi {
    store: Arc<dyn UserStore>,
    identity: Option<Identity>,
}

impl UserApi {
    /// The caller, if authenticated.
    #[must_use]
    pub const fn me(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Find or create the user for `email`. Used by `login`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn find_or_create(&self, email: &Email) -> Result<User, DataSourceError> {
        self.store.find_or_create(email).await
    }

    /// The caller's booked launch ids; empty when anonymous.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn trips(&self) -> Result<Vec<LaunchId>, DataSourceError> {
        match &self.identity {
            Some(identity) => self.store.trips_for(identity.user.id).await,
            None => Ok(Vec::new()),
        }
    }

    /// Book `ids` for the caller. `None` when anonymous.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn book_trips(
        &self,
        ids: &[LaunchId],
    ) -> Result<Option<Vec<LaunchId>>, DataSourceError> {
        let Some(identity) = &self.identity else {
            return Ok(None);
        };
        Ok(Some(self.store.book_trips(identity.user.id, ids).await?))
    }

    /// Cancel the caller's booking of `id`. False when anonymous or not
    /// booked.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn cancel_trip(&self, id: &LaunchId) -> Result<bool, DataSourceError> {
        let Some(identity) = &self.identity else {
            return Ok(false);
        };
        self.store.cancel_trip(identity.user.id, id).await
    }
}

/// Everything a resolver may use for one request.
#[derive(Clone)]
pub struct RequestContext {
    pub launches: LaunchApi,
    pub users: UserApi,
}

impl RequestContext {
    /// Build the context for an already-resolved identity.
    #[must_use]
    pub fn new(state: &AppState, identity: Option<Identity>) -> Self {
        Self {
            launches: LaunchApi {
                catalog: Arc::clone(state.launches()),
                default_page_size: state.config().page_size,
            },
            users: UserApi {
                store: Arc::clone(state.users()),
                identity,
            },
        }
    }

    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.users.me()
    }
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let identity = state.identity().resolve(header).await?;
        match &identity {
            Some(identity) => {
                Span::current().record("user_id", identity.user.id.as_i32());
                set_sentry_user(&identity.user.id);
                debug!(user_id = %identity.user.id, "request authenticated");
            }
            None => debug!("anonymous request"),
        }

        Ok(Self::new(state, identity))
    }
}
