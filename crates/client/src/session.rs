//! The per-session client object.

use launchpad_core::{Credential, Cursor, LaunchId};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{CartItems, EntityCache, FetchSeq, FlagsPatch, Readout, SessionFlags};
use crate::cart;
use crate::credentials::{CredentialStore, CredentialStoreError, KeyValueSlot};
use crate::local::LocalFieldRegistry;
use crate::pagination::{LoadMore, MergeError};
use crate::query::{PlanError, PlannedField, Query, QueryPlan};

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Credentials(#[from] CredentialStoreError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// One user session: the entity cache, the persisted credential and the
/// local field declarations.
///
/// There is no global instance. Reads take `&self`, writes `&mut self`, so a
/// read never observes a half-applied write.
#[derive(Debug)]
pub struct Session<S> {
    cache: EntityCache,
    credentials: CredentialStore<S>,
    registry: LocalFieldRegistry,
}

impl<S: KeyValueSlot> Session<S> {
    /// Start a session. `isLoggedIn` reflects whether a credential is
    /// already stored; the cart starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential slot cannot be read.
    pub fn start(credentials: CredentialStore<S>) -> Result<Self, SessionError> {
        Self::with_registry(credentials, LocalFieldRegistry::default())
    }

    /// Start a session with a custom set of local fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential slot cannot be read.
    pub fn with_registry(
        credentials: CredentialStore<S>,
        registry: LocalFieldRegistry,
    ) -> Result<Self, SessionError> {
        let is_logged_in = credentials.is_present()?;
        debug!(is_logged_in, "starting session");
        Ok(Self {
            cache: EntityCache::new(SessionFlags {
                is_logged_in,
                cart_items: CartItems::new(),
            }),
            credentials,
            registry,
        })
    }

    #[must_use]
    pub const fn cache(&self) -> &EntityCache {
        &self.cache
    }

    #[must_use]
    pub const fn flags(&self) -> &SessionFlags {
        self.cache.flags()
    }

    /// Compile `query` against this session's local fields.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] for undeclared local fields.
    pub fn plan(&self, query: &Query) -> Result<QueryPlan, SessionError> {
        Ok(QueryPlan::compile(query, &self.registry)?)
    }

    /// Best-effort snapshot for `plan`.
    #[must_use]
    pub fn read(&self, plan: &QueryPlan) -> Readout<Value> {
        self.cache.read(plan)
    }

    /// Reserve the sequence number for a fetch about to be sent.
    pub fn begin_fetch(&self) -> FetchSeq {
        self.cache.begin_fetch()
    }

    /// Normalize a fetched response into the cache.
    pub fn absorb(&mut self, plan: &QueryPlan, data: &Value, seq: FetchSeq) {
        self.cache.normalize(plan, data, seq);
    }

    pub fn write_flags(&mut self, patch: FlagsPatch) {
        self.cache.write_flags(patch);
    }

    /// Add or remove `id` from the cart and return the new cart.
    pub fn toggle_cart(&mut self, id: &LaunchId) -> CartItems {
        cart::toggle(&mut self.cache, id)
    }

    /// The stored credential, to attach to outgoing requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential slot cannot be read.
    pub fn credential(&self) -> Result<Option<Credential>, SessionError> {
        Ok(self.credentials.get()?)
    }

    /// Persist the credential returned by a successful login and flip
    /// `isLoggedIn`.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be persisted; the flag is
    /// left unchanged in that case.
    pub fn complete_login(&mut self, credential: &Credential) -> Result<(), SessionError> {
        self.credentials.set(credential)?;
        self.cache.write_flags(FlagsPatch::default().logged_in(true));
        info!("session logged in");
        Ok(())
    }

    /// Clear the cache and forget the credential.
    ///
    /// Responses to fetches issued before the logout are discarded when they
    /// arrive.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be removed. The cache is
    /// cleared regardless.
    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.cache.clear();
        self.credentials.clear()?;
        info!("session logged out");
        Ok(())
    }

    /// Where "load more" for `field` should fetch from.
    #[must_use]
    pub fn load_more(&self, field: &PlannedField) -> LoadMore {
        self.cache.load_more(field)
    }

    /// Merge the next page of `field`, fetched with `requested_after`.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError`] when the merge breaks the pagination contract;
    /// see [`EntityCache::merge_page`].
    pub fn merge_page(
        &mut self,
        field: &PlannedField,
        requested_after: Option<&Cursor>,
        fetched: Option<&Value>,
        seq: FetchSeq,
    ) -> Result<(), SessionError> {
        Ok(self.cache.merge_page(field, requested_after, fetched, seq)?)
    }

    pub const fn credentials(&self) -> &CredentialStore<S> {
        &self.credentials
    }
}
