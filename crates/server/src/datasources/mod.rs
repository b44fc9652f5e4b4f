//! Upstream data sources.
//!
//! Resolvers never touch storage directly; they go through the request's
//! [`LaunchApi`](crate::context::LaunchApi) and
//! [`UserApi`](crate::context::UserApi) handles, which wrap these traits.

pub mod launches;
pub mod users;

use async_trait::async_trait;
use launchpad_core::{Email, Launch, LaunchId, User, UserId};
use thiserror::Error;

pub use launches::{CachedLaunchCatalog, StaticLaunchCatalog};
pub use users::InMemoryUserStore;

/// Errors from upstream stores.
#[derive(Debug, Error)]
pub enum DataSourceError {
    /// The catalog file could not be read.
    #[error("catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The catalog file is not valid launch JSON.
    #[error("catalog parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A user id the store never issued.
    #[error("unknown user: {0}")]
    UnknownUser(UserId),

    /// The store ran out of user ids.
    #[error("user id space exhausted")]
    IdsExhausted,
}

/// Read access to the launch catalog.
#[async_trait]
pub trait LaunchCatalog: Send + Sync {
    /// Every launch, oldest first.
    async fn get_all(&self) -> Result<Vec<Launch>, DataSourceError>;

    /// One launch, `None` if unknown.
    async fn get_by_id(&self, id: &LaunchId) -> Result<Option<Launch>, DataSourceError>;

    /// The known launches among `ids`, in the order given. Unknown ids are
    /// skipped.
    async fn get_many(&self, ids: &[LaunchId]) -> Result<Vec<Launch>, DataSourceError> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(launch) = self.get_by_id(id).await? {
                found.push(launch);
            }
        }
        Ok(found)
    }
}

/// Users and their bookings.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// The user with `email`, created on first sight.
    async fn find_or_create(&self, email: &Email) -> Result<User, DataSourceError>;

    /// Book `ids` for `user`. Already-booked ids are left as they are.
    /// Returns the ids that are booked after the call, in the order given.
    async fn book_trips(
        &self,
        user: UserId,
        ids: &[LaunchId],
    ) -> Result<Vec<LaunchId>, DataSourceError>;

    /// Cancel the booking of `id`. Returns false if it was not booked.
    async fn cancel_trip(&self, user: UserId, id: &LaunchId) -> Result<bool, DataSourceError>;

    /// Booked launch ids, in booking order.
    async fn trips_for(&self, user: UserId) -> Result<Vec<LaunchId>, DataSourceError>;
}
