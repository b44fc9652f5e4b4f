//! In-memory user store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use launchpad_core::{Email, LaunchId, User, UserId};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{DataSourceError, UserStore};

#[derive(Debug, Default)]
struct Users {
    by_email: HashMap<Email, UserId>,
    records: HashMap<UserId, User>,
    last_id: i32,
}

/// User store held in process memory. Clones share the same users.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<Users>>,
}

impl InMemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users created so far.
    pub async fn len(&self) -> usize {
        self.users.read().await.records.len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_or_create(&self, email: &Email) -> Result<User, DataSourceError> {
        let existing = {
            let users = self.users.read().await;
            let found = users
                .by_email
                .get(email)
                .and_then(|id| users.records.get(id))
                .cloned();
            found
        };
        if let Some(user) = existing {
            return Ok(user);
        }

        // Re-check under the write lock; another request may have created it.
        let mut users = self.users.write().await;
        if let Some(user) = users
            .by_email
            .get(email)
            .and_then(|id| users.records.get(id))
        {
            return Ok(user.clone());
        }

        let next = users
            .last_id
            .checked_add(1)
            .ok_or(DataSourceError::IdsExhausted)?;
        users.last_id = next;
        let user = User {
            id: UserId::new(next),
            email: email.clone(),
            trips: Vec::new(),
        };
        users.by_email.insert(email.clone(), user.id);
        users.records.insert(user.id, user.clone());
        info!(user_id = %user.id, "created user");
        Ok(user)
    }

    async fn book_trips(
        &self,
        user: UserId,
        ids: &[LaunchId],
    ) -> Result<Vec<LaunchId>, DataSourceError> {
        let mut users = self.users.write().await;
        let record = users
            .records
            .get_mut(&user)
            .ok_or(DataSourceError::UnknownUser(user))?;

        for id in ids {
            if !record.trips.contains(id) {
                record.trips.push(id.clone());
            }
        }
        debug!(user_id = %user, count = ids.len(), "booked trips");
        Ok(ids
            .iter()
            .filter(|id| record.trips.contains(id))
            .cloned()
            .collect())
    }

    async fn cancel_trip(&self, user: UserId, id: &LaunchId) -> Result<bool, DataSourceError> {
        let mut users = self.users.write().await;
        let record = users
            .records
            .get_mut(&user)
            .ok_or(DataSourceError::UnknownUser(user))?;

        let before = record.trips.len();
        record.trips.retain(|t| t != id);
        Ok(record.trips.len() != before)
    }

    async fn trips_for(&self, user: UserId) -> Result<Vec<LaunchId>, DataSourceError> {
        let users = self.users.read().await;
        users
            .records
            .get(&user)
            .map(|u| u.trips.clone())
            .ok_or(DataSourceError::UnknownUser(user))
    }
}
