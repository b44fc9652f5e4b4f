//! User domain type.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::{LaunchId, UserId};

/// A user record from the user store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned id.
    pub id: UserId,
    /// Login email, unique per user.
    pub email: Email,
    /// Launches this user has booked, in booking order.
    pub trips: Vec<LaunchId>,
}

impl User {
    /// Returns true if the user has booked the launch.
    #[must_use]
    pub fn is_booked_on(&self, launch: &LaunchId) -> bool {
        self.trips.contains(launch)
    }
}
