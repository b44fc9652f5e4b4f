//! Launch catalog types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{LaunchId, RocketId};
use super::page::Cursor;

/// A scheduled or past launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Launch {
    /// Catalog id (flight number).
    pub id: LaunchId,
    /// Launch site name, if known.
    pub site: Option<String>,
    /// Launch time.
    pub launched_at: DateTime<Utc>,
    /// Mission flown.
    pub mission: Mission,
    /// Rocket used.
    pub rocket: Rocket,
}

impl Launch {
    /// Pagination cursor for this launch (its unix timestamp).
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.launched_at.timestamp().to_string())
    }
}

/// Mission patch image size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PatchSize {
    #[default]
    Small,
    Large,
}

/// Mission details for a launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub name: String,
    pub mission_patch_small: Option<String>,
    pub mission_patch_large: Option<String>,
}

impl Mission {
    /// Patch URL for the requested size.
    #[must_use]
    pub fn patch(&self, size: PatchSize) -> Option<&str> {
        match size {
            PatchSize::Small => self.mission_patch_small.as_deref(),
            PatchSize::Large => self.mission_patch_large.as_deref(),
        }
    }
}

/// Rocket details for a launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rocket {
    pub id: RocketId,
    pub name: String,
    #[serde(rename = "type")]
    pub rocket_type: String,
}
