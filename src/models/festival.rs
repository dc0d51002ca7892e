//! Festival records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A festival entry in the directory.
///
/// `prices` is free text — a space-separated list of price tokens that is
/// only ever parsed when a range query inspects it, never on save.
/// `owner_id` is set at creation and never changes.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Festival {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub country: String,
    pub city: String,
    pub address: String,
    pub genre: String,
    pub prices: String,
    pub owner_id: i64,
    pub official: bool,
    pub first_uploaded: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Festival {
    /// Ownership is an explicit identifier comparison, deliberately
    /// independent of how the records were loaded.
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }
}

/// Fields for creating a festival. Everything else starts at its column
/// default.
#[derive(Debug, Clone)]
pub struct NewFestival {
    pub name: String,
    pub description: String,
    pub official: bool,
    pub owner_id: i64,
}
