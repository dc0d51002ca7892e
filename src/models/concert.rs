//! Concert records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A concert belonging to a festival.
///
/// Concerts have no owner of their own; for authorization purposes they
/// inherit the owner of their parent festival.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Concert {
    pub id: i64,
    pub festival_id: i64,
    pub artist: String,
    pub stage: i64,
    pub day: i64,
    #[sqlx(rename = "start_time")]
    pub start: DateTime<Utc>,
    #[sqlx(rename = "end_time")]
    pub end: DateTime<Utc>,
    pub first_uploaded: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewConcert {
    pub festival_id: i64,
    pub artist: String,
    pub stage: i64,
    pub day: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}
