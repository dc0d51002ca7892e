//! Registered human users.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A registered user account.
///
/// Users own festivals; ownership is what gates update and delete on the
/// records they uploaded. `password` holds the argon2 hash, never the
/// plain text.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub city: String,
    pub is_active: bool,
}

/// Fields for creating a user. The password here is still plain text;
/// hashing happens in the auth service.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub country: String,
    pub city: String,
}
