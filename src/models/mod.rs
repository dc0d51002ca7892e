//! Core data models for the festival directory service.
//!
//! These entities map to database tables via `sqlx::FromRow` and
//! serialize naturally as JSON via `serde`.

pub mod client;
pub mod concert;
pub mod festival;
pub mod session;
pub mod user;
