//! AuthService — user accounts and login sessions.
//!
//! Passwords are hashed with argon2; sessions are opaque alphanumeric
//! tokens handed back to the client as a cookie and stored with an
//! expiry. Expired sessions are swept on login.

use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use chrono::{Duration, Utc};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::models::{
    session::Session,
    user::{NewUser, User},
};

#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password is incorrect
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The account exists but has been deactivated
    #[error("account is disabled")]
    AccountDisabled,
    /// The session token is unknown or past its expiry
    #[error("session is missing or expired")]
    SessionExpired,
    #[error("hash error: {0}")]
    Hash(String),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct AuthService {
    db: Arc<SqlitePool>,
}

const USER_COLUMNS: &str =
    "id, username, email, password, first_name, last_name, country, city, is_active";

impl AuthService {
    const SESSION_DURATION_IN_DAYS: i64 = 7;
    const TOKEN_LENGTH: usize = 32;

    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Creates a user account, hashing the password before it is stored.
    pub async fn register(&self, new_user: NewUser) -> Result<User, AuthError> {
        let salt = SaltString::generate(&mut rand::rngs::OsRng);
        let hashed_password = Argon2::default()
            .hash_password(new_user.password.as_bytes(), &salt)
            .map_err(|err| AuthError::Hash(err.to_string()))?
            .to_string();

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password, first_name, last_name, country, city)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&hashed_password)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.country)
        .bind(&new_user.city)
        .fetch_one(&*self.db)
        .await?;

        Ok(user)
    }

    /// Verifies credentials and opens a new session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        self.clear_expired().await?;

        let user = self
            .user_by_username(username)
            .await
            .map_err(|err| match err {
                AuthError::Db(sqlx::Error::RowNotFound) => AuthError::InvalidCredentials,
                other => other,
            })?;

        let stored_password = PasswordHash::new(&user.password)
            .map_err(|err| AuthError::Hash(err.to_string()))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let token = random_token(Self::TOKEN_LENGTH);
        let expires_at = Utc::now() + Duration::days(Self::SESSION_DURATION_IN_DAYS);

        let session = sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (token, user_id, expires_at)
             VALUES (?, ?, ?)
             RETURNING id, token, user_id, expires_at",
        )
        .bind(&token)
        .bind(user.id)
        .bind(expires_at)
        .fetch_one(&*self.db)
        .await?;

        Ok(session)
    }

    /// Deletes the associated session. Unknown tokens are fine; logout is
    /// idempotent.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&*self.db)
            .await?;
        Ok(())
    }

    /// Resolves a session token to its (still active) user.
    pub async fn session_user(&self, token: &str) -> Result<User, AuthError> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT id, token, user_id, expires_at FROM sessions WHERE token = ?",
        )
        .bind(token)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => AuthError::SessionExpired,
            other => AuthError::Db(other),
        })?;

        if session.is_expired(Utc::now()) {
            return Err(AuthError::SessionExpired);
        }

        self.user_by_id(session.user_id).await
    }

    pub async fn user_by_id(&self, user_id: i64) -> Result<User, AuthError> {
        Ok(
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(user_id)
                .fetch_one(&*self.db)
                .await?,
        )
    }

    pub async fn user_by_username(&self, username: &str) -> Result<User, AuthError> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_one(&*self.db)
        .await?)
    }

    async fn clear_expired(&self) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(Utc::now())
            .execute(&*self.db)
            .await?;
        Ok(())
    }
}

fn random_token(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn auth() -> AuthService {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database opens");

        let schema = include_str!("../../migrations/0001_init.sql");
        for statement in schema.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&db).await.expect("schema applies");
        }

        AuthService::new(Arc::new(db))
    }

    fn new_user(username: &str, password: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: "user@example.com".to_string(),
            password: password.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            country: String::new(),
            city: String::new(),
        }
    }

    #[tokio::test]
    async fn register_then_login_round_trips() {
        let auth = auth().await;

        let user = auth.register(new_user("festivalgoer", "hunter22")).await.unwrap();
        assert_ne!(user.password, "hunter22");

        let session = auth.login("festivalgoer", "hunter22").await.unwrap();
        assert_eq!(session.user_id, user.id);

        let resolved = auth.session_user(&session.token).await.unwrap();
        assert_eq!(resolved.username, "festivalgoer");
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let auth = auth().await;
        auth.register(new_user("festivalgoer", "hunter22")).await.unwrap();

        let err = auth.login("festivalgoer", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = auth.login("nobody", "hunter22").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn disabled_accounts_cannot_log_in() {
        let auth = auth().await;
        auth.register(new_user("festivalgoer", "hunter22")).await.unwrap();
        sqlx::query("UPDATE users SET is_active = 0 WHERE username = 'festivalgoer'")
            .execute(&*auth.db)
            .await
            .unwrap();

        let err = auth.login("festivalgoer", "hunter22").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountDisabled));
    }

    #[tokio::test]
    async fn logout_invalidates_the_session() {
        let auth = auth().await;
        auth.register(new_user("festivalgoer", "hunter22")).await.unwrap();
        let session = auth.login("festivalgoer", "hunter22").await.unwrap();

        auth.logout(&session.token).await.unwrap();
        let err = auth.session_user(&session.token).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionExpired));

        // Logging out again is harmless.
        auth.logout(&session.token).await.unwrap();
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve() {
        let auth = auth().await;
        auth.register(new_user("festivalgoer", "hunter22")).await.unwrap();
        let session = auth.login("festivalgoer", "hunter22").await.unwrap();

        sqlx::query("UPDATE sessions SET expires_at = ? WHERE token = ?")
            .bind(Utc::now() - Duration::hours(1))
            .bind(&session.token)
            .execute(&*auth.db)
            .await
            .unwrap();

        let err = auth.session_user(&session.token).await.unwrap_err();
        assert!(matches!(err, AuthError::SessionExpired));
    }
}
