//! Registration, login and logout.

use axum::{
    extract::{RawForm, State},
    http::{HeaderMap, HeaderValue, header},
    response::Response,
};
use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::AppError;
use crate::models::user::NewUser;
use crate::params::Params;
use crate::services::AppState;
use crate::services::auth_service::AuthError;

use super::{OK, session_cookie, session_token, text};

const MISSING_FIELDS: &str = "Missing Non-Optional Fields";

lazy_static! {
    static ref USERNAME_PATTERN: Regex = Regex::new(r"(?i)^[a-z0-9\-_@+]*$").unwrap();
    static ref EMAIL_LOCAL_PATTERN: Regex = Regex::new(r"(?i)^[a-z0-9#-_~$&'()*+,;=:.]*$").unwrap();
}

/// Usernames are 8–30 characters drawn from letters, digits and `-_@+`.
fn valid_username(username: &str) -> bool {
    let length = username.chars().count();
    if !(8..=30).contains(&length) {
        return false;
    }
    USERNAME_PATTERN.is_match(username)
}

/// E-mail addresses are 6–254 characters with exactly one `@`; the local
/// part is at most 64 characters, never starts or ends with a dot, and
/// sticks to the allowed character set.
fn valid_email(email: &str) -> bool {
    let length = email.chars().count();
    if !(6..=254).contains(&length) {
        return false;
    }
    if !email.contains('@') {
        return false;
    }
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }
    let local = parts[0];
    if local.chars().count() > 64 || local.starts_with('.') || local.ends_with('.') {
        return false;
    }
    EMAIL_LOCAL_PATTERN.is_match(local)
}

/// POST `/backend/register/` — create a user account.
pub async fn register(
    State(state): State<AppState>,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let params = Params::parse(&body);

    let Some(username) = params.get("username") else {
        return Ok(text(MISSING_FIELDS));
    };
    if !valid_username(username) {
        return Ok(text("Invalid Username"));
    }

    let Some(email) = params.get("e-mail") else {
        return Ok(text(MISSING_FIELDS));
    };
    if !valid_email(email) {
        return Ok(text("Invalid e-mail"));
    }

    let Some(password) = params.get("password") else {
        return Ok(text(MISSING_FIELDS));
    };
    if password.chars().count() < 6 {
        return Ok(text("Invalid Password"));
    }

    let first_name = params.get("first_name").unwrap_or_default();
    if first_name.chars().count() > 30 {
        return Ok(text("Invalid First Name"));
    }

    let last_name = params.get("last_name").unwrap_or_default();
    if last_name.chars().count() > 30 {
        return Ok(text("Invalid Last Name"));
    }

    let country = params.get("country").unwrap_or_default();
    if country.chars().count() > 50 {
        return Ok(text("Invalid Country"));
    }

    let city = params.get("city").unwrap_or_default();
    if city.chars().count() > 90 {
        return Ok(text("Invalid City"));
    }

    state
        .auth
        .register(NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            country: country.to_string(),
            city: city.to_string(),
        })
        .await?;

    Ok(text(OK))
}

/// POST `/backend/login/` — open a session and hand its token back as a
/// cookie.
pub async fn log_in(
    State(state): State<AppState>,
    RawForm(body): RawForm,
) -> Result<Response, AppError> {
    let params = Params::parse(&body);

    let Some(username) = params.get("username") else {
        return Ok(text("No username"));
    };
    let Some(password) = params.get("password") else {
        return Ok(text("No password"));
    };

    let session = match state.auth.login(username, password).await {
        Ok(session) => session,
        Err(AuthError::InvalidCredentials) => return Ok(text("Invalid login")),
        Err(AuthError::AccountDisabled) => return Ok(text("Disabled account")),
        Err(err) => return Err(err.into()),
    };

    let cookie = HeaderValue::from_str(&session_cookie(&session.token))
        .map_err(|err| AppError::internal(err.to_string()))?;

    let mut response = text(OK);
    response.headers_mut().insert(header::SET_COOKIE, cookie);
    Ok(response)
}

/// POST `/backend/logout/` — drop the session, if any, and clear the
/// cookie. Safe to call while logged out.
pub async fn log_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        state.auth.logout(&token).await?;
    }

    let cleared = HeaderValue::from_str(&session_cookie(""))
        .map_err(|err| AppError::internal(err.to_string()))?;

    let mut response = text("Logged out");
    response.headers_mut().insert(header::SET_COOKIE, cleared);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_need_the_right_length_and_alphabet() {
        assert!(valid_username("usr_name"));
        assert!(valid_username("USER@somewhere"));
        assert!(valid_username("with-dash+plus"));

        assert!(!valid_username("duck"));
        assert!(!valid_username("1234567890123456790123456789000"));
        assert!(!valid_username("!#$%^&*()=~`,.'\""));
    }

    #[test]
    fn emails_need_one_at_sign_and_a_sane_local_part() {
        assert!(valid_email("e@ma.il"));
        assert!(valid_email("some.one+tag@example.com"));

        assert!(!valid_email("a@b.c"));
        assert!(!valid_email("asdf"));
        assert!(!valid_email("two@at@signs"));
        assert!(!valid_email(".leading@dot.com"));
        assert!(!valid_email("trailing.@dot.com"));

        let long_local = format!("{}@b.c", "a".repeat(65));
        assert!(!valid_email(&long_local));

        let long_email = format!("{}@example.com", "a".repeat(250));
        assert!(!valid_email(&long_email));
    }
}
