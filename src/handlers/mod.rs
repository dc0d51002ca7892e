//! HTTP handlers for the festival directory endpoints.
//!
//! Endpoint outcomes that are part of the wire contract are plain 200
//! responses carrying one of the sentinel bodies below; real HTTP errors
//! only occur for internal failures and malformed range queries.

pub mod auth_handlers;
pub mod concert_handlers;
pub mod festival_handlers;
pub mod health_handlers;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::user::User;
use crate::params::Params;
use crate::services::AppState;
use crate::services::directory_service::DirectoryService;

pub const OK: &str = "OK";
pub const NOT_LOGGED: &str = "Not logged";
pub const INCORRECT_INPUT: &str = "Incorrect input";
pub const NAME_EXISTS: &str = "Name exists";
pub const ARTIST_EXISTS: &str = "Artist exists";
pub const INVALID_FESTIVAL_ID: &str = "Invalid Festival ID";
pub const CONCERT_NOT_FOUND: &str = "Concert Not Found";
pub const PERMISSION_NOT_GRANTED: &str = "Permission not granted";
pub const CLIENT_NOT_PROVIDED: &str = "Client name not provided";

/// A plain-text 200 response.
pub fn text(body: impl Into<String>) -> Response {
    let body: String = body.into();
    (StatusCode::OK, body).into_response()
}

/// A JSON 200 response.
pub fn json(value: serde_json::Value) -> Response {
    (StatusCode::OK, axum::Json(value)).into_response()
}

/// Runs the client permission gate for an endpoint.
///
/// Returns the sentinel response to send when the gate refuses: no
/// `client` parameter, or the (possibly freshly created) client lacking
/// the capability. `None` means the request may proceed.
pub async fn check_client(
    directory: &DirectoryService,
    params: &Params,
    permission: &str,
) -> Result<Option<Response>, AppError> {
    let Some(name) = params.get("client") else {
        return Ok(Some(text(CLIENT_NOT_PROVIDED)));
    };

    if directory.client_has_permission(name, permission).await? {
        Ok(None)
    } else {
        Ok(Some(text(PERMISSION_NOT_GRANTED)))
    }
}

/// Parses a record identifier: decimal digits only, no sign.
pub fn parse_record_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Parses an epoch-seconds timestamp, fractional part allowed.
pub fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    let seconds: f64 = raw.trim().parse().ok()?;
    let millis = (seconds * 1000.0).round();
    if !millis.is_finite() || millis < i64::MIN as f64 || millis > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Renders a timestamp the way documents and update echoes expect it:
/// `YYYY-MM-DD HH:MM:SS+00:00`.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S%:z").to_string()
}

const SESSION_COOKIE: &str = "sessionid";

/// Pulls the session token out of the `Cookie` header, if present.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .map(str::to_string)
}

/// Builds the `Set-Cookie` value that hands a session token to the
/// browser, or clears it when `token` is empty.
pub fn session_cookie(token: &str) -> String {
    if token.is_empty() {
        format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0")
    } else {
        format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly")
    }
}

/// The authenticated user behind the request's session cookie.
///
/// Endpoints requiring a login take this as an extractor; requests with
/// no cookie, an unknown token or an expired session are answered with
/// the `Not logged` sentinel before the handler runs.
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.0.id
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session_token(&parts.headers) else {
            return Err(text(NOT_LOGGED));
        };

        state
            .auth
            .session_user(&token)
            .await
            .map(CurrentUser)
            .map_err(|_| text(NOT_LOGGED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn record_ids_are_unsigned_decimal_only() {
        assert_eq!(parse_record_id("42"), Some(42));
        assert_eq!(parse_record_id("007"), Some(7));
        assert_eq!(parse_record_id(""), None);
        assert_eq!(parse_record_id("-1"), None);
        assert_eq!(parse_record_id("4a"), None);
        assert_eq!(parse_record_id("4.2"), None);
    }

    #[test]
    fn epoch_parsing_accepts_fractions_and_rejects_garbage() {
        let parsed = parse_epoch("1456920000").unwrap();
        assert_eq!(format_timestamp(&parsed), "2016-03-02 12:00:00+00:00");

        assert!(parse_epoch("1456920000.5").is_some());
        assert!(parse_epoch(" 1456920000 ").is_some());
        assert!(parse_epoch("soon").is_none());
        assert!(parse_epoch("inf").is_none());
        assert!(parse_epoch("nan").is_none());
    }

    #[test]
    fn session_tokens_come_out_of_the_cookie_jar() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sessionid=abc123; lang=en"),
        );
        assert_eq!(session_token(&headers), Some("abc123".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_token(&headers), None);

        assert_eq!(session_token(&HeaderMap::new()), None);
    }
}
