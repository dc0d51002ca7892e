//! Defines routes for the festival directory API.
//!
//! ## Structure
//! - **Account endpoints**
//!   - `POST /backend/register/` — create a user account
//!   - `POST /backend/login/`    — open a session, sets the session cookie
//!   - `POST /backend/logout/`   — close the session
//!
//! - **Festival endpoints** (session + client gate)
//!   - `POST /backend/mult/fest/` — filtered listing
//!   - `POST /backend/r/fest/`    — read one festival
//!   - `POST /backend/w/fest/`    — create
//!   - `POST /backend/up/fest/`   — partial update (owner only)
//!   - `POST /backend/d/fest/`    — delete (owner only)
//!   - `POST /backend/v/`         — vote
//!
//! - **Concert endpoints** (session + client gate)
//!   - `POST /backend/mult/conc/` — a festival's lineup
//!   - `POST /backend/r/conc/`    — read one concert
//!   - `POST /backend/w/conc/`    — create
//!   - `POST /backend/up/conc/`   — partial update (festival owner only)
//!   - `POST /backend/d/conc/`    — delete (festival owner only)
//!
//! Every `/backend/` endpoint reads urlencoded POST form parameters and
//! answers 200 with either a JSON document or one of the sentinel bodies.

use crate::{
    handlers::{
        auth_handlers::{log_in, log_out, register},
        concert_handlers::{
            delete_concert, read_concert_info, read_festival_concerts, update_concert_info,
            write_concert_info,
        },
        festival_handlers::{
            delete_festival, read_festival_info, read_multiple_festivals, update_festival_info,
            vote, write_festival_info,
        },
        health_handlers::{healthz, readyz},
    },
    services::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for the whole API.
///
/// The router carries shared state ([`AppState`]) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // accounts
        .route("/backend/register/", post(register))
        .route("/backend/login/", post(log_in))
        .route("/backend/logout/", post(log_out))
        // festivals
        .route("/backend/mult/fest/", post(read_multiple_festivals))
        .route("/backend/r/fest/", post(read_festival_info))
        .route("/backend/w/fest/", post(write_festival_info))
        .route("/backend/up/fest/", post(update_festival_info))
        .route("/backend/d/fest/", post(delete_festival))
        .route("/backend/v/", post(vote))
        // concerts
        .route("/backend/mult/conc/", post(read_festival_concerts))
        .route("/backend/r/conc/", post(read_concert_info))
        .route("/backend/w/conc/", post(write_concert_info))
        .route("/backend/up/conc/", post(update_concert_info))
        .route("/backend/d/conc/", post(delete_concert))
}
