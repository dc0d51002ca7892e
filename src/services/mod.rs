//! Service layer: everything stateful lives here, shared with the
//! handlers through [`AppState`].

pub mod auth_service;
pub mod directory_service;

use auth_service::AuthService;
use directory_service::DirectoryService;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub directory: DirectoryService,
    pub auth: AuthService,
}
