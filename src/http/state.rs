//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::FullRepository;
use crate::services::guest_sessions::GuestSessionStore;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn FullRepository>,
    /// Guest session store, swept externally by the server binary
    pub guest_sessions: Arc<GuestSessionStore>,
    /// Shared secret for privileged catalog mutations; `None` disables the
    /// admin gate (development mode)
    pub admin_token: Option<String>,
}

impl AppState {
    /// Create a new application state with the given repository and
    /// guest-session store.
    pub fn new(
        repository: Arc<dyn FullRepository>,
        guest_sessions: Arc<GuestSessionStore>,
    ) -> Self {
        Self {
            repository,
            guest_sessions,
            admin_token: None,
        }
    }

    /// Set the admin token used to gate privileged mutations.
    pub fn with_admin_token(mut self, admin_token: Option<String>) -> Self {
        self.admin_token = admin_token;
        self
    }
}
