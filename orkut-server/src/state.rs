use std::sync::Arc;

use crate::config::Settings;
use crate::db::Database;
use crate::session::SessionManager;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub session_manager: SessionManager,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(db: Database, settings: Settings) -> Self {
        let session_manager =
            SessionManager::new(db.clone(), &settings.auth.jwt_secret, settings.auth.session_days);
        Self {
            db,
            session_manager,
            settings: Arc::new(settings),
        }
    }

    /// Get authenticated user ID from a bearer token
    pub fn get_authenticated_user_id_from_token(&self, token: &str) -> Option<uuid::Uuid> {
        self.session_manager.validate_session(token).ok()
    }
}
