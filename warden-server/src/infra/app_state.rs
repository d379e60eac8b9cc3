use std::{fmt, sync::Arc};

use warden_config::Config;
use warden_core::auth::AuthOrchestrator;

#[derive(Clone)]
pub struct AppState {
    auth: AuthOrchestrator,
    config: Arc<Config>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(auth: AuthOrchestrator, config: Arc<Config>) -> Self {
        Self { auth, config }
    }

    pub fn auth(&self) -> &AuthOrchestrator {
        &self.auth
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
