use std::sync::Arc;
use std::time::Instant;

use crate::auth::Authenticator;
use crate::db::Store;
use crate::media::ImageHost;

/// Shared handles passed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub images: Arc<dyn ImageHost>,
    pub auth: Arc<dyn Authenticator>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        images: Arc<dyn ImageHost>,
        auth: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            store,
            images,
            auth,
            started_at: Instant::now(),
        }
    }
}
