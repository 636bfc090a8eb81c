use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::IdentityVerifier;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub identity: Arc<dyn IdentityVerifier>,
    pub max_page_size: u32,
}
