use std::sync::Arc;

use tracing::error;

use nest_db::{Database, StoreResult};
use nest_wallet::WalletAuthenticator;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub wallet: WalletAuthenticator,
    pub jwt_secret: String,
    /// Mark the session cookie `Secure` (set when served over HTTPS).
    pub cookie_secure: bool,
}

impl AppStateInner {
    pub fn new(db: Database, wallet: WalletAuthenticator, jwt_secret: impl Into<String>) -> Self {
        Self {
            db,
            wallet,
            jwt_secret: jwt_secret.into(),
            cookie_secure: false,
        }
    }
}

/// Runs a blocking store call off the async runtime.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}
