use crate::config::Config;
use crate::storage::LocalStorage;

/// Central application state shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage root handle; every handler reaches the disk through it.
    pub storage: LocalStorage,

    /// Application configuration loaded from environment variables or `.env`.
    pub config: Config,
}
