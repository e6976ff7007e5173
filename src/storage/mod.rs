// Local filesystem layout: `<root>/<folder>/<file>`
mod local;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use crate::config::Config;

pub use local::{LocalStorage, StagedUpload};

/// Reserved folder under the root that holds uploads until their folder is known.
pub const STAGING_DIR: &str = "temp";

// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String), // Missing folder or file, or a name that cannot exist under the root

    #[error("Invalid name: {0}")]
    InvalidName(String), // Name that would leave the root or hit the staging area

    #[error("Io Error: {0}")]
    IoError(#[from] std::io::Error), // Wraps standard I/O errors

    // Moving a staged upload into its folder failed
    #[error("Persist Error: {0}")]
    PersistError(#[from] tempfile::PathPersistError),
}

/// A folder under the storage root.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderInfo {
    pub name: String,
    pub file_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A regular file inside a folder.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Initialize the storage root based on config
pub async fn init_storage(config: &Config) -> Result<LocalStorage, StorageError> {
    info!("Initializing local storage at {:?}", config.upload_dir);
    LocalStorage::new(&config.upload_dir).await
}
