use std::{env, net::SocketAddr, path::PathBuf};

use dotenvy::dotenv;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// Default per-file upload limit (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error("Invalid listen address {0}")]
    InvalidAddress(String),
}

#[derive(Debug, Clone, Validate)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Storage root; every folder lives directly beneath it.
    pub upload_dir: PathBuf,
    /// Directory holding the browser UI (`index.html` and its assets).
    pub static_dir: PathBuf,
    #[validate(range(min = 1, max = 104857600))] // Max 100MB
    pub max_file_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            upload_dir: PathBuf::from("uploads"),
            static_dir: PathBuf::from("web"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load environment variables from `.env` file (if it exists)
        dotenv().ok();

        let defaults = Config::default();

        let config = Config {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(defaults.port),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|size| size.parse().ok())
                .unwrap_or(defaults.max_file_size),
        };

        config.validate()?;
        Ok(config)
    }

    /// Address the HTTP listener binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }
}
