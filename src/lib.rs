//! Image folder upload service.
//!
//! Accepts multipart image uploads into named folders under a storage root
//! and serves folder listings, downloads and a small browser UI.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use router::create_router;
pub use state::AppState;
