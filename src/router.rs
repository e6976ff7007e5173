use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{MethodRouter, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{
        download_file, get_folder, health_check, list_folders, serve_stored, serve_ui,
        upload_files,
    },
    state::AppState,
};

/// Build the full application: API routes, stored files under `/uploads`,
/// and the browser UI for everything else.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Uploads are capped per file while streaming, not per request
    let upload_route = post(upload_files).layer(DefaultBodyLimit::disable());
    let stored_files: MethodRouter = get(serve_stored).with_state(state.clone());

    Router::new()
        .route("/health", get(health_check))
        .route("/upload", upload_route)
        .route("/folders", get(list_folders))
        .route("/folders/{folder_name}", get(get_folder))
        .route("/download/{folder_name}/{file_name}", get(download_file))
        .nest_service("/uploads", stored_files)
        .fallback(serve_ui)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
