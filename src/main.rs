use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use imageuploadservice::{AppState, Config, create_router, storage::init_storage};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    let addr = config.socket_addr()?;

    let storage = init_storage(&config)
        .await
        .context("Failed to create uploads directory")?;

    info!("Files will be stored in: {}", storage.base_path().display());

    let app = create_router(AppState { storage, config });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);
    info!("Upload endpoint: http://{}/upload", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
