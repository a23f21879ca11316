use std::sync::Arc;

use directorate_common::storage::filesystem::FilesystemUploadStore;
use directorate_server::config::AppConfig;
use directorate_server::database::init_db;
use directorate_server::state::AppState;
use directorate_server::{build_router, kinds};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "directorate_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(AppConfig::load()?);
    tracing::info!("Configuration loaded");

    let db = init_db(&config.database).await?;
    tracing::info!("Database initialized");

    let uploads = Arc::new(
        FilesystemUploadStore::new(
            config.storage.uploads_dir.clone(),
            config.storage.max_upload_size,
        )
        .await?,
    );
    let registry = kinds::build_registry(&db, uploads.clone());
    tracing::info!(kinds = registry.kinds().count(), "Content services ready");

    let state = AppState {
        config: config.clone(),
        registry,
        uploads,
    };
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
