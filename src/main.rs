use std::sync::Arc;

use anyhow::Context;
use liftlog::api::{create_routes, AppState};
use liftlog::config::{run_migrations, AppConfig, DatabaseConfig, StorageConfig, UploadConfig};
use liftlog::repositories::Repositories;
use liftlog::services::{FfmpegVideoProcessor, S3ObjectStorage};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("liftlog=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let database = DatabaseConfig::from_env()?;
    let storage_config = StorageConfig::from_env()?;
    let upload_config = UploadConfig::from_env();

    let pool = database.create_pool().await?;
    run_migrations(&pool).await?;

    let storage = S3ObjectStorage::from_config(&storage_config).await;
    let processor = FfmpegVideoProcessor::new(&upload_config);
    info!(
        bucket = %storage_config.bucket,
        max_upload_bytes = upload_config.max_upload_bytes,
        transcode = upload_config.transcode,
        thumbnails = upload_config.thumbnails,
        "video storage configured"
    );

    let state = AppState::new(
        Repositories::postgres(pool),
        Arc::new(storage),
        Arc::new(processor),
        &config,
        upload_config,
    );
    let app = create_routes(state);

    let address = config.server_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("LiftLog server starting on http://{}", address);
    info!("Health check available at http://{}/health", address);

    axum::serve(listener, app).await?;

    Ok(())
}
