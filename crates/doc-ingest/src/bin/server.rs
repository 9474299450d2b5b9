//! Ingestion server binary
//!
//! Run with: cargo run -p doc-ingest --bin doc-ingest-server

use doc_ingest::{config::IngestConfig, server::IngestServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_ingest=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = IngestConfig::from_env()?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Upload directory: {}", config.storage.upload_dir.display());
    tracing::info!("  - Max upload size: {} bytes", config.server.max_upload_size);
    tracing::info!("  - PDF partitioner: {:?} ({})", config.pdf.backend, config.pdf.api_url);
    if config.pdf.api_key.is_none() {
        tracing::warn!("UNSTRUCTURED_API_KEY is not set; PDF partitioning may be rejected");
    }

    let server = IngestServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}/api/v1/files", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
