//! Application state for the ingestion server

use std::sync::Arc;

use crate::config::IngestConfig;
use crate::error::Result;
use crate::service::IngestService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Upload orchestrator (owns the file registry)
    service: IngestService,
}

impl AppState {
    /// Create new application state from a validated configuration
    pub fn new(config: IngestConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            "Initializing ingestion state (uploads: {}, pdf backend: {:?})",
            config.storage.upload_dir.display(),
            config.pdf.backend
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                service: IngestService::new(config),
            }),
        })
    }

    pub fn service(&self) -> &IngestService {
        &self.inner.service
    }

    pub fn config(&self) -> &IngestConfig {
        self.inner.service.config()
    }
}
