use std::sync::Arc;

use directorate_common::storage::UploadStore;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::service::{ContentRegistry, ContentService};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub registry: ContentRegistry,
    pub uploads: Arc<dyn UploadStore>,
}

impl AppState {
    /// Service for a route's `{kind}` segment.
    pub fn service(&self, kind: &str) -> Result<Arc<ContentService>, AppError> {
        self.registry
            .get(kind)
            .ok_or_else(|| AppError::NotFound(format!("Unknown content kind '{kind}'")))
    }
}
