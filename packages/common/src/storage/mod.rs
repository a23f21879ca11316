mod error;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use traits::{BoxReader, StagedUpload, UploadStore};

use crate::attachment::CleanupReport;

/// URL prefix under which stored paths are served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Unlink every path independently; one failure does not stop the rest.
pub async fn unlink_all(store: &dyn UploadStore, paths: &[String]) -> CleanupReport {
    let mut report = CleanupReport::default();
    for path in paths {
        match store.remove(path).await {
            Ok(true) => report.removed.push(path.clone()),
            Ok(false) => report.missing.push(path.clone()),
            Err(e) => report.failed.push((path.clone(), e.to_string())),
        }
    }
    report
}
