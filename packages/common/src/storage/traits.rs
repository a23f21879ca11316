use std::path::Path;

use async_trait::async_trait;
use tempfile::TempPath;
use tokio::io::AsyncRead;

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader<'a> = Box<dyn AsyncRead + Unpin + Send + 'a>;

/// An uploaded payload written to a scratch file but not yet referenced by
/// any record. Dropping it removes the scratch file.
#[derive(Debug)]
pub struct StagedUpload {
    file_name: Option<String>,
    size: u64,
    temp: TempPath,
}

impl StagedUpload {
    pub fn new(file_name: Option<String>, size: u64, temp: TempPath) -> Self {
        Self {
            file_name,
            size,
            temp,
        }
    }

    /// Filename the client sent with the upload, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Lower-cased extension of the client filename, including the dot.
    ///
    /// Anything that is not a short alphanumeric extension is dropped.
    pub fn extension(&self) -> String {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.len() <= 8)
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default()
    }

    pub(crate) fn into_temp(self) -> TempPath {
        self.temp
    }
}

/// Storage for uploaded files referenced by content records.
///
/// Records hold stored paths of the form `/uploads/<dir>/<name>`; the store
/// is the only component that maps them onto real files.
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// Stream a payload into a scratch file.
    async fn stage(
        &self,
        reader: BoxReader<'_>,
        file_name: Option<String>,
    ) -> Result<StagedUpload, StorageError>;

    /// Move a staged payload into `directory` and return its stored path.
    async fn commit(&self, staged: StagedUpload, directory: &str) -> Result<String, StorageError>;

    /// Unlink a stored file.
    ///
    /// Returns `true` if the file was removed, `false` if it did not exist.
    async fn remove(&self, stored: &str) -> Result<bool, StorageError>;
}
