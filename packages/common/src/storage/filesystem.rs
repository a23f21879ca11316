use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

use super::UPLOADS_URL_PREFIX;
use super::error::StorageError;
use super::traits::{BoxReader, StagedUpload, UploadStore};

/// Uploads tree on the local filesystem.
///
/// Committed files live at `{root}/{directory}/{uuid}{.ext}`; scratch files
/// for in-flight uploads live under `{root}/.tmp` so that committing is a
/// rename within one filesystem.
pub struct FilesystemUploadStore {
    root: PathBuf,
    max_size: u64,
}

impl FilesystemUploadStore {
    /// Create the store, creating the uploads root if needed.
    pub async fn new(root: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&root).await?;
        fs::create_dir_all(root.join(".tmp")).await?;
        Ok(Self { root, max_size })
    }

    /// Map a stored path onto the filesystem.
    ///
    /// Only plain components below the uploads root are accepted.
    pub fn resolve(&self, stored: &str) -> Result<PathBuf, StorageError> {
        let relative = stored
            .trim_start_matches('/')
            .strip_prefix(UPLOADS_URL_PREFIX.trim_start_matches('/'))
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| StorageError::InvalidPath(stored.to_string()))?;

        let mut path = self.root.clone();
        for part in relative.split('/') {
            if !is_plain_component(part) {
                return Err(StorageError::InvalidPath(stored.to_string()));
            }
            path.push(part);
        }
        Ok(path)
    }
}

fn is_plain_component(part: &str) -> bool {
    if part.is_empty() || part.starts_with('.') || part.contains(['\\', '\0']) {
        return false;
    }
    matches!(
        Path::new(part).components().collect::<Vec<_>>().as_slice(),
        [Component::Normal(_)]
    )
}

#[async_trait]
impl UploadStore for FilesystemUploadStore {
    async fn stage(
        &self,
        mut reader: BoxReader<'_>,
        file_name: Option<String>,
    ) -> Result<StagedUpload, StorageError> {
        let temp = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(self.root.join(".tmp"))?
            .into_temp_path();
        let mut file = fs::OpenOptions::new().write(true).open(&temp).await?;

        let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer
        let mut total_bytes: u64 = 0;

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }

            total_bytes += n as u64;
            if total_bytes > self.max_size {
                // Scratch file is removed when `temp` drops.
                return Err(StorageError::SizeLimitExceeded {
                    actual: total_bytes,
                    limit: self.max_size,
                });
            }

            file.write_all(&buf[..n]).await?;
        }

        file.flush().await?;
        drop(file);

        Ok(StagedUpload::new(file_name, total_bytes, temp))
    }

    async fn commit(&self, staged: StagedUpload, directory: &str) -> Result<String, StorageError> {
        if !directory.split('/').all(is_plain_component) {
            return Err(StorageError::InvalidPath(directory.to_string()));
        }

        let name = format!("{}{}", Uuid::now_v7(), staged.extension());
        let target_dir = self.root.join(directory);
        fs::create_dir_all(&target_dir).await?;

        let temp = staged.into_temp();
        fs::rename(&temp, target_dir.join(&name)).await?;
        // The scratch path no longer exists; stop the guard from touching it.
        let _ = temp.keep();

        Ok(format!("{UPLOADS_URL_PREFIX}/{directory}/{name}"))
    }

    async fn remove(&self, stored: &str) -> Result<bool, StorageError> {
        let path = self.resolve(stored)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
