use std::collections::BTreeMap;
use std::sync::Arc;

use directorate_common::attachment::{
    AttachmentPlan, CleanupReport, CommittedUploads, check_uploads, owned_paths,
};
use directorate_common::storage::{StagedUpload, StorageError, UploadStore, unlink_all};
use directorate_common::{
    ContentRecord, FieldError, KindSchema, ProjectedView, RecordFilter, project,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::repository::{ContentRepository, RepositoryError};

/// Times an update replans its attachments after losing a race.
const UPDATE_ATTEMPTS: usize = 8;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] FieldError),
    #[error("{label} {id} not found")]
    NotFound { label: &'static str, id: String },
    #[error("{label} {id} kept changing during the update")]
    Conflict { label: &'static str, id: String },
    #[error("repository error: {0}")]
    Storage(RepositoryError),
    #[error("upload error: {0}")]
    Upload(StorageError),
}

/// A file part received for an attachment field.
#[derive(Debug)]
pub struct FieldUpload {
    pub field: String,
    pub upload: StagedUpload,
}

/// Decoded write request for one record.
#[derive(Debug, Default)]
pub struct ContentInput {
    pub fields: Map<String, Value>,
    pub uploads: Vec<FieldUpload>,
    /// Gallery entries to drop, keyed by attachment field name.
    pub removals: BTreeMap<String, Vec<String>>,
}

/// Unlinks started after a successful write.
///
/// The work runs on its own task; dropping the handle lets it finish in the
/// background.
#[derive(Debug, Default)]
pub struct Cleanup(Option<JoinHandle<CleanupReport>>);

impl Cleanup {
    /// Wait for the unlinks and return what happened.
    pub async fn report(self) -> CleanupReport {
        let Some(task) = self.0 else {
            return CleanupReport::default();
        };
        task.await.unwrap_or_else(|e| {
            tracing::warn!(target: "orphan_files", error = %e, "cleanup task did not finish");
            CleanupReport::default()
        })
    }
}

/// Result of a mutating operation plus the file cleanup it triggered.
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub cleanup: Cleanup,
}

/// Lifecycle operations for one content kind.
///
/// Writes always persist the record before unlinking anything it stopped
/// referencing. Cleanup failures are logged on the `orphan_files` target
/// and reported through [`Cleanup`], never returned as errors.
pub struct ContentService {
    schema: &'static KindSchema,
    repo: Arc<dyn ContentRepository>,
    uploads: Arc<dyn UploadStore>,
}

impl ContentService {
    pub fn new(
        schema: &'static KindSchema,
        repo: Arc<dyn ContentRepository>,
        uploads: Arc<dyn UploadStore>,
    ) -> Self {
        Self {
            schema,
            repo,
            uploads,
        }
    }

    pub fn schema(&self) -> &'static KindSchema {
        self.schema
    }

    pub async fn create(&self, input: ContentInput) -> Result<Outcome<ContentRecord>, ServiceError> {
        let mut fields = self.schema.normalize_create(&input.fields)?;
        check_uploads(self.schema, input.uploads.iter().map(|u| u.field.as_str()))?;

        let committed = self.commit_uploads(None, input.uploads).await?;
        let plan = AttachmentPlan::for_create(self.schema, committed);
        fields.extend(plan.assignments);

        match self.repo.create(fields).await {
            Ok(record) => {
                tracing::info!(kind = self.schema.name, id = %record.id, "record created");
                Ok(Outcome {
                    value: record,
                    cleanup: Cleanup::default(),
                })
            }
            Err(e) => {
                self.rollback(None, &plan.introduced).await;
                Err(self.repository_error("create", None, e))
            }
        }
    }

    /// Apply a partial update.
    ///
    /// Text-only patches are merged onto the latest stored document. A patch
    /// that assigns attachments is planned against the revision it read; if
    /// another write lands first, the plan is rebuilt from the fresh record so
    /// neither write can restore a path the other has unlinked.
    pub async fn update(
        &self,
        id: &str,
        input: ContentInput,
    ) -> Result<Outcome<ContentRecord>, ServiceError> {
        let patch = self.schema.normalize_update(&input.fields)?;
        check_uploads(self.schema, input.uploads.iter().map(|u| u.field.as_str()))?;

        let mut current = self
            .repo
            .find_by_id(id)
            .await
            .map_err(|e| self.repository_error("update", Some(id), e))?;

        let committed = self.commit_uploads(Some(id), input.uploads).await?;
        let mut attempt = 1;
        loop {
            let plan = AttachmentPlan::for_update(
                self.schema,
                &current.fields,
                committed.clone(),
                &input.removals,
            );
            let expected = (!plan.assignments.is_empty()).then_some(current.revision);
            let mut write = patch.clone();
            write.extend(plan.assignments);

            let err = match self.repo.update(id, write, expected).await {
                Ok(record) => {
                    tracing::info!(kind = self.schema.name, id, "record updated");
                    return Ok(Outcome {
                        value: record,
                        cleanup: self.spawn_cleanup(id, plan.superseded),
                    });
                }
                Err(RepositoryError::Conflict(_)) if attempt < UPDATE_ATTEMPTS => {
                    tracing::debug!(kind = self.schema.name, id, attempt, "record changed, replanning");
                    attempt += 1;
                    match self.repo.find_by_id(id).await {
                        Ok(fresh) => {
                            current = fresh;
                            continue;
                        }
                        Err(e) => e,
                    }
                }
                Err(e) => e,
            };

            self.rollback(Some(id), &plan.introduced).await;
            return Err(self.repository_error("update", Some(id), err));
        }
    }

    /// Remove the record, then every file it referenced.
    pub async fn delete(&self, id: &str) -> Result<Outcome<ContentRecord>, ServiceError> {
        let current = self
            .repo
            .find_by_id(id)
            .await
            .map_err(|e| self.repository_error("delete", Some(id), e))?;

        self.repo
            .delete(id)
            .await
            .map_err(|e| self.repository_error("delete", Some(id), e))?;

        tracing::info!(kind = self.schema.name, id, "record deleted");
        let cleanup = self.spawn_cleanup(id, owned_paths(self.schema, &current.fields));
        Ok(Outcome {
            value: current,
            cleanup,
        })
    }

    /// Public listing: records that pass the kind's gate, projected to
    /// `locale`.
    pub async fn list_localized(
        &self,
        locale: Option<&str>,
        mut filter: RecordFilter,
    ) -> Result<Vec<ProjectedView>, ServiceError> {
        if let Some(gate) = self.schema.public_gate {
            filter.insert(gate, Value::Bool(true));
        }
        let records = self.list(&filter).await?;
        Ok(records
            .iter()
            .map(|record| project(self.schema, record, locale))
            .collect())
    }

    /// Management listing: every record with its stored fields.
    pub async fn list_raw(&self, filter: RecordFilter) -> Result<Vec<ContentRecord>, ServiceError> {
        self.list(&filter).await
    }

    pub async fn find(&self, id: &str) -> Result<ContentRecord, ServiceError> {
        self.repo
            .find_by_id(id)
            .await
            .map_err(|e| self.repository_error("find", Some(id), e))
    }

    pub async fn find_projected(
        &self,
        id: &str,
        locale: Option<&str>,
    ) -> Result<ProjectedView, ServiceError> {
        let record = self.find(id).await?;
        Ok(project(self.schema, &record, locale))
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ContentRecord>, ServiceError> {
        self.repo
            .list(filter)
            .await
            .map_err(|e| self.repository_error("list", None, e))
    }

    /// Move staged uploads into their field directories.
    ///
    /// If one commit fails, the files already committed for this request are
    /// unlinked and the remaining staged uploads are dropped.
    async fn commit_uploads(
        &self,
        id: Option<&str>,
        uploads: Vec<FieldUpload>,
    ) -> Result<CommittedUploads, ServiceError> {
        let mut committed = CommittedUploads::new();
        for FieldUpload { field, upload } in uploads {
            let Some(attachment) = self.schema.attachment(&field) else {
                continue;
            };
            match self.uploads.commit(upload, attachment.directory).await {
                Ok(path) => committed.entry(field).or_default().push(path),
                Err(e) => {
                    let fresh: Vec<String> = committed.into_values().flatten().collect();
                    self.rollback(id, &fresh).await;
                    tracing::error!(kind = self.schema.name, id, error = %e, "failed to commit upload");
                    return Err(ServiceError::Upload(e));
                }
            }
        }
        Ok(committed)
    }

    /// Unlink files committed for a request whose write failed.
    async fn rollback(&self, id: Option<&str>, paths: &[String]) {
        if paths.is_empty() {
            return;
        }
        let id = id.unwrap_or("-").to_string();
        unlink_orphans(self.uploads.clone(), self.schema.name, id, paths.to_vec()).await;
    }

    /// Unlink files a persisted record no longer references, off the
    /// request path.
    fn spawn_cleanup(&self, id: &str, paths: Vec<String>) -> Cleanup {
        if paths.is_empty() {
            return Cleanup::default();
        }
        let task = tokio::spawn(unlink_orphans(
            self.uploads.clone(),
            self.schema.name,
            id.to_string(),
            paths,
        ));
        Cleanup(Some(task))
    }

    fn repository_error(
        &self,
        operation: &'static str,
        id: Option<&str>,
        err: RepositoryError,
    ) -> ServiceError {
        let label = self.schema.label;
        let id_or_dash = id.unwrap_or("-");
        match err {
            RepositoryError::NotFound => ServiceError::NotFound {
                label,
                id: id.unwrap_or_default().to_string(),
            },
            RepositoryError::Conflict(_) => {
                tracing::warn!(kind = self.schema.name, id = id_or_dash, operation, "gave up after repeated conflicts");
                ServiceError::Conflict {
                    label,
                    id: id.unwrap_or_default().to_string(),
                }
            }
            other => {
                tracing::error!(
                    kind = self.schema.name,
                    id = id_or_dash,
                    operation,
                    error = %other,
                    "repository operation failed"
                );
                ServiceError::Storage(other)
            }
        }
    }
}

async fn unlink_orphans(
    store: Arc<dyn UploadStore>,
    kind: &'static str,
    id: String,
    paths: Vec<String>,
) -> CleanupReport {
    let report = unlink_all(store.as_ref(), &paths).await;
    for path in &report.missing {
        tracing::debug!(target: "orphan_files", kind, id = %id, path = %path, "file already gone");
    }
    for (path, error) in &report.failed {
        tracing::warn!(
            target: "orphan_files",
            kind,
            id = %id,
            path = %path,
            error = %error,
            "failed to unlink file"
        );
    }
    report
}

/// One [`ContentService`] per kind, built once at startup.
#[derive(Clone, Default)]
pub struct ContentRegistry {
    services: BTreeMap<&'static str, Arc<ContentService>>,
}

impl ContentRegistry {
    pub fn insert(&mut self, service: ContentService) {
        self.services.insert(service.schema.name, Arc::new(service));
    }

    pub fn get(&self, kind: &str) -> Option<Arc<ContentService>> {
        self.services.get(kind).cloned()
    }

    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.services.keys().copied()
    }
}
