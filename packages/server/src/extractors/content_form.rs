use std::collections::BTreeMap;
use std::io;

use axum::{
    Json,
    extract::{FromRequest, Multipart, Request, multipart::Field},
    http::header,
};
use directorate_common::KindSchema;
use directorate_common::storage::{BoxReader, UploadStore};
use futures::TryStreamExt;
use serde_json::{Map, Value};
use tokio_util::io::StreamReader;

use crate::error::AppError;
use crate::service::{ContentInput, FieldUpload};
use crate::state::AppState;

/// Write request body for any content kind.
///
/// Accepts `application/json` or `multipart/form-data`. Multipart text parts
/// become fields (a repeated name collects into an array) and file parts are
/// staged in the uploads store as they stream in.
#[derive(Debug, Default)]
pub struct ContentForm {
    pub fields: Map<String, Value>,
    pub uploads: Vec<FieldUpload>,
}

impl FromRequest<AppState> for ContentForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            read_multipart(multipart, state.uploads.as_ref()).await
        } else {
            let Json(fields) = Json::<Map<String, Value>>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            Ok(ContentForm {
                fields,
                uploads: Vec::new(),
            })
        }
    }
}

impl ContentForm {
    /// Split gallery removal lists out of the fields.
    pub fn into_input(mut self, schema: &KindSchema) -> Result<ContentInput, AppError> {
        let keys: Vec<String> = self
            .fields
            .keys()
            .filter(|key| schema.removal_target(key).is_some())
            .cloned()
            .collect();

        let mut removals = BTreeMap::new();
        for key in keys {
            let Some(attachment) = schema.removal_target(&key) else {
                continue;
            };
            let paths = match self.fields.remove(&key) {
                None | Some(Value::Null) => continue,
                Some(Value::String(path)) => vec![path],
                Some(Value::Array(items)) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(path) => Ok(path),
                        _ => Err(AppError::Validation(format!(
                            "Field '{key}' must contain file paths"
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => {
                    return Err(AppError::Validation(format!(
                        "Field '{key}' must be a path or a list of paths"
                    )));
                }
            };
            removals.insert(attachment.name.to_string(), paths);
        }

        Ok(ContentInput {
            fields: self.fields,
            uploads: self.uploads,
            removals,
        })
    }
}

async fn read_multipart(
    mut multipart: Multipart,
    uploads: &dyn UploadStore,
) -> Result<ContentForm, AppError> {
    let mut form = ContentForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        // Browsers send `name[]` for repeated inputs.
        let Some(name) = field.name().map(|n| n.trim_end_matches("[]").to_string()) else {
            continue;
        };

        if field.file_name().is_none() {
            let text = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read '{name}': {e}")))?;
            push_text(&mut form.fields, name, text);
            continue;
        }

        // An empty file input still sends a part with an empty filename.
        let Some(file_name) = upload_file_name(&field) else {
            continue;
        };
        let stream = Box::pin(field.map_err(io::Error::other));
        let reader: BoxReader<'_> = Box::new(StreamReader::new(stream));
        let upload = uploads.stage(reader, Some(file_name)).await?;
        tracing::debug!(
            field = %name,
            file_name = upload.file_name(),
            bytes = upload.size(),
            "upload staged"
        );
        form.uploads.push(FieldUpload {
            field: name,
            upload,
        });
    }

    Ok(form)
}

/// Client filename, with an extension guessed from the part's content type
/// when the name has none.
fn upload_file_name(field: &Field<'_>) -> Option<String> {
    let name = field.file_name().filter(|n| !n.is_empty())?.to_string();
    if std::path::Path::new(&name).extension().is_some() {
        return Some(name);
    }
    let guessed = field
        .content_type()
        .and_then(mime_guess::get_mime_extensions_str)
        .and_then(|exts| exts.first());
    Some(match guessed {
        Some(ext) => format!("{name}.{ext}"),
        None => name,
    })
}

fn push_text(fields: &mut Map<String, Value>, name: String, text: String) {
    match fields.get_mut(&name) {
        None => {
            fields.insert(name, Value::String(text));
        }
        Some(Value::Array(items)) => items.push(Value::String(text)),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, Value::String(text)]);
        }
    }
}
