use directorate_common::KindSchema;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;

/// Envelope for create, update, delete and single-record reads.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RecordResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "Leader created successfully")]
    pub message: String,
    /// The raw record, or its projection on localized reads.
    #[schema(value_type = Object)]
    pub data: Value,
}

impl RecordResponse {
    pub fn new(message: impl Into<String>, data: &impl Serialize) -> Result<Self, AppError> {
        Ok(Self {
            success: true,
            message: message.into(),
            data: serde_json::to_value(data)?,
        })
    }
}

/// Envelope for listings. Records sit under the kind's plural key, e.g.
/// `{"success": true, "message": "...", "leaders": [...]}`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ListResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "Leader list retrieved")]
    pub message: String,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub items: Map<String, Value>,
}

impl ListResponse {
    pub fn new<T: Serialize>(schema: &KindSchema, items: &[T]) -> Result<Self, AppError> {
        let mut map = Map::new();
        map.insert(schema.plural.to_string(), serde_json::to_value(items)?);
        Ok(Self {
            success: true,
            message: format!("{} list retrieved", schema.label),
            items: map,
        })
    }
}
