use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A content record of any kind. Kind-specific fields live in `fields`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_record")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Content kind tag (e.g. "leader", "charter").
    #[sea_orm(indexed)]
    pub kind: String,

    /// Localized triples, scalars and attachment paths as one JSON object.
    #[sea_orm(column_type = "JsonBinary")]
    pub fields: serde_json::Value,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,

    /// Bumped by every write; updates only apply to the revision they read.
    pub revision: i64,
}

impl ActiveModelBehavior for ActiveModel {}
