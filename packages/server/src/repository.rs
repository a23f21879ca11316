use async_trait::async_trait;
use chrono::Utc;
use directorate_common::schema::ListOrder;
use directorate_common::{ContentRecord, RecordFilter};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, Order, QueryFilter,
    QueryOrder, Set,
};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::entity::content_record;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("stored record {0} has malformed fields")]
    Corrupt(Uuid),
    #[error("record {0} was modified concurrently")]
    Conflict(String),
}

/// Rounds of re-reading a record whose revision moved under an unguarded
/// update.
const MERGE_ATTEMPTS: usize = 16;

/// Typed storage for the records of one content kind.
///
/// Ids are opaque strings; an id that cannot belong to this kind reports
/// [`RepositoryError::NotFound`].
#[async_trait]
pub trait ContentRepository: Send + Sync {
    async fn create(&self, fields: Map<String, Value>) -> Result<ContentRecord, RepositoryError>;

    async fn find_by_id(&self, id: &str) -> Result<ContentRecord, RepositoryError>;

    /// Overwrite the keys present in `patch`; other stored fields survive.
    ///
    /// With `expected`, the write only lands if the stored revision still
    /// equals it, otherwise [`RepositoryError::Conflict`]. Without it, the
    /// patch is applied to whatever the latest stored document is.
    async fn update(
        &self,
        id: &str,
        patch: Map<String, Value>,
        expected: Option<i64>,
    ) -> Result<ContentRecord, RepositoryError>;

    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ContentRecord>, RepositoryError>;
}

/// [`ContentRepository`] backed by the shared `content_record` table,
/// scoped to one kind.
#[derive(Clone)]
pub struct SeaOrmRepository {
    db: DatabaseConnection,
    kind: &'static str,
    order: ListOrder,
}

impl SeaOrmRepository {
    pub fn new(db: DatabaseConnection, kind: &'static str, order: ListOrder) -> Self {
        Self { db, kind, order }
    }

    async fn find_model(&self, id: &str) -> Result<content_record::Model, RepositoryError> {
        let id = Uuid::parse_str(id).map_err(|_| RepositoryError::NotFound)?;
        content_record::Entity::find_by_id(id)
            .filter(content_record::Column::Kind.eq(self.kind))
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}

fn into_record(model: content_record::Model) -> Result<ContentRecord, RepositoryError> {
    let Value::Object(fields) = model.fields else {
        return Err(RepositoryError::Corrupt(model.id));
    };
    Ok(ContentRecord {
        id: model.id.to_string(),
        fields,
        created_at: model.created_at,
        updated_at: model.updated_at,
        revision: model.revision,
    })
}

#[async_trait]
impl ContentRepository for SeaOrmRepository {
    async fn create(&self, fields: Map<String, Value>) -> Result<ContentRecord, RepositoryError> {
        let now = Utc::now();
        let model = content_record::ActiveModel {
            id: Set(Uuid::now_v7()),
            kind: Set(self.kind.to_string()),
            fields: Set(Value::Object(fields)),
            created_at: Set(now),
            updated_at: Set(now),
            revision: Set(0),
        }
        .insert(&self.db)
        .await?;

        into_record(model)
    }

    async fn find_by_id(&self, id: &str) -> Result<ContentRecord, RepositoryError> {
        into_record(self.find_model(id).await?)
    }

    async fn update(
        &self,
        id: &str,
        patch: Map<String, Value>,
        expected: Option<i64>,
    ) -> Result<ContentRecord, RepositoryError> {
        for _ in 0..MERGE_ATTEMPTS {
            let existing = self.find_model(id).await?;
            if expected.is_some_and(|revision| revision != existing.revision) {
                return Err(RepositoryError::Conflict(id.to_string()));
            }
            let mut fields = match &existing.fields {
                Value::Object(fields) => fields.clone(),
                _ => return Err(RepositoryError::Corrupt(existing.id)),
            };
            fields.extend(patch.clone());
            let fields = Value::Object(fields);
            let now = Utc::now();
            let revision = existing.revision + 1;

            // Compare-and-set on the revision that was read.
            let result = content_record::Entity::update_many()
                .col_expr(content_record::Column::Fields, Expr::value(fields.clone()))
                .col_expr(content_record::Column::UpdatedAt, Expr::value(now))
                .col_expr(content_record::Column::Revision, Expr::value(revision))
                .filter(content_record::Column::Id.eq(existing.id))
                .filter(content_record::Column::Kind.eq(self.kind))
                .filter(content_record::Column::Revision.eq(existing.revision))
                .exec(&self.db)
                .await?;

            if result.rows_affected > 0 {
                return into_record(content_record::Model {
                    fields,
                    updated_at: now,
                    revision,
                    ..existing
                });
            }
            if expected.is_some() {
                return Err(RepositoryError::Conflict(id.to_string()));
            }
            tracing::debug!(kind = self.kind, id, "record changed during update, retrying");
        }
        Err(RepositoryError::Conflict(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let id = Uuid::parse_str(id).map_err(|_| RepositoryError::NotFound)?;
        let result = content_record::Entity::delete_many()
            .filter(content_record::Column::Id.eq(id))
            .filter(content_record::Column::Kind.eq(self.kind))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<ContentRecord>, RepositoryError> {
        let order = match self.order {
            ListOrder::Insertion => Order::Asc,
            ListOrder::NewestFirst => Order::Desc,
        };
        let models = content_record::Entity::find()
            .filter(content_record::Column::Kind.eq(self.kind))
            .order_by(content_record::Column::CreatedAt, order.clone())
            .order_by(content_record::Column::Id, order)
            .all(&self.db)
            .await?;

        let mut records = Vec::with_capacity(models.len());
        for model in models {
            let record = into_record(model)?;
            if filter.matches(&record.fields) {
                records.push(record);
            }
        }
        Ok(records)
    }
}
