use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};

use crate::config::DatabaseConfig;
use crate::entity::content_record;

pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.clone());

    // Set connection pool options
    opt.max_connections(config.max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    create_tables(&db).await?;

    Ok(db)
}

/// Create the content table and its indexes if they do not exist yet.
async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut table = schema.create_table_from_entity(content_record::Entity);
    table.if_not_exists();
    db.execute_raw(backend.build(&table)).await?;

    for mut index in schema.create_index_from_entity(content_record::Entity) {
        index.if_not_exists();
        db.execute_raw(backend.build(&index)).await?;
    }

    Ok(())
}
