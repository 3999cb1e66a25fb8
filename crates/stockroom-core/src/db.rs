use std::time::Duration;

use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::config::Config;
use crate::migrations::Migrator;

fn is_memory_sqlite(url: &str) -> bool {
    url.starts_with("sqlite::memory:") || url.contains("mode=memory")
}

/// Initialize the database connection from config.
///
/// An in-memory SQLite database lives only as long as its connection, so it
/// is pinned to a single connection that never expires.
pub async fn connect(config: &Config) -> Result<DatabaseConnection, sea_orm::DbErr> {
    let mut opts = ConnectOptions::new(&config.database_url);
    if is_memory_sqlite(&config.database_url) {
        opts.max_connections(1).min_connections(1);
    } else {
        opts.max_connections(20)
            .min_connections(1)
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800));
    }
    opts.connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(config.is_dev());

    SeaDatabase::connect(opts).await
}

/// Apply all pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), sea_orm::DbErr> {
    Migrator::up(db, None).await?;
    tracing::info!("migrations applied");
    Ok(())
}
