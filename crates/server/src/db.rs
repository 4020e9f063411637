use std::env;

use anyhow::Context;
use realtime_migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

pub async fn init_pool_and_migrate() -> anyhow::Result<DatabaseConnection> {
    let database_url =
        env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;

    connect_and_migrate(&database_url).await
}

pub async fn connect_and_migrate(database_url: &str) -> anyhow::Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_string());
    options.sqlx_logging(false);
    // 内存 SQLite 的每个连接都是独立的数据库，只保留一个连接。
    if database_url.starts_with("sqlite::memory:") {
        options.max_connections(1);
    }

    let db = Database::connect(options)
        .await
        .context("failed to connect to database")?;

    Migrator::up(&db, None)
        .await
        .context("failed to run database migrations")?;

    Ok(db)
}
