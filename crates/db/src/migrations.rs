use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub const PROCUREMENT_TABLES: [&str; 3] = ["vendor", "purchase_order", "historical_performance"];

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Versions recorded in the migration ledger; empty for a fresh database.
pub async fn applied_versions(pool: &DbPool) -> Result<Vec<i64>, sqlx::Error> {
    let (ledger_exists,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;
    if ledger_exists == 0 {
        return Ok(Vec::new());
    }

    sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success = 1 ORDER BY version")
        .fetch_all(pool)
        .await
}

/// Names of procurement tables missing from the connected database.
pub async fn missing_tables(pool: &DbPool) -> Result<Vec<&'static str>, sqlx::Error> {
    let mut missing = Vec::new();
    for table in PROCUREMENT_TABLES {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_one(pool)
                .await?;
        if count == 0 {
            missing.push(table);
        }
    }
    Ok(missing)
}
