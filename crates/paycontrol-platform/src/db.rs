use anyhow::{Context, Result};
use sqlx::{PgPool, postgres::PgPoolOptions};

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

pub async fn connect_database(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Creates missing tables and indexes. Every statement is idempotent.
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .context("failed to apply database schema")?;

    Ok(())
}
