//! Shared harness for tests that need a real Postgres.
//!
//! Point `TEST_DATABASE_URL` at a disposable database; every context wipes it.

use anyhow::{Context, Result};
use migration::{Migrator, MigratorTrait};
use sea_orm::{Database, DatabaseConnection};

pub struct PgTestContext {
    pub db: DatabaseConnection,
}

impl PgTestContext {
    /// `None` when no database is configured, so callers can skip quietly.
    pub async fn fresh() -> Result<Option<Self>> {
        let url = match std::env::var("TEST_DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                eprintln!("skipping Postgres tests: TEST_DATABASE_URL not set");
                return Ok(None);
            }
        };
        let db = Database::connect(&url)
            .await
            .with_context(|| "failed to connect to TEST_DATABASE_URL")?;
        Migrator::fresh(&db).await.context("failed to rebuild schema")?;
        Ok(Some(Self { db }))
    }
}
