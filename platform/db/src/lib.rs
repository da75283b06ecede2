//! Database primitives: settings from the environment, connection, health ping.

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing (set {0})")]
    MissingUrl(String),
    #[error("invalid {key}: {value}")]
    InvalidSetting { key: &'static str, value: String },
    #[error("failed to connect to database: {0}")]
    Connect(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

/// Environment-driven connection settings.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub log_statements: bool,
}

fn default_max_connections() -> u32 {
    10
}

impl DatabaseSettings {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            log_statements: false,
        }
    }

    /// Reads `DATABASE_URL`, `DB_MAX_CONNECTIONS` and `DB_LOG_STATEMENTS`.
    pub fn from_env() -> DbResult<Self> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DbError::MissingUrl("DATABASE_URL".into()))?;
        let mut settings = Self::new(url);
        if let Ok(raw) = std::env::var("DB_MAX_CONNECTIONS") {
            settings.max_connections = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(DbError::InvalidSetting {
                    key: "DB_MAX_CONNECTIONS",
                    value: raw,
                })?;
        }
        settings.log_statements = std::env::var("DB_LOG_STATEMENTS")
            .ok()
            .map(|val| matches!(val.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Ok(settings)
    }

    fn connect_options(&self) -> ConnectOptions {
        let mut options = ConnectOptions::new(self.url.clone());
        options
            .max_connections(self.max_connections)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(self.log_statements);
        options
    }
}

pub async fn connect(settings: &DatabaseSettings) -> DbResult<DatabaseConnection> {
    let db = Database::connect(settings.connect_options()).await?;
    info!(
        backend = ?db.get_database_backend(),
        max_connections = settings.max_connections,
        "database connected"
    );
    Ok(db)
}

/// `SELECT 1` against the configured backend.
pub async fn ping(db: &DatabaseConnection) -> bool {
    let backend = db.get_database_backend();
    db.execute(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sqlite_memory_connects_and_pings() {
        let settings = DatabaseSettings::new("sqlite::memory:");
        let db = connect(&settings).await.unwrap();
        assert!(ping(&db).await);
    }

    #[test]
    fn new_settings_use_defaults() {
        let settings = DatabaseSettings::new("postgres://localhost/hr");
        assert_eq!(settings.max_connections, 10);
        assert!(!settings.log_statements);
    }
}
