//! Database connection and pool management

use crate::dialect::Dialect;
use sqlmail_common::config::DatabaseConfig;
use sqlmail_common::{Error, Result};
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use std::time::Duration;
use tracing::info;

/// Database pool wrapper
#[derive(Clone)]
pub struct DatabasePool {
    pool: AnyPool,
    dialect: Dialect,
}

impl DatabasePool {
    /// Create a new database pool from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        sqlx::any::install_default_drivers();

        let dialect = Dialect::from_url(&config.url)?;

        info!(dialect = ?dialect, "Connecting to database");

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.url)
            .await
            .map_err(|e| Error::Database(format!("Failed to connect: {}", e)))?;

        info!("Database connection established");

        Ok(Self { pool, dialect })
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// The SQL dialect of the connected backend
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Create the mailbox store schema if it does not exist yet.
    ///
    /// The schema is created statement by statement in code rather
    /// than through embedded sqlx migrations, which do not run on the
    /// Any driver.
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing mailbox store schema");

        let pk = self.dialect.auto_increment_pk();
        let blob = self.dialect.blob_type();

        let statements = [
            format!(
                "CREATE TABLE IF NOT EXISTS accounts (
                    id {pk},
                    name TEXT NOT NULL UNIQUE,
                    size_limit_set INTEGER NOT NULL DEFAULT 0,
                    size_limit BIGINT
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS mailboxes (
                    id {pk},
                    account_id BIGINT NOT NULL,
                    name TEXT NOT NULL,
                    subscribed INTEGER NOT NULL DEFAULT 1,
                    marked INTEGER NOT NULL DEFAULT 0,
                    size_limit_set INTEGER NOT NULL DEFAULT 0,
                    size_limit BIGINT,
                    uid_validity BIGINT NOT NULL,
                    uid_next BIGINT NOT NULL DEFAULT 1,
                    UNIQUE (account_id, name)
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS messages (
                    mailbox_id BIGINT NOT NULL,
                    uid BIGINT NOT NULL,
                    internal_date BIGINT NOT NULL,
                    header_len BIGINT NOT NULL,
                    header {blob},
                    body_len BIGINT NOT NULL,
                    body {blob},
                    marked_for_removal INTEGER NOT NULL DEFAULT 0,
                    PRIMARY KEY (mailbox_id, uid)
                )"
            ),
            "CREATE TABLE IF NOT EXISTS flags (
                mailbox_id BIGINT NOT NULL,
                uid BIGINT NOT NULL,
                flag TEXT NOT NULL,
                PRIMARY KEY (mailbox_id, uid, flag)
            )"
            .to_string(),
            "CREATE INDEX IF NOT EXISTS idx_flags_mbox_flag
                ON flags (mailbox_id, flag)"
                .to_string(),
        ];

        for stmt in &statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        }

        Ok(())
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Health check failed: {}", e)))?;
        Ok(())
    }
}
