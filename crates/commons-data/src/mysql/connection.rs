//! MySQL connection wrapper around a `sqlx` pool

use std::collections::BTreeSet;

use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::MySqlPool;

use super::config::{MySqlConfig, SchemaCheck};
use crate::connection::{Connection, ConnectionState};
use crate::constants::HEALTH_CHECK_QUERY;
use crate::{Error, Result};

const TABLE_EXISTS_QUERY: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE table_schema = DATABASE() AND table_name = ?";

/// Connection to one MySQL or MariaDB database.
///
/// The handle is the pool; each manager call checks out its own session.
pub struct MySqlConnection {
    config: MySqlConfig,
    state: RwLock<ConnectionState<MySqlPool>>,
}

impl MySqlConnection {
    /// Open the pool, establishing at least one session before returning.
    pub async fn connect(config: &MySqlConfig) -> Result<Self> {
        let connect_options = config.connect_options()?;
        let pool = config
            .pool_options()
            .connect_with(connect_options)
            .await
            .map_err(|e| {
                tracing::warn!(
                    host = %config.address().server(),
                    database = %config.database(),
                    error = %e,
                    "MySQL handshake failed"
                );
                Error::Connection(format!(
                    "error connecting to mysql. Host: '{}', Database Name: '{}': {e}",
                    config.address().host(),
                    config.database()
                ))
            })?;

        if config.schema_check() == SchemaCheck::Validate
            && let Err(e) = validate_schema(&pool, config.entities()).await
        {
            pool.close().await;
            return Err(e);
        }

        tracing::info!(
            host = %config.address().server(),
            database = %config.database(),
            pooled = config.pool().is_some(),
            "Connected to MySQL"
        );

        Ok(Self {
            config: config.clone(),
            state: RwLock::new(ConnectionState::Connected(pool)),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &MySqlConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn disconnected(config: MySqlConfig) -> Self {
        Self {
            config,
            state: RwLock::new(ConnectionState::Disconnected),
        }
    }
}

async fn validate_schema(pool: &MySqlPool, tables: &BTreeSet<String>) -> Result<()> {
    let mut missing = Vec::new();
    for table in tables {
        let count: i64 = sqlx::query_scalar(TABLE_EXISTS_QUERY)
            .bind(table.as_str())
            .fetch_one(pool)
            .await?;
        if count == 0 {
            missing.push(table.as_str());
        }
    }

    if missing.is_empty() {
        tracing::debug!(tables = tables.len(), "Schema validated");
        Ok(())
    } else {
        Err(Error::config(format!(
            "schema validation failed, missing tables: {}",
            missing.join(", ")
        )))
    }
}

impl std::fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnection")
            .field("server", &self.config.address().server())
            .field("connected", &self.state.read().is_connected())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connection for MySqlConnection {
    type Handle = MySqlPool;

    fn state(&self) -> ConnectionState<MySqlPool> {
        self.state.read().clone()
    }

    async fn is_connected(&self) -> bool {
        match self.state() {
            ConnectionState::Connected(pool) => !pool.is_closed(),
            ConnectionState::Disconnected => false,
        }
    }

    async fn health_check(&self) -> Result<()> {
        let pool = self.handle()?;
        sqlx::query(HEALTH_CHECK_QUERY)
            .execute(&pool)
            .await
            .map_err(|e| {
                tracing::warn!(
                    host = %self.config.address().server(),
                    error = %e,
                    "MySQL health check failed"
                );
                Error::from(e)
            })?;
        Ok(())
    }

    fn is_registered(&self, name: &str) -> bool {
        self.config.entities().contains(name)
    }

    async fn close(&self) {
        let pool = self.state.write().take();
        if let Some(pool) = pool {
            pool.close().await;
            tracing::info!(
                host = %self.config.address().server(),
                "MySQL connection closed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mysql::MySqlOptions;

    fn config() -> MySqlConfig {
        let mut options = MySqlOptions::new("localhost", "shop");
        options.entities.insert("orders".to_string());
        MySqlConfig::new(options).unwrap()
    }

    #[tokio::test]
    async fn test_disconnected_liveness() {
        let connection = MySqlConnection::disconnected(config());
        assert!(!connection.is_connected().await);
        assert!(connection.health_check().await.unwrap_err().is_not_connected());
        assert!(connection.handle().unwrap_err().is_not_connected());
    }

    #[tokio::test]
    async fn test_close_when_disconnected() {
        let connection = MySqlConnection::disconnected(config());
        connection.close().await;
        assert!(!connection.state().is_connected());
    }

    #[test]
    fn test_is_registered() {
        let connection = MySqlConnection::disconnected(config());
        assert!(connection.is_registered("orders"));
        assert!(!connection.is_registered("customers"));
    }

    #[test]
    fn test_debug_output() {
        let connection = MySqlConnection::disconnected(config());
        let debug_str = format!("{connection:?}");
        assert!(debug_str.contains("localhost/shop"));
        assert!(debug_str.contains("connected: false"));
    }
}
