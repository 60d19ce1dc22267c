//! PostgreSQL connection pool management
//!
//! Builds a deadpool connection pool from secret-resolved credentials,
//! caches it for the process lifetime, and invalidates it wholesale on
//! connectivity failure, mirroring the source-side handle discipline.

use crate::adapters::secrets::{require_str, SecretCache};
use crate::config::TargetConfig;
use crate::domain::errors::{FerryError, LoadError};
use crate::domain::result::Result;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_postgres::NoTls;

/// Cached PostgreSQL pool with acquire/invalidate discipline
pub struct PostgresClient {
    config: TargetConfig,
    secrets: Arc<SecretCache>,
    pool: Mutex<Option<Pool>>,
}

impl PostgresClient {
    pub fn new(config: TargetConfig, secrets: Arc<SecretCache>) -> Self {
        Self {
            config,
            secrets,
            pool: Mutex::new(None),
        }
    }

    pub fn statement_timeout_ms(&self) -> u64 {
        self.config.statement_timeout_seconds * 1_000
    }

    /// Get the cached pool, building one if needed
    pub async fn acquire(&self) -> Result<Pool> {
        let mut cached = self.pool.lock().await;
        if let Some(pool) = cached.as_ref() {
            return Ok(pool.clone());
        }

        let pool = self.build_pool().await?;
        tracing::info!(
            max_connections = self.config.max_connections,
            "PostgreSQL connection pool created"
        );

        *cached = Some(pool.clone());
        Ok(pool)
    }

    /// Drop the cached pool and its cached credentials
    pub async fn invalidate(&self) {
        *self.pool.lock().await = None;
        self.secrets.invalidate(&self.config.secret_name).await;
        tracing::warn!("PostgreSQL connection pool invalidated");
    }

    /// Apply the bundled schema migration, creating the users table and
    /// its indexes if they don't exist
    pub async fn ensure_schema(&self) -> Result<()> {
        let pool = self.acquire().await?;
        let client = pool
            .get()
            .await
            .map_err(|e| FerryError::Load(LoadError::Connection(e.to_string())))?;

        let migration_sql = include_str!("../../../migrations/001_initial_schema.sql");
        client
            .batch_execute(migration_sql)
            .await
            .map_err(|e| FerryError::Load(LoadError::Statement(e.to_string())))?;

        tracing::info!("PostgreSQL schema initialized");
        Ok(())
    }

    async fn build_pool(&self) -> Result<Pool> {
        let secret_name = &self.config.secret_name;
        let secret = self.secrets.get(secret_name).await?;

        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(require_str(&secret, secret_name, "host")?);
        pg_config.dbname(require_str(&secret, secret_name, "dbname")?);
        pg_config.user(require_str(&secret, secret_name, "user")?);
        pg_config.password(require_str(&secret, secret_name, "password")?);
        pg_config.connect_timeout(Duration::from_secs(self.config.connect_timeout_seconds));

        // Port is optional in the secret; PostgreSQL's default applies
        if let Some(port) = secret.get("port") {
            let port = port.expose_secret().parse::<u16>().map_err(|_| {
                FerryError::CredentialUnavailable(format!(
                    "secret '{secret_name}' has a non-numeric port"
                ))
            })?;
            pg_config.port(port);
        }

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let wait = Duration::from_secs(self.config.connect_timeout_seconds);
        Pool::builder(manager)
            .max_size(self.config.max_connections)
            .wait_timeout(Some(wait))
            .create_timeout(Some(wait))
            .recycle_timeout(Some(wait))
            .build()
            .map_err(|e| {
                FerryError::Load(LoadError::Pool(format!(
                    "Failed to create connection pool: {e}"
                )))
            })
    }
}
