//! MongoDB connection management
//!
//! Connection handles are expensive to establish, so one client is built
//! lazily and reused across invocations. On any connectivity failure the
//! handle is invalidated wholesale; the next acquire builds a fresh client
//! and health-checks it with a `ping` before use, so a half-open handle is
//! never reused for a query.

use crate::adapters::secrets::{require_str, SecretCache};
use crate::config::SourceConfig;
use crate::domain::errors::{ExtractError, FerryError};
use crate::domain::result::Result;
use mongodb::bson::doc;
use mongodb::error::ErrorKind;
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Cached MongoDB client with acquire/invalidate discipline
pub struct MongoConnection {
    config: SourceConfig,
    secrets: Arc<SecretCache>,
    client: Mutex<Option<Client>>,
}

impl MongoConnection {
    pub fn new(config: SourceConfig, secrets: Arc<SecretCache>) -> Self {
        Self {
            config,
            secrets,
            client: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Per-operation execution budget, distinct from connection timeouts
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.config.socket_timeout_ms)
    }

    /// Get the cached client, building and health-checking one if needed
    pub async fn acquire(&self) -> Result<Client> {
        let mut cached = self.client.lock().await;
        if let Some(client) = cached.as_ref() {
            return Ok(client.clone());
        }

        let client = self.build_client().await?;

        client
            .database(&self.config.database)
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| FerryError::Extract(map_driver_error(&e)))?;

        tracing::info!(
            database = %self.config.database,
            collection = %self.config.collection,
            "MongoDB connection established"
        );

        *cached = Some(client.clone());
        Ok(client)
    }

    /// Drop the cached handle and its cached credentials
    pub async fn invalidate(&self) {
        *self.client.lock().await = None;
        self.secrets.invalidate(&self.config.secret_name).await;
        tracing::warn!("MongoDB connection invalidated");
    }

    async fn build_client(&self) -> Result<Client> {
        let secret = self.secrets.get(&self.config.secret_name).await?;
        let uri = require_str(&secret, &self.config.secret_name, "uri")?;

        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| FerryError::Extract(ExtractError::Connection(e.to_string())))?;

        options.app_name = Some("ferry".to_string());
        options.connect_timeout = Some(Duration::from_millis(self.config.connect_timeout_ms));
        options.server_selection_timeout = Some(Duration::from_millis(
            self.config.server_selection_timeout_ms,
        ));
        options.max_pool_size = Some(self.config.max_pool_size);

        Client::with_options(options)
            .map_err(|e| FerryError::Extract(ExtractError::Connection(e.to_string())))
    }
}

/// Map a driver error into the extract-stage taxonomy
///
/// Connectivity-class failures (network, DNS, server selection, auth) are
/// retryable by re-invocation after handle invalidation; a server-side
/// `MaxTimeMSExpired` is a timeout, retryable with the same checkpoint.
pub(crate) fn map_driver_error(err: &mongodb::error::Error) -> ExtractError {
    match err.kind.as_ref() {
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::DnsResolve { .. }
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::Authentication { .. } => ExtractError::Connection(err.to_string()),
        // 50 = MaxTimeMSExpired
        ErrorKind::Command(command) if command.code == 50 => {
            ExtractError::Timeout(err.to_string())
        }
        _ => ExtractError::Query(err.to_string()),
    }
}

pub(crate) fn is_connection(err: &ExtractError) -> bool {
    matches!(err, ExtractError::Connection(_))
}
