//! CLI command implementations

pub mod init;
pub mod run;
pub mod stages;
pub mod validate;

use crate::adapters::mongo::{MongoConnection, MongoSource};
use crate::adapters::postgres::{PostgresClient, PostgresTarget};
use crate::adapters::secrets::{EnvSecretStore, SecretCache};
use crate::config::FerryConfig;
use crate::core::extract::Extractor;
use crate::core::load::{LoadPolicy, Loader};
use std::sync::Arc;
use std::time::Duration;

/// Process-lifetime secret cache over the environment-backed store
pub(crate) fn secret_cache() -> Arc<SecretCache> {
    Arc::new(SecretCache::new(Arc::new(EnvSecretStore)))
}

pub(crate) fn build_extractor(config: &FerryConfig, secrets: Arc<SecretCache>) -> Extractor {
    let connection = Arc::new(MongoConnection::new(config.source.clone(), secrets));
    Extractor::new(
        Arc::new(MongoSource::new(connection)),
        Duration::from_millis(config.source.socket_timeout_ms),
    )
}

pub(crate) fn build_loader(
    config: &FerryConfig,
    secrets: Arc<SecretCache>,
) -> (Loader, Arc<PostgresClient>) {
    let client = Arc::new(PostgresClient::new(config.target.clone(), secrets));
    let target = Arc::new(PostgresTarget::new(client.clone()));
    let loader = Loader::new(target, LoadPolicy::from_config(&config.pipeline))
        .with_dry_run(config.application.dry_run);
    (loader, client)
}
