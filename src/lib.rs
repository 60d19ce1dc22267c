// Ferry - MongoDB to PostgreSQL batch ETL
// Copyright (c) 2025 Ferry Contributors
// Licensed under the MIT License

//! # Ferry - MongoDB to PostgreSQL batch ETL
//!
//! Ferry moves records in bounded batches from a MongoDB collection to a
//! PostgreSQL table through three composable stages:
//!
//! - **Extract** reads the next ordered batch after a checkpoint and
//!   reports whether the source holds more
//! - **Transform** normalizes source-shaped records (polymorphic id and
//!   date representations included) to the canonical target schema,
//!   counting rather than failing on malformed records
//! - **Load** upserts batches idempotently, committing per sub-batch and
//!   retrying transient failures with linear backoff
//!
//! Each stage is independently invokable and stateless except for the
//! checkpoint, which flows through the stage envelopes as ordinary data.
//! A dataset larger than one invocation makes forward progress by
//! re-invoking Extract with the last checkpoint while `has_more` is true,
//! without duplicating, dropping, or corrupting records, even when stage
//! invocations fail and are retried.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface: full sweeps and single-stage
//!   invocations over JSON envelopes
//! - [`core`] - Stage logic (extract, transform, load) and the sweep driver
//! - [`adapters`] - Store drivers and the credential collaborator, behind
//!   trait seams
//! - [`domain`] - Checkpoint, records, envelopes, and the error taxonomy
//! - [`config`] - TOML configuration with environment overrides
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ferry::adapters::mongo::{MongoConnection, MongoSource};
//! use ferry::adapters::postgres::{PostgresClient, PostgresTarget};
//! use ferry::adapters::secrets::{EnvSecretStore, SecretCache};
//! use ferry::core::{Extractor, LoadPolicy, Loader, Pipeline};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ferry::config::load_config("ferry.toml")?;
//!     let secrets = Arc::new(SecretCache::new(Arc::new(EnvSecretStore)));
//!
//!     let source = Arc::new(MongoSource::new(Arc::new(MongoConnection::new(
//!         config.source.clone(),
//!         secrets.clone(),
//!     ))));
//!     let target = Arc::new(PostgresTarget::new(Arc::new(PostgresClient::new(
//!         config.target.clone(),
//!         secrets,
//!     ))));
//!
//!     let pipeline = Pipeline::new(
//!         Extractor::new(source, Duration::from_millis(config.source.socket_timeout_ms)),
//!         Loader::new(target, LoadPolicy::from_config(&config.pipeline)),
//!         config.pipeline.batch_size,
//!     );
//!
//!     let (_tx, shutdown) = tokio::sync::watch::channel(false);
//!     let summary = pipeline.run_sweep(None, shutdown).await?;
//!     println!("{summary}");
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Failures are classified, not caught wholesale: connectivity and timeout
//! errors are retryable by re-invocation with the same checkpoint,
//! credential failures need operator action, per-record validation
//! failures are reported inline, and write failures split into transient
//! classes (retried with backoff) and permanent constraint violations
//! (propagated immediately). See [`domain::FerryError`].
//!
//! ## Logging
//!
//! Ferry uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(count = 1000, has_more = true, "Batch extracted");
//! warn!(sub_batch = 3, attempt = 2, "Transient write failure, retrying");
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
