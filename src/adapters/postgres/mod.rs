//! PostgreSQL target adapter

pub mod client;
pub mod target;

pub use client::PostgresClient;
pub use target::PostgresTarget;
