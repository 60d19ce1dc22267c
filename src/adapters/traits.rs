//! Store abstraction traits
//!
//! These traits are the seams between the pipeline stages and the concrete
//! store drivers: an ordered-paginated-query primitive for the source and
//! an atomic batched-upsert primitive for the target. Stage logic depends
//! only on these, so its pagination and retry behavior is testable without
//! live stores.

use crate::domain::checkpoint::Checkpoint;
use crate::domain::errors::WriteError;
use crate::domain::records::UserRow;
use crate::domain::result::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Ordered, paginated read access to the source store
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Fetch up to `limit` records strictly after `checkpoint` in the
    /// source's total order, ascending
    ///
    /// `None` starts from the beginning of the dataset. Returned records
    /// are source-shaped JSON values; each carries the ordering field the
    /// next checkpoint is derived from.
    async fn fetch_after(
        &self,
        checkpoint: Option<&Checkpoint>,
        limit: usize,
    ) -> Result<Vec<Value>>;
}

/// Batched, idempotent write access to the target store
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Upsert one sub-batch atomically: all rows commit or none do
    ///
    /// Each row is upserted by `id`; on conflict the mutable fields
    /// (`username`, `email`, `updated_at`) are overwritten and
    /// `created_at` is preserved. Failures come back classified so the
    /// caller's retry policy can dispatch on them.
    async fn upsert_chunk(&self, rows: &[UserRow]) -> std::result::Result<(), WriteError>;
}
