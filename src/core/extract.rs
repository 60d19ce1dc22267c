//! Extract stage
//!
//! Reads the next ordered batch of source records strictly after a
//! checkpoint and derives the continuation flag and the new checkpoint.
//! The whole query runs under a bounded execution budget so an unbounded
//! scan can never block the pipeline indefinitely.

use crate::adapters::traits::SourceStore;
use crate::core::transform::normalize_id;
use crate::domain::checkpoint::Checkpoint;
use crate::domain::envelope::{ExtractOutput, ExtractRequest, StageStatus};
use crate::domain::errors::{ExtractError, FerryError};
use crate::domain::result::Result;
use std::sync::Arc;
use std::time::Duration;

/// Extract stage over a source store
pub struct Extractor {
    source: Arc<dyn SourceStore>,
    query_timeout: Duration,
}

impl Extractor {
    pub fn new(source: Arc<dyn SourceStore>, query_timeout: Duration) -> Self {
        Self {
            source,
            query_timeout,
        }
    }

    /// Fetch one batch after the checkpoint
    ///
    /// `has_more` is true iff the batch reached exactly `batch_size`; an
    /// empty result carries no checkpoint. A timeout is retryable by the
    /// caller with the same checkpoint.
    pub async fn extract(&self, request: ExtractRequest) -> Result<ExtractOutput> {
        if request.batch_size == 0 {
            return Err(FerryError::Validation(
                "batch_size must be positive".to_string(),
            ));
        }

        let fetch = self
            .source
            .fetch_after(request.checkpoint.as_ref(), request.batch_size);
        let records = tokio::time::timeout(self.query_timeout, fetch)
            .await
            .map_err(|_| {
                FerryError::Extract(ExtractError::Timeout(format!(
                    "batch query exceeded {}ms",
                    self.query_timeout.as_millis()
                )))
            })??;

        if records.is_empty() {
            tracing::info!(checkpoint = ?request.checkpoint, "Source exhausted");
            return Ok(ExtractOutput {
                status: StageStatus::Ok,
                records,
                has_more: false,
                checkpoint: None,
            });
        }

        let has_more = records.len() == request.batch_size;
        let checkpoint = last_record_checkpoint(&records)?;

        tracing::info!(
            count = records.len(),
            has_more = has_more,
            checkpoint = %checkpoint,
            "Batch extracted"
        );

        Ok(ExtractOutput {
            status: StageStatus::Ok,
            records,
            has_more,
            checkpoint: Some(checkpoint),
        })
    }
}

fn last_record_checkpoint(records: &[serde_json::Value]) -> Result<Checkpoint> {
    let id = records
        .last()
        .and_then(|last| last.get("_id"))
        .and_then(normalize_id)
        .ok_or_else(|| {
            FerryError::Validation(
                "last record in batch carries no usable ordering identifier".to_string(),
            )
        })?;
    Checkpoint::new(id).map_err(FerryError::Validation)
}
