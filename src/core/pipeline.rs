//! Host-side sweep driver
//!
//! The stages are independently invokable; this driver is the in-process
//! orchestrator that threads the checkpoint through repeated
//! Extract → Transform → Load rounds until the source is exhausted. It is
//! the only component that holds pagination state, and it holds it as a
//! local variable, never shared.
//!
//! The shutdown signal is honored between batches only; a batch in flight
//! runs to completion so its sub-batch accounting stays coherent.

use crate::core::extract::Extractor;
use crate::core::load::Loader;
use crate::core::summary::SweepSummary;
use crate::core::transform::transform;
use crate::domain::checkpoint::Checkpoint;
use crate::domain::envelope::ExtractRequest;
use crate::domain::result::Result;
use std::time::Instant;
use tokio::sync::watch;

/// One full-dataset sweep over the three stages
pub struct Pipeline {
    extractor: Extractor,
    loader: Loader,
    batch_size: usize,
}

impl Pipeline {
    pub fn new(extractor: Extractor, loader: Loader, batch_size: usize) -> Self {
        Self {
            extractor,
            loader,
            batch_size,
        }
    }

    /// Run Extract → Transform → Load rounds until `has_more` is false
    ///
    /// Stage failures propagate immediately; completed batches stay
    /// durable, and re-running the sweep from `resume_from` (or from the
    /// start) is safe because load application is idempotent.
    pub async fn run_sweep(
        &self,
        resume_from: Option<Checkpoint>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<SweepSummary> {
        let started = Instant::now();
        let mut summary = SweepSummary::new();
        let mut checkpoint = resume_from;

        loop {
            if *shutdown.borrow() {
                tracing::warn!("Shutdown requested, stopping sweep between batches");
                summary.interrupted = true;
                break;
            }

            let extracted = self
                .extractor
                .extract(ExtractRequest {
                    checkpoint: checkpoint.clone(),
                    batch_size: self.batch_size,
                })
                .await?;
            let extracted_count = extracted.records.len();

            let transformed = transform(extracted);
            let transformed_count = transformed.transformed.len();
            let transform_errors = transformed.error_count;

            let loaded = self.loader.load(transformed).await?;

            summary.record_batch(
                extracted_count,
                transformed_count,
                transform_errors,
                loaded.records_processed,
                &loaded.invalid_records,
            );

            tracing::info!(
                batch = summary.batches,
                extracted = extracted_count,
                loaded = loaded.records_processed,
                has_more = loaded.has_more,
                "Batch complete"
            );

            checkpoint = loaded.checkpoint;
            if !loaded.has_more {
                break;
            }
        }

        summary.final_checkpoint = checkpoint;
        summary.duration = started.elapsed();
        Ok(summary)
    }
}
