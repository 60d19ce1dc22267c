//! Load stage
//!
//! Upserts canonical records into the target store. Valid rows are chunked
//! into sub-batches of at most `max_batch_size`, each committed as one
//! atomic write; a failure partway through leaves previously committed
//! sub-batches durable and abandons the rest for this invocation, which is
//! safe to re-run because application is idempotent.
//!
//! Each sub-batch moves through
//! `PENDING → ATTEMPTING → {COMMITTED | RETRY_WAIT → ATTEMPTING | FAILED}`.
//! Transient write failures retry with linearly increasing backoff
//! (`base_delay * attempt_number`); permanent constraint violations
//! propagate immediately as data errors.

use crate::adapters::traits::TargetStore;
use crate::config::PipelineConfig;
use crate::domain::envelope::{LoadOutput, StageStatus, TransformOutput};
use crate::domain::errors::{LoadError, WriteError};
use crate::domain::records::{InvalidRecord, UserRow};
use crate::domain::result::Result;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// Sub-batch lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubBatchState {
    Pending,
    Attempting,
    RetryWait,
    Committed,
    Failed,
}

impl fmt::Display for SubBatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubBatchState::Pending => "pending",
            SubBatchState::Attempting => "attempting",
            SubBatchState::RetryWait => "retry_wait",
            SubBatchState::Committed => "committed",
            SubBatchState::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Chunking and retry tunables for the load stage
#[derive(Debug, Clone)]
pub struct LoadPolicy {
    /// Rows per atomically-committed sub-batch
    pub max_batch_size: usize,
    /// Retries per sub-batch for transient failures
    pub max_retries: usize,
    /// Base delay; attempt N waits `base_delay * N`
    pub base_delay: Duration,
}

impl LoadPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_batch_size: config.max_batch_size,
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }
}

/// Load stage over a target store
pub struct Loader {
    target: Arc<dyn TargetStore>,
    policy: LoadPolicy,
    dry_run: bool,
}

impl Loader {
    pub fn new(target: Arc<dyn TargetStore>, policy: LoadPolicy) -> Self {
        Self {
            target,
            policy,
            dry_run: false,
        }
    }

    /// Skip writes; validate and report what would be committed
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Upsert one transformed batch
    ///
    /// Records failing pre-write validation are collected into
    /// `invalid_records` without aborting the batch. Pagination state is
    /// passed through for the orchestrator.
    pub async fn load(&self, input: TransformOutput) -> Result<LoadOutput> {
        let mut invalid_records = Vec::new();
        let mut rows = Vec::with_capacity(input.transformed.len());

        for record in &input.transformed {
            match UserRow::try_from(record) {
                Ok(row) => rows.push(row),
                Err(reason) => {
                    tracing::warn!(
                        id = %record.id,
                        reason = %reason,
                        "Record rejected by pre-write validation"
                    );
                    invalid_records.push(InvalidRecord::new(record.id.clone(), reason));
                }
            }
        }

        let mut records_processed = 0;
        if self.dry_run {
            tracing::info!(
                count = rows.len(),
                "DRY RUN: would upsert {} records",
                rows.len()
            );
            records_processed = rows.len();
        } else {
            for (index, chunk) in rows.chunks(self.policy.max_batch_size).enumerate() {
                self.commit_sub_batch(index, chunk).await?;
                records_processed += chunk.len();
            }
        }

        tracing::info!(
            records_processed = records_processed,
            invalid = invalid_records.len(),
            "Batch loaded"
        );

        Ok(LoadOutput {
            status: StageStatus::Ok,
            records_processed,
            invalid_records,
            has_more: input.has_more,
            checkpoint: input.checkpoint,
        })
    }

    async fn commit_sub_batch(&self, index: usize, rows: &[UserRow]) -> Result<()> {
        let mut state = SubBatchState::Pending;
        tracing::trace!(sub_batch = index, state = %state, rows = rows.len(), "Sub-batch queued");
        let mut attempt = 0usize;

        loop {
            state = SubBatchState::Attempting;
            tracing::trace!(sub_batch = index, state = %state, rows = rows.len(), "Writing sub-batch");

            match self.target.upsert_chunk(rows).await {
                Ok(()) => {
                    state = SubBatchState::Committed;
                    tracing::debug!(sub_batch = index, state = %state, rows = rows.len(), "Sub-batch committed");
                    return Ok(());
                }
                Err(WriteError::Fatal(err)) => {
                    state = SubBatchState::Failed;
                    tracing::error!(sub_batch = index, state = %state, error = %err, "Sub-batch failed");
                    return Err(err);
                }
                Err(WriteError::Permanent { kind, message }) => {
                    state = SubBatchState::Failed;
                    tracing::error!(
                        sub_batch = index,
                        state = %state,
                        kind = %kind,
                        "Sub-batch failed on constraint violation"
                    );
                    return Err(LoadError::Permanent { kind, message }.into());
                }
                Err(WriteError::Transient { kind, message }) => {
                    attempt += 1;
                    if attempt > self.policy.max_retries {
                        state = SubBatchState::Failed;
                        tracing::error!(
                            sub_batch = index,
                            state = %state,
                            kind = %kind,
                            attempts = attempt,
                            "Sub-batch failed after exhausting retries"
                        );
                        return Err(LoadError::TransientExhausted {
                            kind,
                            attempts: attempt,
                            message,
                        }
                        .into());
                    }

                    state = SubBatchState::RetryWait;
                    let delay = self.policy.base_delay * attempt as u32;
                    tracing::warn!(
                        sub_batch = index,
                        state = %state,
                        kind = %kind,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Transient write failure, retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::checkpoint::Checkpoint;
    use crate::domain::errors::{ConstraintKind, FerryError, TransientKind};
    use crate::domain::records::CanonicalRecord;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Target double that replays a script of write outcomes, then succeeds
    struct ScriptedTarget {
        script: Mutex<VecDeque<WriteError>>,
        calls: Mutex<usize>,
        committed_chunks: Mutex<Vec<usize>>,
    }

    impl ScriptedTarget {
        fn new(script: Vec<WriteError>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
                committed_chunks: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }

        fn committed_chunks(&self) -> Vec<usize> {
            self.committed_chunks.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TargetStore for ScriptedTarget {
        async fn upsert_chunk(&self, rows: &[UserRow]) -> std::result::Result<(), WriteError> {
            *self.calls.lock().unwrap() += 1;
            if let Some(failure) = self.script.lock().unwrap().pop_front() {
                return Err(failure);
            }
            self.committed_chunks.lock().unwrap().push(rows.len());
            Ok(())
        }
    }

    fn transient(kind: TransientKind) -> WriteError {
        WriteError::Transient {
            kind,
            message: "injected".to_string(),
        }
    }

    fn canonical(id: &str) -> CanonicalRecord {
        CanonicalRecord {
            id: id.to_string(),
            username: String::new(),
            email: String::new(),
            created_at: None,
            updated_at: None,
        }
    }

    fn input(records: Vec<CanonicalRecord>) -> TransformOutput {
        TransformOutput {
            status: StageStatus::Ok,
            transformed: records,
            has_more: true,
            checkpoint: Some(Checkpoint::new("a9").unwrap()),
            error_count: 0,
        }
    }

    fn policy(max_batch_size: usize, max_retries: usize) -> LoadPolicy {
        LoadPolicy {
            max_batch_size,
            max_retries,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_load_chunks_into_sub_batches() {
        let target = ScriptedTarget::new(vec![]);
        let loader = Loader::new(target.clone(), policy(10, 3));

        let records = (0..25).map(|i| canonical(&format!("u-{i:02}"))).collect();
        let output = loader.load(input(records)).await.unwrap();

        assert_eq!(output.records_processed, 25);
        assert_eq!(target.committed_chunks(), vec![10, 10, 5]);
        assert!(output.has_more);
        assert_eq!(output.checkpoint.unwrap().as_str(), "a9");
    }

    #[tokio::test]
    async fn test_transient_failure_retried_then_succeeds() {
        let target = ScriptedTarget::new(vec![
            transient(TransientKind::Deadlock),
            transient(TransientKind::Serialization),
        ]);
        let loader = Loader::new(target.clone(), policy(10, 3));

        let output = loader.load(input(vec![canonical("u-1")])).await.unwrap();
        assert_eq!(output.records_processed, 1);
        assert_eq!(target.calls(), 3);
    }

    #[tokio::test]
    async fn test_transient_failure_exhausts_retries_then_fails_closed() {
        let target = ScriptedTarget::new(vec![
            transient(TransientKind::PoolExhausted),
            transient(TransientKind::PoolExhausted),
            transient(TransientKind::PoolExhausted),
            transient(TransientKind::PoolExhausted),
        ]);
        let loader = Loader::new(target.clone(), policy(10, 3));

        let err = loader.load(input(vec![canonical("u-1")])).await.unwrap_err();
        // Initial attempt plus max_retries retries
        assert_eq!(target.calls(), 4);
        assert!(matches!(
            err,
            FerryError::Load(LoadError::TransientExhausted { attempts: 4, .. })
        ));
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let target = ScriptedTarget::new(vec![WriteError::Permanent {
            kind: ConstraintKind::ForeignKey,
            message: "fk".to_string(),
        }]);
        let loader = Loader::new(target.clone(), policy(10, 3));

        let err = loader.load(input(vec![canonical("u-1")])).await.unwrap_err();
        assert_eq!(target.calls(), 1);
        assert!(matches!(
            err,
            FerryError::Load(LoadError::Permanent {
                kind: ConstraintKind::ForeignKey,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_partial_failure_leaves_committed_sub_batches() {
        // First chunk commits; the second hits a permanent violation
        struct FailSecondChunk {
            inner: Arc<ScriptedTarget>,
        }

        #[async_trait]
        impl TargetStore for FailSecondChunk {
            async fn upsert_chunk(
                &self,
                rows: &[UserRow],
            ) -> std::result::Result<(), WriteError> {
                if self.inner.calls() == 1 {
                    *self.inner.calls.lock().unwrap() += 1;
                    return Err(WriteError::Permanent {
                        kind: ConstraintKind::Unique,
                        message: "dup".to_string(),
                    });
                }
                self.inner.upsert_chunk(rows).await
            }
        }

        let inner = ScriptedTarget::new(vec![]);
        let loader = Loader::new(
            Arc::new(FailSecondChunk {
                inner: inner.clone(),
            }),
            policy(2, 0),
        );
        let records = vec![canonical("u-1"), canonical("u-2"), canonical("u-3")];

        let err = loader.load(input(records)).await.unwrap_err();
        assert!(matches!(err, FerryError::Load(LoadError::Permanent { .. })));
        // The first sub-batch stayed durable
        assert_eq!(inner.committed_chunks(), vec![2]);
    }

    #[tokio::test]
    async fn test_invalid_records_collected_without_aborting() {
        let target = ScriptedTarget::new(vec![]);
        let loader = Loader::new(target.clone(), policy(10, 3));

        let mut bad_timestamp = canonical("u-2");
        bad_timestamp.created_at = Some("garbage".to_string());

        let records = vec![canonical("u-1"), canonical(""), bad_timestamp, canonical("u-4")];
        let output = loader.load(input(records)).await.unwrap();

        assert_eq!(output.records_processed, 2);
        assert_eq!(output.invalid_records.len(), 2);
        assert_eq!(output.invalid_records[0].reason, "missing id");
        assert!(output.invalid_records[1].reason.contains("created_at"));
    }

    #[tokio::test]
    async fn test_dry_run_skips_writes() {
        let target = ScriptedTarget::new(vec![]);
        let loader = Loader::new(target.clone(), policy(10, 3)).with_dry_run(true);

        let output = loader.load(input(vec![canonical("u-1")])).await.unwrap();
        assert_eq!(output.records_processed, 1);
        assert_eq!(target.calls(), 0);
    }

    #[test]
    fn test_sub_batch_state_display() {
        assert_eq!(SubBatchState::Pending.to_string(), "pending");
        assert_eq!(SubBatchState::RetryWait.to_string(), "retry_wait");
        assert_eq!(SubBatchState::Committed.to_string(), "committed");
    }
}
