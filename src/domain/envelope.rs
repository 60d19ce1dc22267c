//! Stage input/output envelopes
//!
//! Each stage is invoked with a serde-friendly envelope and produces one,
//! so an external orchestrator can drive the stages as separate processes
//! and thread `has_more`/`checkpoint` between them as ordinary data. The
//! Transform and Load stages forward pagination state unchanged.

use crate::domain::checkpoint::Checkpoint;
use crate::domain::records::{CanonicalRecord, InvalidRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope status; failures propagate as errors, never inside an envelope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    #[default]
    Ok,
}

/// Extract stage input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractRequest {
    /// Resume position; `None` starts from the beginning of the dataset
    #[serde(default)]
    pub checkpoint: Option<Checkpoint>,

    /// Maximum number of records to return; must be positive
    pub batch_size: usize,
}

/// Extract stage output, consumed by the Transform stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractOutput {
    #[serde(default)]
    pub status: StageStatus,

    /// Source-shaped records in ascending source order
    pub records: Vec<Value>,

    /// True iff the batch reached exactly `batch_size`
    pub has_more: bool,

    /// Position of the last record in this batch; `None` when empty
    pub checkpoint: Option<Checkpoint>,
}

/// Transform stage output, consumed by the Load stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformOutput {
    #[serde(default)]
    pub status: StageStatus,

    /// Canonical records, input order preserved among survivors
    pub transformed: Vec<CanonicalRecord>,

    pub has_more: bool,

    pub checkpoint: Option<Checkpoint>,

    /// Count of records rejected during normalization
    pub error_count: usize,
}

/// Load stage output, returned to the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOutput {
    #[serde(default)]
    pub status: StageStatus,

    /// Total records committed (or validated, under dry-run)
    pub records_processed: usize,

    /// Records rejected by pre-write validation, reported inline
    pub invalid_records: Vec<InvalidRecord>,

    pub has_more: bool,

    pub checkpoint: Option<Checkpoint>,
}
