//! Sweep summary
//!
//! Accumulated across the batches of one pipeline sweep and reported to
//! the operator when the sweep ends.

use crate::domain::checkpoint::Checkpoint;
use crate::domain::records::InvalidRecord;
use std::fmt;
use std::time::Duration;

/// Totals for one pipeline sweep
#[derive(Debug, Clone, Default)]
pub struct SweepSummary {
    /// Batches completed end-to-end
    pub batches: usize,
    /// Records read from the source
    pub records_extracted: usize,
    /// Records surviving transformation
    pub records_transformed: usize,
    /// Records committed to the target
    pub records_loaded: usize,
    /// Records rejected during transformation
    pub transform_errors: usize,
    /// Records rejected by pre-write validation
    pub invalid_records: Vec<InvalidRecord>,
    /// Last checkpoint produced by the sweep
    pub final_checkpoint: Option<Checkpoint>,
    /// True when a shutdown signal stopped the sweep before exhaustion
    pub interrupted: bool,
    /// Wall-clock duration of the sweep
    pub duration: Duration,
}

impl SweepSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one completed batch into the totals
    pub fn record_batch(
        &mut self,
        extracted: usize,
        transformed: usize,
        transform_errors: usize,
        loaded: usize,
        invalid: &[InvalidRecord],
    ) {
        self.batches += 1;
        self.records_extracted += extracted;
        self.records_transformed += transformed;
        self.transform_errors += transform_errors;
        self.records_loaded += loaded;
        self.invalid_records.extend_from_slice(invalid);
    }

    /// True when every extracted record was committed
    pub fn is_clean(&self) -> bool {
        self.transform_errors == 0 && self.invalid_records.is_empty() && !self.interrupted
    }
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sweep summary")?;
        writeln!(f, "  batches:             {}", self.batches)?;
        writeln!(f, "  records extracted:   {}", self.records_extracted)?;
        writeln!(f, "  records transformed: {}", self.records_transformed)?;
        writeln!(f, "  records loaded:      {}", self.records_loaded)?;
        writeln!(f, "  transform errors:    {}", self.transform_errors)?;
        writeln!(f, "  invalid records:     {}", self.invalid_records.len())?;
        if let Some(checkpoint) = &self.final_checkpoint {
            writeln!(f, "  final checkpoint:    {checkpoint}")?;
        }
        if self.interrupted {
            writeln!(f, "  interrupted by shutdown signal")?;
        }
        write!(f, "  duration:            {:.2}s", self.duration.as_secs_f64())
    }
}
