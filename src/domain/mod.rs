//! Domain models and types for Ferry.
//!
//! This module contains the core domain types shared by all pipeline
//! stages:
//!
//! - **Pagination state** ([`Checkpoint`]): opaque, totally-ordered resume
//!   position threaded through the pipeline as ordinary data
//! - **Record models** ([`CanonicalRecord`], [`UserRow`], [`InvalidRecord`])
//! - **Stage envelopes** ([`ExtractRequest`], [`ExtractOutput`],
//!   [`TransformOutput`], [`LoadOutput`])
//! - **Error taxonomy** ([`FerryError`], [`ExtractError`], [`LoadError`],
//!   [`WriteError`]) with per-class recovery policy
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T>`]:
//!
//! ```rust
//! use ferry::domain::{FerryError, Result};
//!
//! fn example() -> Result<()> {
//!     let config = ferry::config::load_config("ferry.toml")?;
//!     Ok(())
//! }
//! ```

pub mod checkpoint;
pub mod envelope;
pub mod errors;
pub mod records;
pub mod result;

// Re-export commonly used types for convenience
pub use checkpoint::Checkpoint;
pub use envelope::{ExtractOutput, ExtractRequest, LoadOutput, StageStatus, TransformOutput};
pub use errors::{
    ConstraintKind, ExtractError, FerryError, LoadError, TransientKind, WriteError,
};
pub use records::{CanonicalRecord, InvalidRecord, UserRow};
pub use result::Result;
