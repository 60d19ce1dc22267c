//! Result type alias for Ferry operations

use crate::domain::errors::FerryError;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, FerryError>;
