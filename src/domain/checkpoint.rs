//! Checkpoint type for resumable pagination
//!
//! A checkpoint is the opaque, totally-ordered position of the last record
//! consumed from the source ordering. It is created by the Extract stage,
//! threaded unchanged through Transform and Load outputs, and consumed by
//! the next Extract invocation. `None` means "start of dataset".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque position in the source's total order
///
/// The inner value is the canonical string form of the source ordering
/// field (an auto-generated object id by default). Object id hex strings
/// are fixed-width, so lexicographic order matches insertion order, and
/// `Checkpoint` derives its ordering from that.
///
/// # Examples
///
/// ```
/// use ferry::domain::Checkpoint;
/// use std::str::FromStr;
///
/// let a = Checkpoint::from_str("64487e1e2a8f9a0001000001").unwrap();
/// let b = Checkpoint::from_str("64487e1e2a8f9a0001000002").unwrap();
/// assert!(a < b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoint(String);

impl Checkpoint {
    /// Creates a new checkpoint from the canonical string form of a
    /// source ordering value
    ///
    /// # Errors
    ///
    /// Returns an error if the value is empty.
    pub fn new(value: impl Into<String>) -> Result<Self, String> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err("Checkpoint cannot be empty".to_string());
        }
        Ok(Self(value))
    }

    /// Returns the checkpoint as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Checkpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for Checkpoint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_rejects_empty() {
        assert!(Checkpoint::new("").is_err());
        assert!(Checkpoint::new("   ").is_err());
    }

    #[test]
    fn test_checkpoint_ordering_matches_object_id_order() {
        let earlier = Checkpoint::new("64487e1e2a8f9a0001000001").unwrap();
        let later = Checkpoint::new("644880ab2a8f9a0001000000").unwrap();
        assert!(earlier < later);
        assert!(later > earlier);
    }

    #[test]
    fn test_checkpoint_serde_transparent() {
        let checkpoint = Checkpoint::new("64487e1e2a8f9a0001000001").unwrap();
        let json = serde_json::to_string(&checkpoint).unwrap();
        assert_eq!(json, "\"64487e1e2a8f9a0001000001\"");

        let back: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, checkpoint);
    }

    #[test]
    fn test_checkpoint_display_roundtrip() {
        let checkpoint = Checkpoint::from_str("abc123").unwrap();
        assert_eq!(checkpoint.to_string(), "abc123");
        assert_eq!(checkpoint.as_str(), "abc123");
        assert_eq!(checkpoint.into_inner(), "abc123");
    }
}
