//! Record models
//!
//! `CanonicalRecord` is the target-shaped wire model produced by the
//! Transform stage; `UserRow` is the validated row the Load stage hands to
//! the target store, with timestamps parsed into concrete types. The
//! conversion between them is where per-record pre-write validation lives.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical target-shaped record
///
/// Field semantics:
/// - `id` is required and unique
/// - `username`/`email` default to the empty string, never null
/// - timestamps are ISO-8601 strings, absent when the source carried none
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub id: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub email: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// A record rejected by pre-write validation
///
/// Returned inline in the successful load envelope, never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidRecord {
    pub id: String,
    pub reason: String,
}

impl InvalidRecord {
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Validated row ready for the relational target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<&CanonicalRecord> for UserRow {
    type Error = String;

    fn try_from(record: &CanonicalRecord) -> Result<Self, Self::Error> {
        if record.id.trim().is_empty() {
            return Err("missing id".to_string());
        }

        Ok(Self {
            id: record.id.clone(),
            username: record.username.clone(),
            email: record.email.clone(),
            created_at: parse_timestamp_opt(record.created_at.as_deref(), "created_at")?,
            updated_at: parse_timestamp_opt(record.updated_at.as_deref(), "updated_at")?,
        })
    }
}

fn parse_timestamp_opt(
    value: Option<&str>,
    field: &str,
) -> Result<Option<DateTime<Utc>>, String> {
    match value {
        None => Ok(None),
        Some(text) => parse_timestamp(text)
            .map(Some)
            .ok_or_else(|| format!("invalid {field} timestamp: {text}")),
    }
}

/// Parses an ISO-8601 timestamp string
///
/// Accepts both offset-carrying (RFC 3339) and offsetless forms; an
/// offsetless timestamp is interpreted as UTC, matching how the Transform
/// stage renders epoch values.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(text) {
        return Some(with_offset.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
