//! In-memory store doubles shared by the integration tests
//!
//! `MemorySource` serves ordered pages the way the real source does;
//! `MemoryTarget` applies the same upsert semantics as the target table,
//! including preserving `created_at` on conflict.

use async_trait::async_trait;
use ferry::adapters::traits::{SourceStore, TargetStore};
use ferry::core::transform::normalize_id;
use ferry::domain::{Checkpoint, Result, UserRow, WriteError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

pub struct MemorySource {
    records: Vec<Value>,
}

impl MemorySource {
    pub fn new(records: Vec<Value>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl SourceStore for MemorySource {
    async fn fetch_after(
        &self,
        checkpoint: Option<&Checkpoint>,
        limit: usize,
    ) -> Result<Vec<Value>> {
        let after = checkpoint.map(|c| c.as_str().to_string());
        Ok(self
            .records
            .iter()
            .filter(|record| {
                let id = record.get("_id").and_then(normalize_id);
                match &after {
                    Some(after) => id.is_some_and(|id| id.as_str() > after.as_str()),
                    None => true,
                }
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryTarget {
    rows: Mutex<HashMap<String, UserRow>>,
    write_calls: Mutex<usize>,
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(&self, id: &str) -> Option<UserRow> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn write_calls(&self) -> usize {
        *self.write_calls.lock().unwrap()
    }
}

#[async_trait]
impl TargetStore for MemoryTarget {
    async fn upsert_chunk(&self, rows: &[UserRow]) -> std::result::Result<(), WriteError> {
        *self.write_calls.lock().unwrap() += 1;
        let mut table = self.rows.lock().unwrap();
        for row in rows {
            match table.get_mut(&row.id) {
                Some(existing) => {
                    // Conflict action: mutable fields overwritten,
                    // created_at preserved
                    existing.username = row.username.clone();
                    existing.email = row.email.clone();
                    existing.updated_at = row.updated_at;
                }
                None => {
                    table.insert(row.id.clone(), row.clone());
                }
            }
        }
        Ok(())
    }
}

/// Zero-padded hex ids so lexicographic order matches insertion order,
/// like object ids
pub fn record_id(sequence: usize) -> String {
    format!("{sequence:024x}")
}

/// A source-shaped user record in relaxed Extended JSON
pub fn source_record(sequence: usize) -> Value {
    json!({
        "_id": {"$oid": record_id(sequence)},
        "username": format!("user{sequence}"),
        "email": format!("user{sequence}@example.com"),
        "createdAt": {"$date": 1_682_467_200_000_i64 + (sequence as i64) * 1_000},
        "updatedAt": {"$date": 1_682_553_600_000_i64 + (sequence as i64) * 1_000}
    })
}

pub fn seed_records(count: usize) -> Vec<Value> {
    (1..=count).map(source_record).collect()
}
