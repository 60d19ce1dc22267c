//! Record normalization
//!
//! Maps source-shaped records to the canonical target schema. The stage is
//! infallible at batch granularity: a malformed record is logged, counted,
//! and skipped, and the pipeline continues. Pagination state passes
//! through unchanged.
//!
//! The source wire format carries the same logical value in several
//! shapes: identifiers arrive as raw scalars or `oid`/`$oid` wrappers, and
//! timestamps as ISO-8601 strings, epoch integers, or `date`/`$date`
//! wrappers (including the `$numberLong` spelling). Each family is handled
//! by one normalization function rather than ad hoc checks scattered
//! through the pipeline.

use crate::domain::envelope::{ExtractOutput, StageStatus, TransformOutput};
use crate::domain::records::CanonicalRecord;
use chrono::{TimeZone, Utc};
use serde_json::Value;

/// Transform a batch of source records into canonical records
///
/// Output preserves input order among successfully transformed records;
/// `error_count + transformed.len()` always equals the input length.
pub fn transform(input: ExtractOutput) -> TransformOutput {
    let total = input.records.len();
    let mut transformed = Vec::with_capacity(total);

    for record in &input.records {
        if let Some(canonical) = transform_record(record) {
            transformed.push(canonical);
        }
    }

    let error_count = total - transformed.len();
    if error_count > 0 {
        tracing::warn!(
            rejected = error_count,
            total = total,
            "Batch transformed with rejected records"
        );
    } else {
        tracing::debug!(total = total, "Batch transformed");
    }

    TransformOutput {
        status: StageStatus::Ok,
        transformed,
        has_more: input.has_more,
        checkpoint: input.checkpoint,
        error_count,
    }
}

fn transform_record(record: &Value) -> Option<CanonicalRecord> {
    let fields = match record.as_object() {
        Some(fields) => fields,
        None => {
            tracing::warn!("Record rejected: not a structured mapping");
            return None;
        }
    };

    let id = match fields.get("_id").and_then(normalize_id) {
        Some(id) => id,
        None => {
            tracing::warn!("Record rejected: missing or unrecognized identifier");
            return None;
        }
    };

    Some(CanonicalRecord {
        id,
        username: string_or_empty(fields.get("username")),
        email: string_or_empty(fields.get("email")),
        created_at: normalize_date(fields.get("createdAt")),
        updated_at: normalize_date(fields.get("updatedAt")),
    })
}

fn string_or_empty(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Coerce an identifier to its canonical string representation
///
/// Accepts a raw scalar, or the `oid`/`$oid` wrapped object form.
pub fn normalize_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(fields) => {
            let inner = fields.get("$oid").or_else(|| fields.get("oid"))?;
            match inner {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Normalize a polymorphic date value to an ISO-8601 string
///
/// - absent or null stays absent
/// - a string is returned unchanged
/// - an integer is interpreted as milliseconds since epoch, rendered UTC
/// - a `date`/`$date` wrapper unwraps to one of the above (the
///   `$numberLong` spelling included)
///
/// Any other shape is logged as unrecognized and normalized to `None`;
/// this function never fails.
pub fn normalize_date(value: Option<&Value>) -> Option<String> {
    let value = value?;
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => from_epoch_millis(n),
        Value::Object(fields) => {
            let inner = match fields.get("$date").or_else(|| fields.get("date")) {
                Some(inner) => inner,
                None => {
                    tracing::warn!(value = %value, "Unrecognized date shape, normalizing to null");
                    return None;
                }
            };
            match inner {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => from_epoch_millis(n),
                Value::Object(long) => {
                    let millis = long
                        .get("$numberLong")
                        .and_then(Value::as_str)
                        .and_then(|s| s.parse::<i64>().ok());
                    match millis {
                        Some(millis) => millis_to_iso(millis),
                        None => {
                            tracing::warn!(value = %value, "Unrecognized date shape, normalizing to null");
                            None
                        }
                    }
                }
                _ => {
                    tracing::warn!(value = %value, "Unrecognized date shape, normalizing to null");
                    None
                }
            }
        }
        _ => {
            tracing::warn!(value = %value, "Unrecognized date shape, normalizing to null");
            None
        }
    }
}

fn from_epoch_millis(n: &serde_json::Number) -> Option<String> {
    match n.as_i64() {
        Some(millis) => millis_to_iso(millis),
        None => {
            tracing::warn!(value = %n, "Non-integer epoch value, normalizing to null");
            None
        }
    }
}

fn millis_to_iso(millis: i64) -> Option<String> {
    let timestamp = Utc.timestamp_millis_opt(millis).single()?;
    let rendered = if timestamp.timestamp_subsec_millis() == 0 {
        timestamp.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        timestamp.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
    };
    Some(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn batch(records: Vec<Value>) -> ExtractOutput {
        ExtractOutput {
            status: StageStatus::Ok,
            records,
            has_more: true,
            checkpoint: Some("64487e1e2a8f9a0001000003".parse().unwrap()),
        }
    }

    #[test_case(None, None; "absent stays absent")]
    #[test_case(Some(json!(null)), None; "null stays null")]
    #[test_case(
        Some(json!("2023-04-26T00:00:00")),
        Some("2023-04-26T00:00:00");
        "string returned unchanged"
    )]
    #[test_case(
        Some(json!(1_682_467_200_000_i64)),
        Some("2023-04-26T00:00:00");
        "epoch millis rendered utc"
    )]
    #[test_case(
        Some(json!({"date": 1_682_467_200_000_i64})),
        Some("2023-04-26T00:00:00");
        "wrapped epoch millis"
    )]
    #[test_case(
        Some(json!({"$date": "2023-04-26T00:00:00Z"})),
        Some("2023-04-26T00:00:00Z");
        "extended json string passthrough"
    )]
    #[test_case(
        Some(json!({"$date": {"$numberLong": "1682467200000"}})),
        Some("2023-04-26T00:00:00");
        "canonical number long"
    )]
    #[test_case(Some(json!({"unrecognized": 1})), None; "unrecognized shape")]
    #[test_case(Some(json!([1, 2])), None; "array shape")]
    #[test_case(Some(json!(true)), None; "boolean shape")]
    fn test_normalize_date(input: Option<Value>, expected: Option<&str>) {
        assert_eq!(
            normalize_date(input.as_ref()),
            expected.map(str::to_string)
        );
    }

    #[test]
    fn test_normalize_date_fractional_millis() {
        assert_eq!(
            normalize_date(Some(&json!(1_682_467_200_250_i64))),
            Some("2023-04-26T00:00:00.250".to_string())
        );
    }

    #[test_case(json!("u-1"), Some("u-1"); "raw string")]
    #[test_case(json!(42), Some("42"); "raw number")]
    #[test_case(json!({"$oid": "64487e1e2a8f9a0001000001"}), Some("64487e1e2a8f9a0001000001"); "extended json oid")]
    #[test_case(json!({"oid": "abc"}), Some("abc"); "bare oid wrapper")]
    #[test_case(json!({"uuid": "abc"}), None; "unknown wrapper")]
    #[test_case(json!(null), None; "null id")]
    fn test_normalize_id(input: Value, expected: Option<&str>) {
        assert_eq!(normalize_id(&input), expected.map(str::to_string));
    }

    #[test]
    fn test_transform_maps_full_record() {
        let output = transform(batch(vec![json!({
            "_id": {"$oid": "64487e1e2a8f9a0001000001"},
            "username": "ada",
            "email": "ada@example.com",
            "createdAt": {"$date": "2023-04-26T00:00:00Z"},
            "updatedAt": 1_682_553_600_000_i64
        })]));

        assert_eq!(output.error_count, 0);
        let record = &output.transformed[0];
        assert_eq!(record.id, "64487e1e2a8f9a0001000001");
        assert_eq!(record.username, "ada");
        assert_eq!(record.email, "ada@example.com");
        assert_eq!(record.created_at.as_deref(), Some("2023-04-26T00:00:00Z"));
        assert_eq!(record.updated_at.as_deref(), Some("2023-04-27T00:00:00"));
    }

    #[test]
    fn test_missing_username_and_email_default_to_empty() {
        let output = transform(batch(vec![json!({"_id": "u-1"})]));
        let record = &output.transformed[0];
        assert_eq!(record.username, "");
        assert_eq!(record.email, "");
        assert!(record.created_at.is_none());
    }

    #[test]
    fn test_bad_records_counted_not_fatal() {
        let output = transform(batch(vec![
            json!({"_id": "u-1", "username": "first"}),
            json!("not an object"),
            json!({"username": "no id"}),
            json!({"_id": "u-2", "username": "last"}),
        ]));

        assert_eq!(output.error_count, 2);
        assert_eq!(output.transformed.len(), 2);
        // Order preserved among survivors
        assert_eq!(output.transformed[0].id, "u-1");
        assert_eq!(output.transformed[1].id, "u-2");
    }

    #[test]
    fn test_count_invariant_holds() {
        let records = vec![
            json!({"_id": "u-1"}),
            json!(17),
            json!({"_id": {"bad": true}}),
        ];
        let total = records.len();
        let output = transform(batch(records));
        assert_eq!(output.error_count + output.transformed.len(), total);
    }

    #[test]
    fn test_pagination_state_passes_through() {
        let output = transform(batch(vec![]));
        assert!(output.has_more);
        assert_eq!(
            output.checkpoint.unwrap().as_str(),
            "64487e1e2a8f9a0001000003"
        );
    }
}
