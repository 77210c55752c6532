//! Date bounds for document conditions
//!
//! Accepted inputs: epoch milliseconds, RFC 3339 strings, and `YYYY-MM-DD`
//! (midnight UTC). Bounds are emitted as extended JSON `{"$date": ...}`.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde_json::{json, Value};

use crate::predicate::{CompileError, CompileResult};

/// Interpret a value as an instant
pub fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| Utc.from_utc_datetime(&naive))
            }),
        Value::Object(map) => map.get("$date").and_then(parse_instant),
        _ => None,
    }
}

/// `{"$date": "<RFC 3339, millisecond precision, Z>"}`
pub fn extended_json(field: &str, value: &Value) -> CompileResult<Value> {
    let instant = parse_instant(value).ok_or_else(|| CompileError::InvalidDate {
        field: field.to_string(),
        value: value.to_string(),
    })?;
    Ok(json!({ "$date": instant.to_rfc3339_opts(SecondsFormat::Millis, true) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_forms() {
        let expected = json!({"$date": "2024-03-01T00:00:00.000Z"});
        assert_eq!(extended_json("d", &json!("2024-03-01")).unwrap(), expected);
        assert_eq!(extended_json("d", &json!("2024-03-01T09:00:00+09:00")).unwrap(), expected);
        assert_eq!(extended_json("d", &json!(1709251200000_i64)).unwrap(), expected);
    }

    #[test]
    fn test_rejects_garbage() {
        let err = extended_json("createdAt", &json!("yesterday")).unwrap_err();
        assert_eq!(err.code(), "COMPILE_INVALID_DATE");
        assert!(parse_instant(&json!(true)).is_none());
    }

    #[test]
    fn test_extended_json_round_trips() {
        let wrapped = extended_json("d", &json!("2024-03-01")).unwrap();
        assert_eq!(parse_instant(&wrapped), parse_instant(&json!("2024-03-01")));
    }
}
