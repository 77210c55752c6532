//! Row value helpers shared by the in-memory backends

use std::cmp::Ordering;

use serde_json::{Number, Value};

use super::errors::{StoreError, StoreResult};
use super::Row;

/// Total order for sorting rows by an attribute: missing and null first,
/// then booleans, numbers, strings, and everything else by its JSON text.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) if rank(a) == 4 && rank(b) == 4 => x.to_string().cmp(&y.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Value at a nested path
pub fn get_path<'a>(row: &'a Row, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter().try_fold(row.get(first)?, |value, segment| value.get(segment))
}

/// Set a nested path, creating intermediate objects
pub fn set_path(row: &mut Row, path: &[String], value: Value) -> StoreResult<()> {
    let Some((last, parents)) = path.split_last() else {
        return Err(StoreError::backend("empty attribute path"));
    };

    let mut current = row;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Row::new()));
        current = entry
            .as_object_mut()
            .ok_or_else(|| StoreError::backend(format!("attribute '{}' is not a map", segment)))?;
    }
    current.insert(last.clone(), value);
    Ok(())
}

/// `current + delta` (or `- delta`); a missing value counts as zero
pub fn add_numbers(current: Option<&Value>, delta: &Value, subtract: bool) -> StoreResult<Value> {
    let not_numeric = || StoreError::backend("arithmetic on a non-numeric attribute");
    let current = match current {
        None | Some(Value::Null) => Value::from(0),
        Some(v) if v.is_number() => v.clone(),
        Some(_) => return Err(not_numeric()),
    };

    if let (Some(a), Some(b)) = (current.as_i64(), delta.as_i64()) {
        let result = if subtract { a.checked_sub(b) } else { a.checked_add(b) };
        if let Some(result) = result {
            return Ok(Value::from(result));
        }
    }

    let a = current.as_f64().ok_or_else(not_numeric)?;
    let b = delta.as_f64().ok_or_else(not_numeric)?;
    let result = if subtract { a - b } else { a + b };
    Number::from_f64(result).map(Value::Number).ok_or_else(not_numeric)
}

/// True when every key attribute equals the row's value
pub fn key_matches(row: &Row, key: &Row) -> bool {
    !key.is_empty() && key.iter().all(|(k, v)| row.get(k) == Some(v))
}

/// Only the listed attributes (top-level) of a row
pub fn project(row: &Row, fields: Option<&[String]>) -> Row {
    match fields {
        Some(fields) => fields
            .iter()
            .filter_map(|f| row.get(f).map(|v| (f.clone(), v.clone())))
            .collect(),
        None => row.clone(),
    }
}
