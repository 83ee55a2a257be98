//! Evaluation of Mongo-style filter conditions against a document.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::{Error, Result};

/// Whether `document` satisfies every condition.
pub(crate) fn matches(document: &Document, conditions: &Document) -> Result<bool> {
    for (key, expected) in conditions {
        let satisfied = match key.as_str() {
            "$or" => {
                let mut any = false;
                for clause in clauses(key, expected)? {
                    if matches(document, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$and" => {
                let mut all = true;
                for clause in clauses(key, expected)? {
                    if !matches(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            op if op.starts_with('$') => {
                return Err(Error::Store(format!("unsupported operator {op}")));
            }
            path => field_matches(lookup(document, path), expected)?,
        };
        if !satisfied {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Resolves a dotted path such as `profile.city` or `tags.0`.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Total order used for sorting: missing/null, numbers, strings, objects, arrays, booleans.
pub(crate) fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = |value: Option<&Value>| match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    };
    match (a, b) {
        (Some(a), Some(b)) => compare(a, b).unwrap_or_else(|| rank(Some(a)).cmp(&rank(Some(b)))),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn clauses<'a>(key: &str, value: &'a Value) -> Result<Vec<&'a Document>> {
    let invalid = || Error::Store(format!("{key} expects an array of objects"));
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|clause| clause.as_object().ok_or_else(invalid))
        .collect()
}

fn field_matches(actual: Option<&Value>, expected: &Value) -> Result<bool> {
    match expected {
        Value::Object(ops) if is_operator_object(ops) => {
            for (op, operand) in ops {
                if !apply(op, actual, operand)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Ok(equals(actual, expected)),
    }
}

fn is_operator_object(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|key| key.starts_with('$'))
}

fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        Some(Value::Array(items)) if !expected.is_array() => items.contains(expected),
        Some(value) => value == expected,
        None => expected.is_null(),
    }
}

fn apply(op: &str, actual: Option<&Value>, operand: &Value) -> Result<bool> {
    let ordered = |accept: fn(Ordering) -> bool| {
        actual
            .and_then(|value| compare(value, operand))
            .map_or(false, accept)
    };
    let members = || {
        operand
            .as_array()
            .ok_or_else(|| Error::Store(format!("{op} expects an array")))
    };

    Ok(match op {
        "$eq" => equals(actual, operand),
        "$ne" => !equals(actual, operand),
        "$gt" => ordered(|o| o == Ordering::Greater),
        "$gte" => ordered(|o| o != Ordering::Less),
        "$lt" => ordered(|o| o == Ordering::Less),
        "$lte" => ordered(|o| o != Ordering::Greater),
        "$in" => members()?.iter().any(|member| equals(actual, member)),
        "$nin" => !members()?.iter().any(|member| equals(actual, member)),
        "$exists" => {
            let wanted = operand.as_bool().unwrap_or(!operand.is_null());
            actual.is_some() == wanted
        }
        other => return Err(Error::Store(format!("unsupported operator {other}"))),
    })
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
