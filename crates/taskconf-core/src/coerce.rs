//! Weak coercion between textually similar representations
//!
//! This is the only place conversion rules live. The schema decoder and the
//! wire decoder both call into it.
//!
//! | source \ target | bool            | number                     | string            |
//! |-----------------|-----------------|----------------------------|-------------------|
//! | bool            | identity        | -                          | `"true"`/`"false"` |
//! | number          | -               | identity                   | decimal rendering |
//! | string          | `"true"/"false"` | sign, digits, optional fraction | identity     |
//!
//! Null, lists and objects never coerce to a scalar.

use taskconf_types::{AttrType, Number, Value};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("expected {expected}, found {found}")]
pub struct CoerceError {
    pub expected: String,
    pub found: String,
}

impl CoerceError {
    pub fn new(expected: impl ToString, value: &Value) -> Self {
        let found = match value {
            Value::String(s) => format!("string \"{}\"", s),
            other => other.type_name().to_string(),
        };
        Self {
            expected: expected.to_string(),
            found,
        }
    }
}

/// Coerce a value to a scalar attribute type.
///
/// Collection types are not scalars; asking for one is a mismatch.
pub fn coerce_scalar(value: &Value, target: &AttrType) -> Result<Value, CoerceError> {
    match target {
        AttrType::Bool => coerce_bool(value).map(Value::Bool),
        AttrType::Number => coerce_number(value).map(Value::Number),
        AttrType::String => coerce_string(value).map(Value::String),
        collection => Err(CoerceError::new(collection, value)),
    }
}

pub fn coerce_bool(value: &Value) -> Result<bool, CoerceError> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => parse_bool(s),
        _ => None,
    }
    .ok_or_else(|| CoerceError::new(AttrType::Bool, value))
}

pub fn coerce_number(value: &Value) -> Result<Number, CoerceError> {
    match value {
        Value::Number(n) => Some(*n),
        Value::String(s) => parse_number(s),
        _ => None,
    }
    .ok_or_else(|| CoerceError::new(AttrType::Number, value))
}

pub fn coerce_string(value: &Value) -> Result<String, CoerceError> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(render_number(n)),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
    .ok_or_else(|| CoerceError::new(AttrType::String, value))
}

/// `"true"` / `"false"` only
pub fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Parse a plain decimal literal: optional sign, digits, optional `.digits`.
///
/// Integral literals stay integers (falling back to a float beyond the `i64`
/// range); exponents, `inf` and `nan` are rejected.
pub fn parse_number(s: &str) -> Option<Number> {
    let unsigned = s.strip_prefix(&['-', '+'][..]).unwrap_or(s);
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };
    let all_digits = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !frac_part.map_or(true, all_digits) {
        return None;
    }
    if frac_part.is_none() {
        if let Ok(i) = s.parse::<i64>() {
            return Some(Number::Integer(i));
        }
    }
    s.parse::<f64>().ok().map(Number::Float)
}

pub fn render_number(n: &Number) -> String {
    n.to_string()
}
