//! Dynamic and canonical configuration values
//!
//! `Value` is the closed tagged union every configuration parser produces
//! (plain scalars, ordered lists, ordered string-keyed objects). The same type
//! carries the decoder's output, wrapped in [`CanonicalValue`] once it has been
//! walked against a schema.
//!
//! Objects are stored as insertion-ordered entry vectors rather than hash maps:
//! iteration order is the source order, which keeps wire encoding
//! deterministic. Keys stay unique because every insertion path goes through
//! [`upsert_entry`], which replaces an existing key in place.

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;

// =============================================================================
// NUMBER
// =============================================================================

/// A configuration number.
///
/// Integers stay integers so that `pids_limit = 2` and `"pids_limit": "2"`
/// produce the identical canonical value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    /// Integer view; integral floats inside the `i64` range convert exactly
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Number::Integer(i) => Some(i),
            Number::Float(f)
                if f.is_finite()
                    && f.fract() == 0.0
                    && f >= i64::MIN as f64
                    && f < i64::MAX as f64 =>
            {
                Some(f as i64)
            }
            Number::Float(_) => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Integer(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Number::Integer(_))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{}", i),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<i64> for Number {
    fn from(i: i64) -> Self {
        Number::Integer(i)
    }
}

impl From<f64> for Number {
    fn from(f: f64) -> Self {
        Number::Float(f)
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// Dynamic configuration value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    /// May still contain unresolved `${...}` spans before decoding
    String(String),
    List(Vec<Value>),
    /// Ordered, unique-keyed entries
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Build an object from key/value pairs; a repeated key replaces the
    /// earlier value but keeps its original position.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut out = Vec::new();
        for (key, value) in entries {
            upsert_entry(&mut out, key.into(), value);
        }
        Value::Object(out)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn integer(i: i64) -> Self {
        Value::Number(Number::Integer(i))
    }

    pub fn float(f: f64) -> Self {
        Value::Number(Number::Float(f))
    }

    /// Name of the variant, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_number().and_then(|n| n.as_i64())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up an object member by exact key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|entries| find_entry(entries, key))
    }

    /// Insert into an object, returning the replaced value. No-op on non-objects.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        match self {
            Value::Object(entries) => upsert_entry(entries, key.into(), value),
            _ => None,
        }
    }
}

/// Find an entry by exact (case-sensitive) key
pub fn find_entry<'a>(entries: &'a [(String, Value)], key: &str) -> Option<&'a Value> {
    entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

/// Insert or replace an entry, keeping the first-seen position of the key
pub fn upsert_entry(
    entries: &mut Vec<(String, Value)>,
    key: String,
    value: Value,
) -> Option<Value> {
    match entries.iter_mut().find(|(k, _)| *k == key) {
        Some((_, existing)) => Some(std::mem::replace(existing, value)),
        None => {
            entries.push((key, value));
            None
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::float(f)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

// =============================================================================
// CANONICAL VALUE
// =============================================================================

/// A fully typed, schema-conformant configuration object.
///
/// Produced by the schema-driven decoder; every declared attribute is present
/// with its declared type and every block is an object or list of objects.
/// The schema that produced it is not carried along.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CanonicalValue(Vec<(String, Value)>);

impl CanonicalValue {
    /// Wrap entries that were produced by walking a schema
    pub fn from_entries(entries: Vec<(String, Value)>) -> Self {
        Self(entries)
    }

    /// Accept a structurally decoded wire value; only objects qualify
    pub fn from_wire(value: Value) -> Option<Self> {
        match value {
            Value::Object(entries) => Some(Self(entries)),
            _ => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        find_entry(&self.0, name)
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Owned copy as a `Value::Object`
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

impl Serialize for CanonicalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_entries(&self.0, serializer)
    }
}

// =============================================================================
// SERDE
// =============================================================================

fn serialize_entries<S: Serializer>(
    entries: &[(String, Value)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (k, v) in entries {
        map.serialize_entry(k, v)?;
    }
    map.end()
}

impl Serialize for Number {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            Number::Integer(i) => serializer.serialize_i64(i),
            Number::Float(f) => serializer.serialize_f64(f),
        }
    }
}

impl<'de> Deserialize<'de> for Number {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NumberVisitor;

        impl<'de> Visitor<'de> for NumberVisitor {
            type Value = Number;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number")
            }

            fn visit_i64<E: de::Error>(self, i: i64) -> Result<Number, E> {
                Ok(Number::Integer(i))
            }

            fn visit_u64<E: de::Error>(self, u: u64) -> Result<Number, E> {
                Ok(i64::try_from(u)
                    .map(Number::Integer)
                    .unwrap_or(Number::Float(u as f64)))
            }

            fn visit_f64<E: de::Error>(self, f: f64) -> Result<Number, E> {
                Ok(Number::Float(f))
            }
        }

        deserializer.deserialize_any(NumberVisitor)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(Number::Integer(i)) => serializer.serialize_i64(*i),
            Value::Number(Number::Float(f)) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Object(entries) => serialize_entries(entries, serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a configuration value")
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, i: i64) -> Result<Value, E> {
        Ok(Value::integer(i))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> Result<Value, E> {
        Ok(Value::Number(match i64::try_from(u) {
            Ok(i) => Number::Integer(i),
            Err(_) => Number::Float(u as f64),
        }))
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> Result<Value, E> {
        Ok(Value::float(f))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Value, E> {
        Ok(Value::String(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_bytes<E: de::Error>(self, bytes: &[u8]) -> Result<Value, E> {
        std::str::from_utf8(bytes)
            .map(|s| Value::String(s.to_string()))
            .map_err(|_| E::invalid_type(de::Unexpected::Bytes(bytes), &self))
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            upsert_entry(&mut entries, key, value);
        }
        Ok(Value::Object(entries))
    }
}

// =============================================================================
// TESTS
// =============================================================================
