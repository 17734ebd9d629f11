//! Weak deserializer over a structurally decoded [`Value`]
//!
//! The plugin side of the codec. A driver's static configuration struct is
//! populated through serde's derive, with the type hints it supplies steering
//! coercion through the shared table in `taskconf_core::coerce`:
//!
//! - integer fields accept integral floats and numeric strings
//! - float fields accept integers and numeric strings
//! - string fields accept numbers and bools (decimal / `true` / `false`)
//! - bool fields accept `"true"` and `"false"`
//! - struct keys match exactly first, then ASCII case-insensitively against the
//!   target's serde field names (the first folded key wins); unknown keys are
//!   ignored
//! - a null entry is skipped so the field keeps its `#[serde(default)]`
//! - null into a sequence or map is empty, into an `Option` is `None`
//! - unit enum variants decode from strings
//!
//! Every error carries the path of the field that failed (`devices[0].host_path`).

use serde::de::value::StrDeserializer;
use serde::de::{
    DeserializeSeed, Deserializer, EnumAccess, IntoDeserializer, MapAccess, SeqAccess,
    VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use taskconf_core::coerce::{self, CoerceError};
use taskconf_types::{Number, Value};

use super::error::WireError;

const ROOT: &str = "<root>";

pub struct WeakDeserializer<'a> {
    value: &'a Value,
    path: String,
}

impl<'a> WeakDeserializer<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self {
            value,
            path: String::new(),
        }
    }

    fn at(value: &'a Value, path: String) -> Self {
        Self { value, path }
    }

    fn path(&self) -> &str {
        if self.path.is_empty() {
            ROOT
        } else {
            &self.path
        }
    }

    fn finish<T>(&self, result: Result<T, WireError>) -> Result<T, WireError> {
        result.map_err(|e| e.with_path(self.path()))
    }

    fn mismatch(&self, expected: &str) -> WireError {
        WireError::decode_type(self.path(), CoerceError::new(expected, self.value))
    }

    fn coerce_error(&self, err: CoerceError) -> WireError {
        WireError::decode_type(self.path(), err)
    }

    fn integer<'de, V: Visitor<'de>>(&self, visitor: V) -> Result<V::Value, WireError> {
        let number = coerce::coerce_number(self.value).map_err(|e| self.coerce_error(e))?;
        let result = match number {
            Number::Integer(i) => visitor.visit_i64(i),
            n @ Number::Float(f) => match n.as_i64() {
                Some(i) => visitor.visit_i64(i),
                None if f.fract() == 0.0 && f > 0.0 && f <= u64::MAX as f64 => {
                    visitor.visit_u64(f as u64)
                }
                None => Err(self.mismatch("integer")),
            },
        };
        self.finish(result)
    }
}

fn key_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{}[{}]", parent, index)
}

macro_rules! deserialize_integer {
    ($($method:ident)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
            self.integer(visitor)
        }
    )*};
}

impl<'de, 'a> Deserializer<'de> for WeakDeserializer<'a> {
    type Error = WireError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        let result = match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(*b),
            Value::Number(Number::Integer(i)) => visitor.visit_i64(*i),
            Value::Number(Number::Float(f)) => visitor.visit_f64(*f),
            Value::String(s) => visitor.visit_str(s),
            Value::List(items) => visitor.visit_seq(SeqDeserializer::new(items, &self.path)),
            Value::Object(entries) => {
                visitor.visit_map(MapDeserializer::new(entries, &self.path, None))
            }
        };
        self.finish(result)
    }

    deserialize_integer! {
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        self.deserialize_f64(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        let number = coerce::coerce_number(self.value).map_err(|e| self.coerce_error(e))?;
        let result = visitor.visit_f64(number.as_f64());
        self.finish(result)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        let b = coerce::coerce_bool(self.value).map_err(|e| self.coerce_error(e))?;
        let result = visitor.visit_bool(b);
        self.finish(result)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        let s = coerce::coerce_string(self.value).map_err(|e| self.coerce_error(e))?;
        let result = visitor.visit_string(s);
        self.finish(result)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        match self.value {
            Value::String(s) => {
                let result = visitor.visit_bytes(s.as_bytes());
                self.finish(result)
            }
            _ => self.deserialize_any(visitor),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            _ => Err(self.mismatch("null")),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, WireError> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, WireError> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        let result = match self.value {
            Value::List(items) => visitor.visit_seq(SeqDeserializer::new(items, &self.path)),
            Value::Null => visitor.visit_seq(SeqDeserializer::new(&[], &self.path)),
            _ => return Err(self.mismatch("list")),
        };
        self.finish(result)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, WireError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, WireError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        let result = match self.value {
            Value::Object(entries) => {
                visitor.visit_map(MapDeserializer::new(entries, &self.path, None))
            }
            Value::Null => visitor.visit_map(MapDeserializer::new(&[], &self.path, None)),
            _ => return Err(self.mismatch("map")),
        };
        self.finish(result)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, WireError> {
        let entries: &[(String, Value)] = match self.value {
            Value::Object(entries) => entries,
            Value::Null => &[],
            Value::List(items) => match items.as_slice() {
                [Value::Object(entries)] => entries,
                _ => return Err(self.mismatch("object")),
            },
            _ => return Err(self.mismatch("object")),
        };
        let result = visitor.visit_map(MapDeserializer::new(entries, &self.path, Some(fields)));
        self.finish(result)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, WireError> {
        let result = match self.value {
            Value::String(s) => {
                let variant: StrDeserializer<'_, WireError> = s.as_str().into_deserializer();
                visitor.visit_enum(variant)
            }
            Value::Object(entries) if entries.len() == 1 => {
                let (variant, value) = &entries[0];
                visitor.visit_enum(EnumDeserializer {
                    variant,
                    value,
                    path: key_path(&self.path, variant),
                })
            }
            _ => return Err(self.mismatch("enum variant")),
        };
        self.finish(result)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, WireError> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        identifier
    }
}

// =============================================================================
// COLLECTION ACCESS
// =============================================================================

struct SeqDeserializer<'a> {
    items: std::slice::Iter<'a, Value>,
    index: usize,
    path: &'a str,
}

impl<'a> SeqDeserializer<'a> {
    fn new(items: &'a [Value], path: &'a str) -> Self {
        Self {
            items: items.iter(),
            index: 0,
            path,
        }
    }
}

impl<'de, 'a> SeqAccess<'de> for SeqDeserializer<'a> {
    type Error = WireError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, WireError> {
        let Some(item) = self.items.next() else {
            return Ok(None);
        };
        let path = index_path(self.path, self.index);
        self.index += 1;
        seed.deserialize(WeakDeserializer::at(item, path)).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

struct MapDeserializer<'a> {
    entries: &'a [(String, Value)],
    position: usize,
    fields: Option<&'static [&'static str]>,
    pending: Option<(&'a str, &'a Value)>,
    path: &'a str,
}

impl<'a> MapDeserializer<'a> {
    fn new(
        entries: &'a [(String, Value)],
        path: &'a str,
        fields: Option<&'static [&'static str]>,
    ) -> Self {
        Self {
            entries,
            position: 0,
            fields,
            pending: None,
            path,
        }
    }

    /// Field name the wire key at `index` populates, or `None` when the entry
    /// is shadowed: by an exact match for the same field, or by an earlier
    /// key that folds to it. Null entries never shadow.
    fn resolve(&self, index: usize, key: &'a str) -> Option<&'a str> {
        let Some(fields) = self.fields else {
            return Some(key);
        };
        if fields.iter().any(|f| *f == key) {
            return Some(key);
        }
        let Some(field) = fields.iter().find(|f| f.eq_ignore_ascii_case(key)) else {
            return Some(key);
        };
        let live = |(_, v): &&(String, Value)| !v.is_null();
        let exact = self
            .entries
            .iter()
            .filter(live)
            .any(|(k, _)| k.as_str() == *field);
        let earlier = self.entries[..index]
            .iter()
            .filter(live)
            .any(|(k, _)| k.eq_ignore_ascii_case(field));
        if exact || earlier {
            None
        } else {
            Some(*field)
        }
    }
}

impl<'de, 'a> MapAccess<'de> for MapDeserializer<'a> {
    type Error = WireError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, WireError> {
        let entries = self.entries;
        while let Some((key, value)) = entries.get(self.position) {
            self.position += 1;
            if self.fields.is_some() && value.is_null() {
                continue;
            }
            let Some(name) = self.resolve(self.position - 1, key) else {
                continue;
            };
            self.pending = Some((name, value));
            let key: StrDeserializer<'_, WireError> = name.into_deserializer();
            return seed.deserialize(key).map(Some);
        }
        Ok(None)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, WireError> {
        let (name, value) = self
            .pending
            .take()
            .ok_or_else(|| WireError::decode_type(self.path, "value requested before key"))?;
        seed.deserialize(WeakDeserializer::at(value, key_path(self.path, name)))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len() - self.position)
    }
}

// =============================================================================
// ENUM ACCESS
// =============================================================================

struct EnumDeserializer<'a> {
    variant: &'a str,
    value: &'a Value,
    path: String,
}

impl<'de, 'a> EnumAccess<'de> for EnumDeserializer<'a> {
    type Error = WireError;
    type Variant = WeakDeserializer<'a>;

    fn variant_seed<V: DeserializeSeed<'de>>(
        self,
        seed: V,
    ) -> Result<(V::Value, Self::Variant), WireError> {
        let variant: StrDeserializer<'_, WireError> = self.variant.into_deserializer();
        let tag = seed.deserialize(variant)?;
        Ok((tag, WeakDeserializer::at(self.value, self.path)))
    }
}

impl<'de, 'a> VariantAccess<'de> for WeakDeserializer<'a> {
    type Error = WireError;

    fn unit_variant(self) -> Result<(), WireError> {
        match self.value {
            Value::Null => Ok(()),
            _ => Err(self.mismatch("unit variant")),
        }
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value, WireError> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, WireError> {
        self.deserialize_seq(visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, WireError> {
        self.deserialize_struct("", fields, visitor)
    }
}
