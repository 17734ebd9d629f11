//! Typed schema for a driver's configuration block
//!
//! A schema is an ordered set of fields, unique by name within one level:
//!
//! - [`Attribute`]: a named scalar or collection with a declared [`AttrType`]
//! - [`Block`]: a named nested schema, either a singleton (collapsed to one
//!   object) or repeated (collapsed to an ordered list of objects)
//!
//! Schemas are built once per driver registration and only read afterwards.
//! They serialize as a list of `kind`-tagged fields so a driver can ship its
//! schema across the plugin boundary or an operator can keep it on disk:
//!
//! ```yaml
//! - kind: attribute
//!   name: image
//!   type: string
//!   required: true
//! - kind: attribute
//!   name: port_map
//!   type: map(number)
//! - kind: block
//!   name: devices
//!   repeated: true
//!   nested:
//!     - kind: attribute
//!       name: host_path
//!       type: string
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::value::Value;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("duplicate field '{0}' in schema")]
    DuplicateField(String),

    #[error("schema field with empty name")]
    EmptyName,

    #[error("unknown attribute type '{0}'")]
    UnknownType(String),
}

// =============================================================================
// ATTRIBUTE TYPES
// =============================================================================

/// Declared type of an attribute.
///
/// Written as `bool`, `number`, `string`, `list(T)` or `map(T)` in serialized
/// schemas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AttrType {
    Bool,
    Number,
    String,
    List(Box<AttrType>),
    /// String-keyed map
    Map(Box<AttrType>),
}

impl AttrType {
    pub fn list(elem: AttrType) -> Self {
        AttrType::List(Box::new(elem))
    }

    pub fn map(elem: AttrType) -> Self {
        AttrType::Map(Box::new(elem))
    }

    /// The value substituted when the attribute is absent or unusable
    pub fn zero_value(&self) -> Value {
        match self {
            AttrType::Bool => Value::Bool(false),
            AttrType::Number => Value::integer(0),
            AttrType::String => Value::String(String::new()),
            AttrType::List(_) => Value::List(Vec::new()),
            AttrType::Map(_) => Value::Object(Vec::new()),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, AttrType::List(_) | AttrType::Map(_))
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::Bool => f.write_str("bool"),
            AttrType::Number => f.write_str("number"),
            AttrType::String => f.write_str("string"),
            AttrType::List(elem) => write!(f, "list({})", elem),
            AttrType::Map(elem) => write!(f, "map({})", elem),
        }
    }
}

impl FromStr for AttrType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "bool" => return Ok(AttrType::Bool),
            "number" => return Ok(AttrType::Number),
            "string" => return Ok(AttrType::String),
            _ => {}
        }
        if let Some(inner) = s.strip_prefix("list(").and_then(|r| r.strip_suffix(')')) {
            return Ok(AttrType::list(inner.parse()?));
        }
        if let Some(inner) = s.strip_prefix("map(").and_then(|r| r.strip_suffix(')')) {
            return Ok(AttrType::map(inner.parse()?));
        }
        Err(SchemaError::UnknownType(s.to_string()))
    }
}

impl TryFrom<String> for AttrType {
    type Error = SchemaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<AttrType> for String {
    fn from(ty: AttrType) -> Self {
        ty.to_string()
    }
}

// =============================================================================
// FIELDS
// =============================================================================

/// A typed attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: AttrType,
    #[serde(default)]
    pub required: bool,
}

/// A nested block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub nested: Schema,
    /// `false`: at most one occurrence, collapsed to an object.
    /// `true`: zero or more occurrences, collapsed to a list of objects.
    #[serde(default)]
    pub repeated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Field {
    Attribute(Attribute),
    Block(Block),
}

impl Field {
    pub fn name(&self) -> &str {
        match self {
            Field::Attribute(a) => &a.name,
            Field::Block(b) => &b.name,
        }
    }
}

// =============================================================================
// SCHEMA
// =============================================================================

/// Ordered set of uniquely named fields
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Field>", into = "Vec<Field>")]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    /// Validate and wrap a field list
    pub fn new(fields: Vec<Field>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            let name = field.name();
            if name.is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if !seen.insert(name) {
                return Err(SchemaError::DuplicateField(name.to_string()));
            }
        }
        Ok(Self { fields })
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Object with every field at its zero value: attributes zeroed,
    /// singleton blocks recursively zeroed, repeated blocks empty.
    pub fn zero_object(&self) -> Vec<(String, Value)> {
        self.fields
            .iter()
            .map(|field| {
                let value = match field {
                    Field::Attribute(a) => a.ty.zero_value(),
                    Field::Block(b) if b.repeated => Value::List(Vec::new()),
                    Field::Block(b) => Value::Object(b.nested.zero_object()),
                };
                (field.name().to_string(), value)
            })
            .collect()
    }
}

impl TryFrom<Vec<Field>> for Schema {
    type Error = SchemaError;

    fn try_from(fields: Vec<Field>) -> Result<Self, Self::Error> {
        Schema::new(fields)
    }
}

impl From<Schema> for Vec<Field> {
    fn from(schema: Schema) -> Self {
        schema.fields
    }
}

/// Incremental schema construction; duplicates are reported by [`SchemaBuilder::build`]
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<Field>,
}

impl SchemaBuilder {
    pub fn attribute(mut self, name: impl Into<String>, ty: AttrType, required: bool) -> Self {
        self.fields.push(Field::Attribute(Attribute {
            name: name.into(),
            ty,
            required,
        }));
        self
    }

    pub fn required(self, name: impl Into<String>, ty: AttrType) -> Self {
        self.attribute(name, ty, true)
    }

    pub fn optional(self, name: impl Into<String>, ty: AttrType) -> Self {
        self.attribute(name, ty, false)
    }

    /// Singleton block
    pub fn block(mut self, name: impl Into<String>, nested: Schema) -> Self {
        self.fields.push(Field::Block(Block {
            name: name.into(),
            nested,
            repeated: false,
        }));
        self
    }

    /// Repeated block
    pub fn block_list(mut self, name: impl Into<String>, nested: Schema) -> Self {
        self.fields.push(Field::Block(Block {
            name: name.into(),
            nested,
            repeated: true,
        }));
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        Schema::new(self.fields)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn logging_schema() -> Schema {
        Schema::builder()
            .optional("type", AttrType::String)
            .optional("config", AttrType::map(AttrType::String))
            .build()
            .unwrap()
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = Schema::builder()
            .required("image", AttrType::String)
            .block("image", Schema::default())
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateField("image".to_string()));
    }

    #[test]
    fn test_same_name_at_different_levels_allowed() {
        let nested = Schema::builder()
            .optional("type", AttrType::String)
            .build()
            .unwrap();
        let schema = Schema::builder()
            .optional("type", AttrType::String)
            .block("logging", nested)
            .build();
        assert!(schema.is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = Schema::builder()
            .optional("", AttrType::Bool)
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::EmptyName);
    }

    #[test]
    fn test_attr_type_round_trip_text() {
        for text in ["bool", "number", "string", "list(string)", "map(list(number))"] {
            let ty: AttrType = text.parse().unwrap();
            assert_eq!(ty.to_string(), text);
        }
        assert!("tuple(string)".parse::<AttrType>().is_err());
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(AttrType::Bool.zero_value(), Value::Bool(false));
        assert_eq!(AttrType::Number.zero_value(), Value::integer(0));
        assert_eq!(AttrType::String.zero_value(), Value::string(""));
        assert_eq!(
            AttrType::list(AttrType::String).zero_value(),
            Value::List(vec![])
        );
        assert_eq!(
            AttrType::map(AttrType::Number).zero_value(),
            Value::Object(vec![])
        );
    }

    #[test]
    fn test_zero_object_nests_blocks() {
        let schema = Schema::builder()
            .required("image", AttrType::String)
            .block("logging", logging_schema())
            .block_list("devices", Schema::default())
            .build()
            .unwrap();

        assert_eq!(
            Value::Object(schema.zero_object()),
            Value::object([
                ("image", Value::string("")),
                (
                    "logging",
                    Value::object([
                        ("type", Value::string("")),
                        ("config", Value::Object(vec![])),
                    ])
                ),
                ("devices", Value::List(vec![])),
            ])
        );
    }

    #[test]
    fn test_yaml_schema() {
        let yaml = r#"
- kind: attribute
  name: image
  type: string
  required: true
- kind: attribute
  name: args
  type: list(string)
- kind: block
  name: logging
  nested:
    - kind: attribute
      name: config
      type: map(string)
"#;
        let schema: Schema = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(schema.len(), 3);
        match schema.get("args") {
            Some(Field::Attribute(a)) => {
                assert_eq!(a.ty, AttrType::list(AttrType::String));
                assert!(!a.required);
            }
            other => panic!("expected attribute, got {:?}", other),
        }
        match schema.get("logging") {
            Some(Field::Block(b)) => assert!(!b.repeated),
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_rejects_duplicates() {
        let json = r#"[
            {"kind": "attribute", "name": "image", "type": "string"},
            {"kind": "attribute", "name": "image", "type": "number"}
        ]"#;
        let err = serde_json::from_str::<Schema>(json).unwrap_err();
        assert!(err.to_string().contains("duplicate field 'image'"));
    }

    #[test]
    fn test_json_round_trip() {
        let schema = Schema::builder()
            .required("image", AttrType::String)
            .block_list("mounts", logging_schema())
            .build()
            .unwrap();
        let json = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, back);
    }
}
