//! Schema-driven decoder
//!
//! Walks a dynamic [`Value`] against a driver [`Schema`] and produces a
//! [`CanonicalValue`]: every declared attribute present with its declared type,
//! every block an object or an ordered list of objects.
//!
//! ## Walk order
//!
//! Fields are visited in schema declaration order, depth first. For a single
//! field, interpolation runs before coercion, so an unresolvable variable is
//! reported (and the field zero-filled) without a second coercion diagnostic.
//! A required attribute that is present but fails interpolation reports the
//! interpolation failure only.
//!
//! ## Shape tolerance
//!
//! - JSON `null` is treated as absent
//! - a singleton block may arrive as a bare object or a one-element list of
//!   objects; both decode identically
//! - a repeated block accepts a list of objects or a single object
//! - a map attribute accepts an object or the block-shaped list of objects,
//!   merged in order
//! - keys the schema does not declare are ignored
//!
//! Problems never abort the walk; they are accumulated as [`Diagnostics`] and
//! the offending value is replaced by its type's zero value.

use std::borrow::Cow;
use taskconf_types::value::{find_entry, upsert_entry};
use taskconf_types::{AttrType, Attribute, Block, CanonicalValue, Field, Schema, Value, Variables};
use thiserror::Error;
use tracing::{debug, trace};

use crate::coerce;
use crate::diagnostics::{AttributePath, Diagnostic, DiagnosticCode, Diagnostics, EscalationPolicy};
use crate::expr;

// =============================================================================
// RESULT TYPES
// =============================================================================

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("task configuration rejected:\n{0}")]
    Rejected(Diagnostics),
}

/// Output of one decode call
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub value: CanonicalValue,
    pub diagnostics: Diagnostics,
}

impl Decoded {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Apply the caller's escalation policy
    pub fn into_result(self, policy: EscalationPolicy) -> Result<CanonicalValue, DecodeError> {
        match policy {
            EscalationPolicy::AnyDiagnostic if self.diagnostics.has_errors() => {
                Err(DecodeError::Rejected(self.diagnostics))
            }
            _ => Ok(self.value),
        }
    }
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Decode `value` against `schema`, resolving interpolation with `vars`.
///
/// The root value is treated like a singleton block body: an object or a
/// one-element list holding an object. A null or empty root is walked as an
/// empty object, so required attributes still report.
pub fn decode(value: &Value, schema: &Schema, vars: &Variables) -> Decoded {
    debug!(fields = schema.len(), vars = vars.len(), "decoding task configuration");

    let mut walker = Walker::new(vars);
    let entries = match value {
        Value::Null => walker.object(&[], schema),
        Value::List(items) if items.is_empty() => walker.object(&[], schema),
        root => walker.singleton(Some(root), schema),
    };

    debug!(
        diagnostics = walker.diagnostics.len(),
        "task configuration decoded"
    );

    Decoded {
        value: CanonicalValue::from_entries(entries),
        diagnostics: walker.diagnostics,
    }
}

// =============================================================================
// WALKER
// =============================================================================

struct Walker<'a> {
    vars: &'a Variables,
    path: AttributePath,
    diagnostics: Diagnostics,
}

impl<'a> Walker<'a> {
    fn new(vars: &'a Variables) -> Self {
        Self {
            vars,
            path: AttributePath::root(),
            diagnostics: Diagnostics::new(),
        }
    }

    fn report(&mut self, diag: Diagnostic) {
        trace!(path = %diag.path, code = diag.code.as_str(), "{}", diag.message);
        self.diagnostics.push(diag);
    }

    fn mismatch(&mut self, expected: impl std::fmt::Display, found: &Value) {
        let diag = Diagnostic::type_mismatch(self.path.clone(), expected, found.type_name());
        self.report(diag);
    }

    // -------------------------------------------------------------------------
    // Objects and blocks
    // -------------------------------------------------------------------------

    fn object(&mut self, input: &[(String, Value)], schema: &Schema) -> Vec<(String, Value)> {
        let mut out = Vec::with_capacity(schema.len());
        for field in schema.fields() {
            let found = find_entry(input, field.name()).filter(|v| !v.is_null());
            self.path.push_key(field.name());
            let decoded = match field {
                Field::Attribute(attr) => self.attribute(found, attr),
                Field::Block(block) => self.block(found, block),
            };
            self.path.pop();
            out.push((field.name().to_string(), decoded));
        }
        out
    }

    fn block(&mut self, found: Option<&Value>, block: &Block) -> Value {
        if block.repeated {
            Value::List(self.repeated(found, &block.nested))
        } else {
            Value::Object(self.singleton(found, &block.nested))
        }
    }

    /// Singleton body: bare object, or a list holding at most one object
    fn singleton(&mut self, found: Option<&Value>, schema: &Schema) -> Vec<(String, Value)> {
        match found {
            None => schema.zero_object(),
            Some(Value::Object(entries)) => self.object(entries, schema),
            Some(Value::List(items)) => match items.as_slice() {
                [] => schema.zero_object(),
                [Value::Object(entries)] => self.object(entries, schema),
                [Value::Object(entries), ..] => {
                    let diag = Diagnostic::new(
                        DiagnosticCode::TypeMismatch,
                        self.path.clone(),
                        format!("expected at most one block, found {}", items.len()),
                    );
                    self.report(diag);
                    self.object(entries, schema)
                }
                [other, ..] => {
                    self.mismatch("block", other);
                    schema.zero_object()
                }
            },
            Some(other) => {
                self.mismatch("block", other);
                schema.zero_object()
            }
        }
    }

    /// Repeated body: list of objects, or a single object
    fn repeated(&mut self, found: Option<&Value>, schema: &Schema) -> Vec<Value> {
        let items: Cow<'_, [Value]> = match found {
            None => return Vec::new(),
            Some(Value::List(items)) => Cow::Borrowed(items),
            Some(obj @ Value::Object(_)) => Cow::Owned(vec![obj.clone()]),
            Some(other) => {
                self.mismatch("list of blocks", other);
                return Vec::new();
            }
        };

        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                self.path.push_index(i);
                let entries = match item {
                    Value::Object(entries) => self.object(entries, schema),
                    other => {
                        self.mismatch("block", other);
                        schema.zero_object()
                    }
                };
                self.path.pop();
                Value::Object(entries)
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    fn attribute(&mut self, found: Option<&Value>, attr: &Attribute) -> Value {
        match found {
            Some(value) => self.typed(value, &attr.ty),
            None => {
                if attr.required {
                    let diag = Diagnostic::missing_attribute(self.path.clone());
                    self.report(diag);
                }
                attr.ty.zero_value()
            }
        }
    }

    /// Interpolate string leaves, then coerce to `ty`
    fn typed(&mut self, value: &Value, ty: &AttrType) -> Value {
        let resolved = match value {
            Value::String(s) if expr::has_interpolation(s) => {
                match expr::evaluate_template(s, self.vars) {
                    Ok(scalar) => Cow::Owned(scalar.into_value()),
                    Err(err) => {
                        let diag = Diagnostic::from_expr(self.path.clone(), &err);
                        self.report(diag);
                        return ty.zero_value();
                    }
                }
            }
            other => Cow::Borrowed(other),
        };

        match ty {
            AttrType::List(elem) => self.list(&resolved, elem),
            AttrType::Map(elem) => self.map(&resolved, elem),
            scalar => match coerce::coerce_scalar(&resolved, scalar) {
                Ok(v) => v,
                Err(err) => {
                    let diag = Diagnostic::new(
                        DiagnosticCode::TypeMismatch,
                        self.path.clone(),
                        err.to_string(),
                    );
                    self.report(diag);
                    scalar.zero_value()
                }
            },
        }
    }

    fn list(&mut self, value: &Value, elem: &AttrType) -> Value {
        let Value::List(items) = value else {
            self.mismatch(AttrType::list(elem.clone()), value);
            return Value::List(Vec::new());
        };

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            self.path.push_index(i);
            out.push(self.element(item, elem));
            self.path.pop();
        }
        Value::List(out)
    }

    fn map(&mut self, value: &Value, elem: &AttrType) -> Value {
        let mut out = Vec::new();
        match value {
            Value::Object(entries) => self.map_entries(entries, elem, &mut out),
            Value::List(items) if items.iter().all(|i| matches!(i, Value::Object(_))) => {
                for item in items {
                    if let Value::Object(entries) = item {
                        self.map_entries(entries, elem, &mut out);
                    }
                }
            }
            other => self.mismatch(AttrType::map(elem.clone()), other),
        }
        Value::Object(out)
    }

    fn map_entries(
        &mut self,
        entries: &[(String, Value)],
        elem: &AttrType,
        out: &mut Vec<(String, Value)>,
    ) {
        for (key, item) in entries {
            self.path.push_key(key.as_str());
            let decoded = self.element(item, elem);
            self.path.pop();
            upsert_entry(out, key.clone(), decoded);
        }
    }

    /// Collection elements decode like attributes; a null element zero-fills
    fn element(&mut self, item: &Value, elem: &AttrType) -> Value {
        if item.is_null() {
            return elem.zero_value();
        }
        self.typed(item, elem)
    }
}

// =============================================================================
// TESTS
// =============================================================================
