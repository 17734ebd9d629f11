//! taskconf-core: schema-driven decoding of driver task configuration
//!
//! This crate contains the pure transformation logic with NO I/O:
//! - Interpolation of `${...}` spans against a variable environment (nom grammar)
//! - The single weak-coercion table shared by every decoding layer
//! - Diagnostic types accumulated across a decode walk
//! - The decoder that walks a dynamic value against a driver schema and
//!   produces a canonical value
//!
//! Wire encoding, the schema registry and file loading live in the root
//! `taskconf` crate.

pub mod coerce;
pub mod decoder;
pub mod diagnostics;
pub mod expr;

pub use decoder::{decode, DecodeError, Decoded};
pub use diagnostics::{AttributePath, Diagnostic, DiagnosticCode, Diagnostics, EscalationPolicy};
pub use expr::{evaluate_template, has_interpolation, ExprError};
