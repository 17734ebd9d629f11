//! Task configuration types - Level 1 foundation types
//!
//! This crate contains the pure data structures shared by the orchestrator side
//! (schema-driven decoding) and the plugin side (wire decoding into a driver's
//! static configuration struct).
//!
//! ## Architecture Level: LEVEL 1 (Foundation)
//!
//! Every other crate in the workspace depends on this one; this crate depends on
//! nothing in the workspace.
//!
//! ## Contents
//!
//! - [`Value`] / [`Number`]: the dynamic tagged value produced by the
//!   configuration parsers and the canonical value produced by the decoder
//! - [`Schema`]: the typed, immutable description of a driver's accepted
//!   configuration block
//! - [`Variables`] / [`Scalar`]: the per-launch interpolation environment
//!
//! ## Rules
//!
//! 1. **NO BUSINESS LOGIC** - decoding, coercion and evaluation live in `taskconf-core`
//! 2. **SERIALIZABLE** - all types support serde
//! 3. **THREAD SAFE** - all types are `Send + Sync`; schemas are shared read-only

pub mod schema;
pub mod value;
pub mod vars;

pub use schema::{AttrType, Attribute, Block, Field, Schema, SchemaBuilder, SchemaError};
pub use value::{CanonicalValue, Number, Value};
pub use vars::{Scalar, Variables};
