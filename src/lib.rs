//! taskconf: driver task configuration bridge
//!
//! Sits between a workload orchestrator and its task driver plugins. The
//! orchestrator decodes an operator's free-form configuration block against the
//! schema a driver published, resolving `${...}` interpolation and weak type
//! coercion along the way, then ships the canonical result to the plugin as
//! self-describing bytes. The plugin weak-decodes those bytes into its own
//! static configuration struct.
//!
//! ## Crates
//!
//! - `taskconf_types`: values, schemas, variable environments
//! - `taskconf-core`: interpolation, coercion, diagnostics, the decoder
//! - `taskconf` (this crate): wire codec, schema registry and loader,
//!   task launch record, settings, tracing setup
//!
//! ## Example
//!
//! ```
//! use taskconf::{parse_driver_config, wire, AttrType, EscalationPolicy, Schema, Value, Variables};
//!
//! let schema = Schema::builder()
//!     .required("image", AttrType::String)
//!     .optional("pids_limit", AttrType::Number)
//!     .build()
//!     .unwrap();
//! let vars = Variables::new().with("NOMAD_ALLOC_INDEX", 2i64);
//! let config = Value::object([
//!     ("image", Value::string("redis:3.2")),
//!     ("pids_limit", Value::string("${NOMAD_ALLOC_INDEX + 2}")),
//! ]);
//!
//! let canonical = parse_driver_config(&config, &schema, &vars, EscalationPolicy::AnyDiagnostic).unwrap();
//! let bytes = wire::encode(&canonical).unwrap();
//!
//! #[derive(serde::Deserialize, Default)]
//! #[serde(default)]
//! struct Docker {
//!     image: String,
//!     pids_limit: i64,
//! }
//! let docker: Docker = wire::decode(&bytes).unwrap();
//! assert_eq!(docker.pids_limit, 4);
//! ```

pub mod loader;
pub mod registry;
pub mod settings;
pub mod task;
pub mod telemetry;
pub mod wire;

pub use loader::SchemaLoader;
pub use registry::{RegistryError, SchemaRegistry};
pub use settings::Settings;
pub use task::{
    config_from_json_envelope, parse_driver_config, prepare_launch, LaunchError, TaskConfig,
};
pub use wire::WireError;

pub use taskconf_core::{
    decode, AttributePath, DecodeError, Decoded, Diagnostic, DiagnosticCode, Diagnostics,
    EscalationPolicy,
};
pub use taskconf_types::{AttrType, CanonicalValue, Schema, Value, Variables};
