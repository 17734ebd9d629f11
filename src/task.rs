//! Task launch record and the orchestrator-side pipeline
//!
//! ```text
//! job document --config_from_json_envelope--> Value
//!     --parse_driver_config(schema, vars)--> CanonicalValue
//!     --TaskConfig::encode_driver_config--> raw_driver_config bytes
//!     ... plugin boundary ...
//!     --TaskConfig::decode_driver_config::<DriverConfig>--> DriverConfig
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use taskconf_core::{decode, DecodeError, Diagnostics, EscalationPolicy};
use taskconf_types::{CanonicalValue, Schema, Value, Variables};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::registry::{RegistryError, SchemaRegistry};
use crate::wire::{self, WireError};

// =============================================================================
// TASK CONFIG
// =============================================================================

/// Everything a driver plugin receives to start one task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub id: String,
    pub name: String,
    pub job_name: String,
    pub alloc_id: String,
    pub alloc_index: u32,
    pub env: BTreeMap<String, String>,
    pub meta: BTreeMap<String, String>,
    /// Encoded canonical driver configuration
    pub raw_driver_config: Vec<u8>,
}

impl TaskConfig {
    /// New task record in a fresh allocation
    pub fn new(job_name: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let alloc_id = Uuid::new_v4().to_string();
        Self {
            id: format!("{}/{}", alloc_id, name),
            name,
            job_name: job_name.into(),
            alloc_id,
            ..Self::default()
        }
    }

    pub fn encode_driver_config(&mut self, config: &CanonicalValue) -> Result<(), WireError> {
        self.raw_driver_config = wire::encode(config)?;
        Ok(())
    }

    pub fn decode_driver_config<T: DeserializeOwned>(&self) -> Result<T, WireError> {
        wire::decode(&self.raw_driver_config)
    }

    /// Interpolation environment for this task.
    ///
    /// `env` entries are exposed by name as strings; `meta` entries as
    /// `NOMAD_META_<key>`. The allocation index is a number so arithmetic on
    /// it works.
    pub fn variables(&self) -> Variables {
        let mut vars: Variables = self
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.as_str()))
            .collect();
        for (key, value) in &self.meta {
            vars = vars.with(format!("NOMAD_META_{}", key), value.as_str());
        }
        vars.with("NOMAD_ALLOC_ID", self.alloc_id.as_str())
            .with("NOMAD_ALLOC_INDEX", i64::from(self.alloc_index))
            .with("NOMAD_TASK_NAME", self.name.as_str())
            .with("NOMAD_JOB_NAME", self.job_name.as_str())
    }
}

// =============================================================================
// ORCHESTRATOR HELPERS
// =============================================================================

/// Decode a task's raw configuration and apply the escalation policy
pub fn parse_driver_config(
    config: &Value,
    schema: &Schema,
    vars: &Variables,
    policy: EscalationPolicy,
) -> Result<CanonicalValue, DecodeError> {
    let decoded = decode(config, schema, vars);
    for diag in &decoded.diagnostics {
        warn!(path = %diag.path, code = diag.code.as_str(), "{}", diag.message);
    }
    decoded.into_result(policy)
}

/// Pull the driver config out of a JSON job document.
///
/// Job documents carry the driver block under `"Config"`; a missing or null
/// member yields `Value::Null`, which decodes as an absent block.
pub fn config_from_json_envelope(json: &str) -> Result<Value, serde_json::Error> {
    let document: Value = serde_json::from_str(json)?;
    Ok(document.get("Config").cloned().unwrap_or_default())
}

// =============================================================================
// LAUNCH PIPELINE
// =============================================================================

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("no schema registered for driver '{0}'")]
    UnknownDriver(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Decode `config` against the driver's registered schema and store the
/// encoded result in `task`.
///
/// Returns the diagnostics that were tolerated under `policy`.
pub fn prepare_launch(
    registry: &SchemaRegistry,
    driver: &str,
    config: &Value,
    policy: EscalationPolicy,
    task: &mut TaskConfig,
) -> Result<Diagnostics, LaunchError> {
    let schema = registry
        .get(driver)?
        .ok_or_else(|| LaunchError::UnknownDriver(driver.to_string()))?;

    let decoded = decode(config, &schema, &task.variables());
    let diagnostics = decoded.diagnostics.clone();
    for diag in &diagnostics {
        warn!(task = %task.id, path = %diag.path, code = diag.code.as_str(), "{}", diag.message);
    }

    let canonical = decoded.into_result(policy)?;
    task.encode_driver_config(&canonical)?;
    debug!(
        task = %task.id,
        driver,
        bytes = task.raw_driver_config.len(),
        "driver config prepared"
    );
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use taskconf_types::{AttrType, Scalar};

    fn schema() -> Schema {
        Schema::builder()
            .required("image", AttrType::String)
            .optional("pids_limit", AttrType::Number)
            .build()
            .unwrap()
    }

    #[test]
    fn test_variables_from_task() {
        let mut task = TaskConfig::new("cache", "redis");
        task.alloc_index = 2;
        task.meta.insert("hello".to_string(), "world".to_string());
        task.env.insert("REGION".to_string(), "eu".to_string());

        let vars = task.variables();
        assert_eq!(vars.get("NOMAD_TASK_NAME"), Some(&Scalar::from("redis")));
        assert_eq!(vars.get("NOMAD_JOB_NAME"), Some(&Scalar::from("cache")));
        assert_eq!(vars.get("NOMAD_ALLOC_INDEX"), Some(&Scalar::from(2i64)));
        assert_eq!(vars.get("NOMAD_META_hello"), Some(&Scalar::from("world")));
        assert_eq!(vars.get("REGION"), Some(&Scalar::from("eu")));
        assert!(task.id.starts_with(&task.alloc_id));
    }

    #[test]
    fn test_envelope() {
        let config = config_from_json_envelope(r#"{"Name": "redis", "Config": {"image": "redis"}}"#).unwrap();
        assert_eq!(config.get("image"), Some(&Value::string("redis")));
        assert_eq!(config_from_json_envelope(r#"{"Name": "redis"}"#).unwrap(), Value::Null);
        assert!(config_from_json_envelope("{").is_err());
    }

    #[test]
    fn test_parse_driver_config_policy() {
        let config = Value::object([("pids_limit", Value::string("2"))]);
        let err = parse_driver_config(&config, &schema(), &Variables::new(), EscalationPolicy::AnyDiagnostic)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Rejected(ref d) if d.len() == 1));

        let lenient = parse_driver_config(&config, &schema(), &Variables::new(), EscalationPolicy::Never)
            .unwrap();
        assert_eq!(lenient.get("image"), Some(&Value::string("")));
    }

    #[test]
    fn test_prepare_launch() {
        let registry = SchemaRegistry::new();
        registry.register("docker", schema()).unwrap();

        let mut task = TaskConfig::new("cache", "redis");
        task.alloc_index = 2;
        let config = Value::object([
            ("image", Value::string("redis:3.2")),
            ("pids_limit", Value::string("${NOMAD_ALLOC_INDEX + 2}")),
        ]);
        let tolerated =
            prepare_launch(&registry, "docker", &config, EscalationPolicy::AnyDiagnostic, &mut task)
                .unwrap();
        assert!(tolerated.is_empty());

        #[derive(Debug, Default, Deserialize)]
        #[serde(default)]
        struct Docker {
            image: String,
            pids_limit: i64,
        }
        let docker: Docker = task.decode_driver_config().unwrap();
        assert_eq!(docker.image, "redis:3.2");
        assert_eq!(docker.pids_limit, 4);
    }

    #[test]
    fn test_prepare_launch_failures() {
        let registry = SchemaRegistry::new();
        let mut task = TaskConfig::new("cache", "redis");
        let config = Value::object([("image", Value::string("redis"))]);

        let err = prepare_launch(&registry, "docker", &config, EscalationPolicy::Never, &mut task)
            .unwrap_err();
        assert!(matches!(err, LaunchError::UnknownDriver(_)));

        registry.register("docker", schema()).unwrap();
        let err = prepare_launch(
            &registry,
            "docker",
            &Value::object([("pids_limit", Value::string("${missing}"))]),
            EscalationPolicy::AnyDiagnostic,
            &mut task,
        )
        .unwrap_err();
        assert!(matches!(err, LaunchError::Decode(_)));
        assert!(task.raw_driver_config.is_empty());
    }

    #[test]
    fn test_prepare_launch_rejects_job_without_config() {
        let registry = SchemaRegistry::new();
        registry.register("docker", schema()).unwrap();
        let mut task = TaskConfig::new("cache", "redis");

        let config = config_from_json_envelope(r#"{"Name": "redis", "Driver": "docker"}"#).unwrap();
        let err = prepare_launch(&registry, "docker", &config, EscalationPolicy::AnyDiagnostic, &mut task)
            .unwrap_err();
        match err {
            LaunchError::Decode(DecodeError::Rejected(diags)) => {
                assert_eq!(diags.len(), 1);
                assert_eq!(diags.iter().next().map(|d| d.path.to_string()), Some("image".to_string()));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(task.raw_driver_config.is_empty());
    }
}
