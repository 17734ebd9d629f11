//! Shared fixtures: the docker driver schema and the docker plugin's own
//! configuration struct.

#![allow(dead_code)]

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use taskconf::loader::load_schema_file;
use taskconf::{parse_driver_config, EscalationPolicy, Schema, TaskConfig, Value, Variables};

pub fn schema_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("config/schemas")
}

pub fn docker_schema() -> Schema {
    load_schema_file(&schema_dir().join("docker.yaml")).expect("docker schema fixture")
}

/// Variables used by the interpolation cases
pub fn docker_vars() -> Variables {
    Variables::new()
        .with("NOMAD_ALLOC_INDEX", 2i64)
        .with("NOMAD_META_hello", "world")
}

pub fn json(src: &str) -> Value {
    serde_json::from_str(src).expect("valid JSON fixture")
}

/// Decode, encode and weak-decode on the plugin side, as a task launch does
pub fn launch(config: &Value, vars: &Variables) -> DockerTaskConfig {
    let canonical = parse_driver_config(config, &docker_schema(), vars, EscalationPolicy::AnyDiagnostic)
        .unwrap_or_else(|e| panic!("{}", e));
    let mut task = TaskConfig::default();
    task.encode_driver_config(&canonical).expect("encode");
    task.decode_driver_config().expect("decode")
}

// =============================================================================
// PLUGIN-SIDE STRUCTS
// =============================================================================

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DockerTaskConfig {
    pub image: String,
    pub args: Vec<String>,
    pub pids_limit: i64,
    pub port_map: BTreeMap<String, i32>,
    pub network_mode: String,
    #[serde(rename = "dns_servers")]
    pub dns: Vec<String>,
    pub privileged: bool,
    pub devices: Vec<DockerDevice>,
    pub mounts: Vec<DockerMount>,
    pub logging: DockerLogging,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DockerDevice {
    pub host_path: String,
    pub container_path: String,
    pub cgroup_permissions: String,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DockerMount {
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
    pub source: String,
    pub readonly: bool,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DockerLogging {
    #[serde(rename = "type")]
    pub kind: String,
    pub config: BTreeMap<String, String>,
}

pub fn redis() -> DockerTaskConfig {
    DockerTaskConfig {
        image: "redis:3.2".to_string(),
        ..DockerTaskConfig::default()
    }
}
