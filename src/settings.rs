//! Runtime settings
//!
//! Resolution order for every setting:
//! 1. Environment variable (`TASKCONF_SCHEMA_DIR`, `TASKCONF_ESCALATION`, `TASKCONF_LOG`)
//! 2. YAML settings file named by `TASKCONF_SETTINGS`, if set
//! 3. Built-in default (`config/schemas`, `any`, `info`)

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use taskconf_core::EscalationPolicy;
use tracing::info;

use crate::loader::SchemaLoader;
use crate::registry::SchemaRegistry;

pub const SCHEMA_DIR_ENV: &str = "TASKCONF_SCHEMA_DIR";
pub const ESCALATION_ENV: &str = "TASKCONF_ESCALATION";
pub const LOG_ENV: &str = "TASKCONF_LOG";
pub const SETTINGS_FILE_ENV: &str = "TASKCONF_SETTINGS";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// Directory of driver schema files
    pub schema_dir: PathBuf,
    /// Whether decode diagnostics reject a task launch
    pub escalation: EscalationPolicy,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_dir: PathBuf::from("config/schemas"),
            escalation: EscalationPolicy::AnyDiagnostic,
            log_filter: "info".to_string(),
        }
    }
}

/// On-disk form; every key optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SettingsFile {
    schema_dir: Option<PathBuf>,
    escalation: Option<String>,
    log_filter: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve settings against an arbitrary variable lookup
    pub fn resolve<F>(env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match env(SETTINGS_FILE_ENV) {
            Some(path) => read_settings_file(Path::new(&path))?,
            None => SettingsFile::default(),
        };
        let defaults = Settings::default();

        let schema_dir = env(SCHEMA_DIR_ENV)
            .map(PathBuf::from)
            .or(file.schema_dir)
            .unwrap_or(defaults.schema_dir);

        let escalation = match env(ESCALATION_ENV).or(file.escalation) {
            Some(text) => text
                .parse::<EscalationPolicy>()
                .map_err(|e| anyhow!(e))
                .context("Invalid escalation policy")?,
            None => defaults.escalation,
        };

        let log_filter = env(LOG_ENV)
            .or(file.log_filter)
            .unwrap_or(defaults.log_filter);

        Ok(Self {
            schema_dir,
            escalation,
            log_filter,
        })
    }

    /// Register every schema in `schema_dir` with `registry`
    pub fn load_schemas(&self, registry: &SchemaRegistry) -> Result<Vec<String>> {
        SchemaLoader::new(&self.schema_dir).register_all(registry)
    }
}

fn read_settings_file(path: &Path) -> Result<SettingsFile> {
    info!("Loading settings from {}", path.display());
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
