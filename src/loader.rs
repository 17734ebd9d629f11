//! Schema loader
//!
//! Loads driver schemas from a directory of YAML or JSON files. The file stem
//! names the driver: `schemas/docker.yaml` registers the `docker` schema.
//! Files starting with `_` are skipped.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use taskconf_types::Schema;
use tracing::{info, warn};

use crate::registry::SchemaRegistry;

pub struct SchemaLoader {
    schema_dir: PathBuf,
}

impl SchemaLoader {
    pub fn new(schema_dir: impl Into<PathBuf>) -> Self {
        Self {
            schema_dir: schema_dir.into(),
        }
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Parse every schema file in the directory, sorted by driver name
    pub fn load_all(&self) -> Result<Vec<(String, Schema)>> {
        info!("Loading driver schemas from {}", self.schema_dir.display());

        let mut schemas = Vec::new();
        for path in self.find_schema_files()? {
            let Some(driver) = driver_name(&path) else {
                warn!("Skipping schema file with unusable name: {}", path.display());
                continue;
            };
            let schema = load_schema_file(&path)?;
            schemas.push((driver, schema));
        }

        info!("Loaded {} driver schemas", schemas.len());
        Ok(schemas)
    }

    /// Load every schema and register it; returns the driver names registered
    pub fn register_all(&self, registry: &SchemaRegistry) -> Result<Vec<String>> {
        let mut registered = Vec::new();
        for (driver, schema) in self.load_all()? {
            registry
                .register(driver.clone(), schema)
                .with_context(|| format!("Failed to register schema for driver '{}'", driver))?;
            registered.push(driver);
        }
        Ok(registered)
    }

    fn find_schema_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in std::fs::read_dir(&self.schema_dir)
            .with_context(|| format!("Failed to read directory {}", self.schema_dir.display()))?
        {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                continue;
            }
            let skipped = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('_'))
                .unwrap_or(true);
            if skipped {
                continue;
            }
            if path
                .extension()
                .map(|e| e == "yaml" || e == "yml" || e == "json")
                .unwrap_or(false)
            {
                files.push(path);
            }
        }

        // Sort for deterministic loading order
        files.sort();
        Ok(files)
    }
}

/// Read one schema file, choosing the parser from the extension
pub fn load_schema_file(path: &Path) -> Result<Schema> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let schema = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str::<Schema>(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?,
        Some("yaml") | Some("yml") => serde_yaml::from_str::<Schema>(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?,
        _ => return Err(anyhow!("Unsupported schema file type: {}", path.display())),
    };

    Ok(schema)
}

fn driver_name(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
