//! Process-wide driver schema registry
//!
//! Schemas are registered once per driver (at plugin handshake or from the
//! schema directory) and then read concurrently by every task launch. Entries
//! are shared as `Arc<Schema>` so a lookup never copies a schema or holds the
//! lock while decoding.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};
use taskconf_types::Schema;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("a schema is already registered for driver '{0}'")]
    AlreadyRegistered(String),

    #[error("schema registry lock poisoned")]
    Poisoned,
}

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, Arc<Schema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver's schema. A driver registers exactly once.
    pub fn register(
        &self,
        driver: impl Into<String>,
        schema: Schema,
    ) -> Result<Arc<Schema>, RegistryError> {
        let driver = driver.into();
        let mut schemas = self.schemas.write().map_err(|_| RegistryError::Poisoned)?;
        if schemas.contains_key(&driver) {
            return Err(RegistryError::AlreadyRegistered(driver));
        }
        let schema = Arc::new(schema);
        info!(driver = %driver, fields = schema.len(), "registered driver schema");
        schemas.insert(driver, Arc::clone(&schema));
        Ok(schema)
    }

    pub fn get(&self, driver: &str) -> Result<Option<Arc<Schema>>, RegistryError> {
        let schemas = self.schemas.read().map_err(|_| RegistryError::Poisoned)?;
        Ok(schemas.get(driver).cloned())
    }

    /// Drop a driver's schema (plugin shut down); in-flight decodes keep their `Arc`
    pub fn deregister(&self, driver: &str) -> Result<Option<Arc<Schema>>, RegistryError> {
        let mut schemas = self.schemas.write().map_err(|_| RegistryError::Poisoned)?;
        let removed = schemas.remove(driver);
        if removed.is_some() {
            debug!(driver, "deregistered driver schema");
        }
        Ok(removed)
    }

    /// Registered driver names, sorted
    pub fn drivers(&self) -> Result<Vec<String>, RegistryError> {
        let schemas = self.schemas.read().map_err(|_| RegistryError::Poisoned)?;
        let mut names: Vec<String> = schemas.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn len(&self) -> usize {
        self.schemas.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static GLOBAL_REGISTRY: OnceLock<SchemaRegistry> = OnceLock::new();

/// The shared registry for this process
pub fn global() -> &'static SchemaRegistry {
    GLOBAL_REGISTRY.get_or_init(SchemaRegistry::new)
}
