use std::collections::HashMap;

use anyhow::{anyhow, Result};

use super::backend::DetectorBackend;

/// Named collection of detector backends.
///
/// The scan controller owns exactly one detector; the registry is where the
/// binary collects every backend it could build and hands the configured one
/// over with `take`.
pub struct BackendRegistry {
    backends: HashMap<String, Box<dyn DetectorBackend>>,
    default_name: Option<String>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            default_name: None,
        }
    }

    /// Register a backend. The first registered backend becomes the default.
    pub fn register<B: DetectorBackend + 'static>(&mut self, backend: B) {
        let name = backend.name().to_string();
        if self.default_name.is_none() {
            self.default_name = Some(name.clone());
        }
        self.backends.insert(name, Box::new(backend));
    }

    /// Set default backend by name.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.backends.contains_key(name) {
            return Err(anyhow!("backend '{}' not registered", name));
        }
        self.default_name = Some(name.to_string());
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }

    /// List registered backends, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove and return the named backend.
    pub fn take(&mut self, name: &str) -> Result<Box<dyn DetectorBackend>> {
        let backend = self.backends.remove(name).ok_or_else(|| {
            anyhow!(
                "backend '{}' not registered (available: {})",
                name,
                self.list().join(", ")
            )
        })?;
        if self.default_name.as_deref() == Some(name) {
            self.default_name = None;
        }
        Ok(backend)
    }

    /// Remove and return the default backend.
    pub fn take_default(&mut self) -> Result<Box<dyn DetectorBackend>> {
        let name = self
            .default_name
            .clone()
            .ok_or_else(|| anyhow!("no default detector backend"))?;
        self.take(&name)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
