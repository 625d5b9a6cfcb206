//! Backend Registry
//!
//! Maps backend names (as written in the service configuration) to
//! constructors of [`DataSafe`] implementations.

use std::collections::HashMap;

use crate::error::{Result, SafeError};
use crate::safe::{DataSafe, FileSafe};

/// Builds a fresh, inactive backend
pub type Constructor = fn() -> Box<dyn DataSafe>;

/// Known data safe backends, by name
#[derive(Debug, Default)]
pub struct Registry {
    backends: HashMap<String, Constructor>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every backend shipped in this crate
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .backends
            .insert(FileSafe::NAME.to_string(), new_file_safe);
        registry
    }

    /// Register a backend; names must be unique
    pub fn register(&mut self, name: &str, constructor: Constructor) -> Result<()> {
        if self.backends.contains_key(name) {
            return Err(SafeError::AlreadyRegistered(name.to_string()));
        }
        self.backends.insert(name.to_string(), constructor);
        Ok(())
    }

    /// Construct the backend registered under `name`
    pub fn create(&self, name: &str) -> Result<Box<dyn DataSafe>> {
        self.backends
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| SafeError::UnknownBackend(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }
}

fn new_file_safe() -> Box<dyn DataSafe> {
    Box::new(FileSafe::new())
}
