//! Class registry
//!
//! Maps dotted class names to factories producing a fresh `TestClass`.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::class::TestClass;
use crate::error::ClassResolutionError;

type ClassFactory = Arc<dyn Fn() -> TestClass + Send + Sync>;

/// Name → factory lookup used by the executor
#[derive(Clone, Default)]
pub struct ClassRegistry {
    factories: BTreeMap<String, ClassFactory>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class factory under a dotted name, replacing any previous one
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> TestClass + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("Registering test class {}", name);
        self.factories.insert(name, Arc::new(factory));
        self
    }

    /// Build a fresh instance of the named class
    pub fn resolve(&self, name: &str) -> Result<TestClass, ClassResolutionError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.split('.').any(str::is_empty) {
            return Err(ClassResolutionError::InvalidName(name.to_string()));
        }

        let factory = self
            .factories
            .get(trimmed)
            .ok_or_else(|| ClassResolutionError::NotFound(trimmed.to_string()))?;

        let mut class = factory();
        class.set_name(trimmed);
        Ok(class)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.names())
            .finish()
    }
}
