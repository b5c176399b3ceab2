//! Construction of transform implementations from materialized parameters.
//!
//! Implementations are registered as factory closures keyed by
//! [`ImplementationId`]. Every call to
//! [`instantiate`](InstantiatorRegistry::instantiate) runs the factory again;
//! instances are never cached or pooled.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::error::InstantiationError;
use super::identity::ImplementationId;
use super::params::Arguments;

type Factory<T> = Box<dyn Fn(Arguments) -> Result<Box<T>, InstantiationError> + Send + Sync>;

/// Factories for one kind of transform implementation (`T` is the trait
/// object the factories produce).
pub struct InstantiatorRegistry<T: ?Sized> {
    factories: BTreeMap<ImplementationId, Factory<T>>,
}

impl<T: ?Sized> InstantiatorRegistry<T> {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register a factory, replacing any previous one with the same id.
    pub fn register<F>(&mut self, id: impl Into<ImplementationId>, factory: F) -> &mut Self
    where
        F: Fn(Arguments) -> Result<Box<T>, InstantiationError> + Send + Sync + 'static,
    {
        self.factories.insert(id.into(), Box::new(factory));
        self
    }

    pub fn contains(&self, id: &ImplementationId) -> bool {
        self.factories.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ImplementationId> {
        self.factories.keys()
    }

    /// Construct a fresh instance of `id` from `args`.
    pub fn instantiate(
        &self,
        id: &ImplementationId,
        args: Vec<Value>,
    ) -> Result<Box<T>, InstantiationError> {
        let factory = self
            .factories
            .get(id)
            .ok_or_else(|| InstantiationError::Unresolved(id.clone()))?;
        factory(Arguments::new(id.clone(), args))
    }
}

impl<T: ?Sized> Default for InstantiatorRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for InstantiatorRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstantiatorRegistry")
            .field("ids", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
