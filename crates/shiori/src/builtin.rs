//! Registry of generators compiled into the engine.

use crate::suspend::suspend;
use serde::{Deserialize, Serialize};
use shiori_core::{TaskGenerator, STEP_TYPE_SUSPEND};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Step types with a builtin generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Builtin {
    /// Holds the pipeline at this step.
    Suspend,
}

impl Builtin {
    /// All builtins.
    pub const ALL: [Builtin; 1] = [Builtin::Suspend];

    /// Returns the step type this builtin answers to.
    pub fn step_type(&self) -> &'static str {
        match self {
            Builtin::Suspend => STEP_TYPE_SUSPEND,
        }
    }

    /// Returns the generator for this builtin.
    pub fn generator(&self) -> Arc<dyn TaskGenerator> {
        match self {
            Builtin::Suspend => Arc::new(suspend),
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.step_type())
    }
}

/// Step-type name to generator map.
///
/// Filled at construction and read-only afterwards, so a shared registry
/// needs no synchronization.
///
/// # Examples
///
/// ```
/// use shiori::{Builtin, BuiltinRegistry};
///
/// let registry = BuiltinRegistry::with_builtins(Builtin::ALL);
/// assert!(registry.contains("suspend"));
/// assert!(BuiltinRegistry::new().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct BuiltinRegistry {
    generators: HashMap<String, Arc<dyn TaskGenerator>>,
}

impl fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinRegistry")
            .field("step_types", &self.step_types())
            .finish()
    }
}

impl BuiltinRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the given builtins.
    pub fn with_builtins(builtins: impl IntoIterator<Item = Builtin>) -> Self {
        builtins
            .into_iter()
            .fold(Self::new(), |registry, builtin| {
                registry.register(builtin.step_type(), builtin.generator())
            })
    }

    /// Adds a generator for `step_type`, replacing any existing one.
    pub fn register(mut self, step_type: &str, generator: Arc<dyn TaskGenerator>) -> Self {
        self.generators.insert(step_type.to_string(), generator);
        self
    }

    /// Returns the generator registered for `step_type`. Exact match only.
    pub fn get(&self, step_type: &str) -> Option<Arc<dyn TaskGenerator>> {
        self.generators.get(step_type).cloned()
    }

    /// Returns `true` if `step_type` has a generator.
    pub fn contains(&self, step_type: &str) -> bool {
        self.generators.contains_key(step_type)
    }

    /// Returns the registered step types, sorted.
    pub fn step_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.generators.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Returns the number of registered generators.
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}
