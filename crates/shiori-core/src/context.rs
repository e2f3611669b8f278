//! Per-pipeline variable store handed to task runners.

use serde_json::{Map, Value};
use std::fmt;

/// Type-safe context variable path, dot separated (`"outputs.image"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarPath(String);

impl VarPath {
    /// Creates a new VarPath.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('.').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for VarPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VarPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for VarPath {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Variables shared by the steps of one pipeline instance.
///
/// Values are JSON and addressed by dotted paths. Intermediate objects are
/// created on write.
///
/// # Examples
///
/// ```
/// use shiori_core::WorkflowContext;
/// use serde_json::json;
///
/// let mut ctx = WorkflowContext::new();
/// ctx.set_var("deploy.image", json!("nginx:1.25"));
///
/// assert_eq!(ctx.get_var("deploy.image"), Some(&json!("nginx:1.25")));
/// assert_eq!(ctx.get_var("deploy"), Some(&json!({"image": "nginx:1.25"})));
/// assert_eq!(ctx.get_var("deploy.replicas"), None);
/// ```
pub struct WorkflowContext {
    vars: Map<String, Value>,
}

impl fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for WorkflowContext {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self { vars: Map::new() }
    }

    /// Returns the value at `path`, if any.
    pub fn get_var(&self, path: impl Into<VarPath>) -> Option<&Value> {
        let path = path.into();
        let mut segments = path.segments();
        let mut current = self.vars.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Stores `value` at `path`, replacing whatever was there.
    ///
    /// Non-object values on the way are replaced by objects. An empty path
    /// is ignored.
    pub fn set_var(&mut self, path: impl Into<VarPath>, value: Value) {
        let path = path.into();
        let segments: Vec<&str> = path.segments().collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut current = &mut self.vars;
        for segment in parents {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = match entry {
                Value::Object(map) => map,
                _ => return,
            };
        }
        current.insert(last.to_string(), value);
    }

    /// Removes the value at `path` and returns it.
    pub fn remove_var(&mut self, path: impl Into<VarPath>) -> Option<Value> {
        let path = path.into();
        let segments: Vec<&str> = path.segments().collect();
        let (last, parents) = segments.split_last()?;

        let mut current = &mut self.vars;
        for segment in parents {
            current = current.get_mut(*segment)?.as_object_mut()?;
        }
        current.remove(*last)
    }

    /// Returns `true` if a value exists at `path`.
    pub fn contains_var(&self, path: impl Into<VarPath>) -> bool {
        self.get_var(path).is_some()
    }

    /// Returns the number of top-level variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if the context holds no variables.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
