//! Capability groups exposed to template-backed steps.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shiori_core::{TaskError, WorkflowContext};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// A named group of provider functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderGroup {
    /// Pipeline-scoped scratch space shared between steps.
    Workspace,
    /// Outbound messaging and notification.
    Email,
    /// Generic helpers (string, logging, conversion).
    Util,
    /// Read-only queries of cluster state.
    Query,
    /// Clocks and time arithmetic.
    Time,
    /// Resource dispatch and deletion.
    Kube,
    /// Outbound HTTP requests.
    Http,
}

impl ProviderGroup {
    /// Returns the group's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderGroup::Workspace => "workspace",
            ProviderGroup::Email => "email",
            ProviderGroup::Util => "util",
            ProviderGroup::Query => "query",
            ProviderGroup::Time => "time",
            ProviderGroup::Kube => "kube",
            ProviderGroup::Http => "http",
        }
    }
}

impl fmt::Display for ProviderGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of provider groups, as named by a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderSet(BTreeSet<ProviderGroup>);

impl ProviderSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `group` is in the set.
    pub fn contains(&self, group: ProviderGroup) -> bool {
        self.0.contains(&group)
    }

    /// Adds `group` to the set.
    pub fn insert(&mut self, group: ProviderGroup) -> bool {
        self.0.insert(group)
    }

    /// Iterates the groups in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = ProviderGroup> + '_ {
        self.0.iter().copied()
    }

    /// Returns the number of groups.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no group is enabled.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ProviderGroup> for ProviderSet {
    fn from_iter<I: IntoIterator<Item = ProviderGroup>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for ProviderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|g| g.as_str()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// A callable a template can invoke, such as `http.do` or `time.now`.
#[async_trait]
pub trait ProviderHandler: Send + Sync {
    /// Invokes the function with template-supplied arguments.
    async fn call(&self, ctx: &mut WorkflowContext, args: Value) -> Result<Value, TaskError>;
}

/// Installed provider functions keyed by group and function name.
///
/// Handlers are supplied by the embedding application. A profile decides
/// which groups a resolver may hand to templates via [`Providers::restricted_to`].
#[derive(Clone, Default)]
pub struct Providers {
    handlers: HashMap<ProviderGroup, HashMap<String, Arc<dyn ProviderHandler>>>,
}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<String> = self
            .handlers
            .iter()
            .flat_map(|(group, fns)| fns.keys().map(move |name| format!("{group}.{name}")))
            .collect();
        functions.sort();
        f.debug_struct("Providers")
            .field("functions", &functions)
            .finish()
    }
}

impl Providers {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `handler` as `group.function`, replacing any existing one.
    pub fn register(
        mut self,
        group: ProviderGroup,
        function: &str,
        handler: Arc<dyn ProviderHandler>,
    ) -> Self {
        self.handlers
            .entry(group)
            .or_default()
            .insert(function.to_string(), handler);
        self
    }

    /// Returns the handler for `group.function`.
    pub fn get(&self, group: ProviderGroup, function: &str) -> Option<Arc<dyn ProviderHandler>> {
        self.handlers.get(&group)?.get(function).cloned()
    }

    /// Returns the groups with at least one installed function.
    pub fn groups(&self) -> ProviderSet {
        self.handlers
            .iter()
            .filter(|(_, fns)| !fns.is_empty())
            .map(|(group, _)| *group)
            .collect()
    }

    /// Returns a copy holding only the groups in `allowed`.
    pub fn restricted_to(&self, allowed: &ProviderSet) -> Providers {
        Providers {
            handlers: self
                .handlers
                .iter()
                .filter(|(group, _)| allowed.contains(**group))
                .map(|(group, fns)| (*group, fns.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Constant(Value);

    #[async_trait]
    impl ProviderHandler for Constant {
        async fn call(&self, _ctx: &mut WorkflowContext, _args: Value) -> Result<Value, TaskError> {
            Ok(self.0.clone())
        }
    }

    fn providers() -> Providers {
        Providers::new()
            .register(ProviderGroup::Time, "now", Arc::new(Constant(json!(0))))
            .register(ProviderGroup::Http, "do", Arc::new(Constant(json!({"status": 200}))))
            .register(ProviderGroup::Email, "send", Arc::new(Constant(json!(true))))
    }

    #[test]
    fn test_groups() {
        let groups = providers().groups();
        assert_eq!(groups.len(), 3);
        assert!(groups.contains(ProviderGroup::Http));
        assert!(!groups.contains(ProviderGroup::Kube));
        assert_eq!(groups.to_string(), "[email, time, http]");
    }

    #[tokio::test]
    async fn test_restricted_to() {
        let allowed: ProviderSet = [ProviderGroup::Time, ProviderGroup::Kube].into_iter().collect();
        let restricted = providers().restricted_to(&allowed);

        assert!(restricted.get(ProviderGroup::Http, "do").is_none());
        let now = restricted.get(ProviderGroup::Time, "now").unwrap();
        let value = now.call(&mut WorkflowContext::new(), json!({})).await.unwrap();
        assert_eq!(value, json!(0));
    }

    #[test]
    fn test_provider_set_serde() {
        let set: ProviderSet = serde_json::from_value(json!(["util", "workspace"])).unwrap();
        assert!(set.contains(ProviderGroup::Util));
        assert_eq!(serde_json::to_value(&set).unwrap(), json!(["workspace", "util"]));
    }
}
