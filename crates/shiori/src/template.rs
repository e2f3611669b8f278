//! Template-backed resolution of non-builtin step types.
//!
//! A [`TemplateTaskLoader`] fetches a step type's template from a
//! [`TemplateSource`] and hands it to a [`TemplateCompiler`]. Compiling and
//! executing templates belongs to the embedding application; this module
//! only wires the pieces together.

use crate::discover::{DiscoverContext, TaskDiscover};
use crate::providers::Providers;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shiori_core::{TaskError, TaskGenerator};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Where templates for non-builtin step types come from.
#[async_trait]
pub trait TemplateSource: Send + Sync + fmt::Debug {
    /// Describes the lookup scope, e.g. `revision app-v3`.
    fn scope(&self) -> String;

    /// Returns the template text for step type `name`.
    async fn load_task_template(
        &self,
        ctx: &DiscoverContext,
        name: &str,
    ) -> Result<String, TaskError>;
}

/// A pipeline revision with the step definitions it was rendered with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRevision {
    /// Revision name.
    pub name: String,
    /// Step type to template text.
    #[serde(default)]
    pub step_definitions: HashMap<String, String>,
}

/// Serves templates frozen into a [`PipelineRevision`].
#[derive(Debug, Clone)]
pub struct RevisionTemplateSource {
    revision: Arc<PipelineRevision>,
}

impl RevisionTemplateSource {
    /// Creates a source over the step definitions of `revision`.
    pub fn new(revision: impl Into<Arc<PipelineRevision>>) -> Self {
        Self {
            revision: revision.into(),
        }
    }
}

#[async_trait]
impl TemplateSource for RevisionTemplateSource {
    fn scope(&self) -> String {
        format!("revision {}", self.revision.name)
    }

    async fn load_task_template(
        &self,
        _ctx: &DiscoverContext,
        name: &str,
    ) -> Result<String, TaskError> {
        self.revision
            .step_definitions
            .get(name)
            .cloned()
            .ok_or_else(|| TaskError::TemplateNotFound {
                name: name.to_string(),
                scope: self.scope(),
            })
    }
}

/// Namespaced template storage, typically backed by the cluster.
#[async_trait]
pub trait TemplateStore: Send + Sync + fmt::Debug {
    /// Returns the template `name` in `namespace`, or `None` if absent.
    async fn get_template(&self, namespace: &str, name: &str)
        -> Result<Option<String>, TaskError>;
}

/// Serves view templates from one namespace of a [`TemplateStore`].
#[derive(Debug, Clone)]
pub struct ViewTemplateSource {
    store: Arc<dyn TemplateStore>,
    namespace: String,
}

impl ViewTemplateSource {
    /// Creates a source reading templates from `namespace` in `store`.
    pub fn new(store: Arc<dyn TemplateStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }
}

#[async_trait]
impl TemplateSource for ViewTemplateSource {
    fn scope(&self) -> String {
        format!("namespace {}", self.namespace)
    }

    async fn load_task_template(
        &self,
        _ctx: &DiscoverContext,
        name: &str,
    ) -> Result<String, TaskError> {
        self.store
            .get_template(&self.namespace, name)
            .await?
            .ok_or_else(|| TaskError::TemplateNotFound {
                name: name.to_string(),
                scope: self.scope(),
            })
    }
}

/// Schema and package discovery used while compiling templates.
pub trait PackageDiscover: Send + Sync + fmt::Debug {
    /// Returns the source of the package at `import_path`, if known.
    fn lookup(&self, import_path: &str) -> Option<String>;

    /// Returns every known import path.
    fn import_paths(&self) -> Vec<String>;
}

/// Engine-owned facts about the running pipeline, visible to templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessContext {
    /// Application the pipeline belongs to.
    pub app_name: String,
    /// Namespace the application runs in.
    pub namespace: String,
    /// Extra engine-provided values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Value>,
}

impl ProcessContext {
    /// Creates a context with no extra data.
    pub fn new(app_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            namespace: namespace.into(),
            data: BTreeMap::new(),
        }
    }

    /// Adds an extra value.
    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// Everything a compiler may use when turning a template into a generator.
#[derive(Debug, Clone, Default)]
pub struct TemplateEnv {
    /// Provider functions the template may call.
    pub providers: Providers,
    /// Resolves imported packages, when the engine has any.
    pub package_discover: Option<Arc<dyn PackageDiscover>>,
    /// Diagnostic verbosity; 0 is quiet.
    pub log_level: u8,
    /// Facts about the running pipeline.
    pub process_context: ProcessContext,
}

/// Compiles template text into a generator.
pub trait TemplateCompiler: Send + Sync {
    /// Compiles the template for step type `name`.
    fn compile(
        &self,
        name: &str,
        template: &str,
        env: &TemplateEnv,
    ) -> Result<Arc<dyn TaskGenerator>, TaskError>;
}

/// Remote resolver: loads a template, then compiles it.
///
/// Loading honors the caller's cancellation and deadline. Errors from the
/// source or the compiler are returned unchanged.
pub struct TemplateTaskLoader {
    source: Arc<dyn TemplateSource>,
    compiler: Arc<dyn TemplateCompiler>,
    env: TemplateEnv,
}

impl fmt::Debug for TemplateTaskLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateTaskLoader")
            .field("source", &self.source)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

impl TemplateTaskLoader {
    /// Creates a loader compiling templates from `source` with `compiler`.
    pub fn new(
        source: Arc<dyn TemplateSource>,
        compiler: Arc<dyn TemplateCompiler>,
        env: TemplateEnv,
    ) -> Self {
        Self {
            source,
            compiler,
            env,
        }
    }

    /// Returns the environment handed to the compiler.
    pub fn env(&self) -> &TemplateEnv {
        &self.env
    }
}

#[async_trait]
impl TaskDiscover for TemplateTaskLoader {
    async fn get_task_generator(
        &self,
        ctx: &DiscoverContext,
        name: &str,
    ) -> Result<Arc<dyn TaskGenerator>, TaskError> {
        let template = ctx
            .guard(self.source.load_task_template(ctx, name))
            .await?;
        if self.env.log_level > 0 {
            debug!(
                "Loaded template for step type '{}' from {} ({} bytes)",
                name,
                self.source.scope(),
                template.len()
            );
        }
        self.compiler.compile(name, &template, &self.env)
    }
}
