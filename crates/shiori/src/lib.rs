//! # Shiori (栞)
//!
//! Task generator resolution and the `suspend` primitive for declarative
//! delivery pipelines.
//!
//! The name "Shiori" (栞) means "bookmark" in Japanese: the place a pipeline
//! is held until someone picks it up again.
//!
//! An outer engine asks a [`TaskDiscoverer`] for the generator of a step
//! type, builds a [`TaskRunner`] from the step definition, and evaluates it
//! on every reconciliation pass. Builtin step types always win over
//! template-backed ones.
//!
//! ## Quick Start
//!
//! ```rust
//! use shiori::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), TaskError> {
//! let discover = TaskDiscoverer::new(BuiltinRegistry::with_builtins(Builtin::ALL), None);
//!
//! let step = WorkflowStep::new("soak", "suspend").with_properties(json!({"duration": "10m"}));
//! let generator = discover
//!     .get_task_generator(&DiscoverContext::new(), &step.step_type)
//!     .await?;
//! let runner = generator.generate(&step, &GeneratorOptions::new("soak-1"))?;
//!
//! let output = runner
//!     .run(&mut WorkflowContext::new(), &TaskRunOptions::default())
//!     .await?;
//! assert_eq!(output.status.phase, StepPhase::Running);
//! assert!(output.operation.suspend);
//! # Ok(())
//! # }
//! ```
//!
//! ## Profiles
//!
//! [`new_task_discover_from_revision`] and [`new_view_task_discover`] build
//! resolvers from the two [`DiscoverProfile`]s. The view profile has no
//! builtins, so `suspend` is not available when rendering views.

mod builtin;
mod discover;
mod profile;
mod providers;
mod suspend;
mod template;

// Re-export core types
pub use shiori_core::*;

pub use builtin::{Builtin, BuiltinRegistry};
pub use discover::{DiscoverContext, GeneratorSource, RemoteSource, TaskDiscover, TaskDiscoverer};
pub use profile::{
    new_task_discover_from_revision, new_view_task_discover, DiscoverDeps, DiscoverProfile,
    TemplateScope,
};
pub use providers::{ProviderGroup, ProviderHandler, ProviderSet, Providers};
pub use suspend::{suspend, suspend_step_wait, SuspendTaskRunner};
pub use template::{
    PackageDiscover, PipelineRevision, ProcessContext, RevisionTemplateSource, TemplateCompiler,
    TemplateEnv, TemplateSource, TemplateStore, TemplateTaskLoader, ViewTemplateSource,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Builtin, BuiltinRegistry, DiscoverContext, DiscoverProfile, GeneratorOptions, Operation,
        StepName, StepPhase, StepStatus, TaskDiscover, TaskDiscoverer, TaskError, TaskGenerator,
        TaskOutput, TaskRunOptions, TaskRunner, WorkflowContext, WorkflowStep,
    };
}
