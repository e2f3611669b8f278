//! Core traits and types for shiori task generators and runners.
//!
//! This crate provides the contract between a pipeline engine and the step
//! types it can execute, without runtime dependencies. Authors of custom
//! step types depend on this crate to implement generators and runners.
//!
//! # Core Types
//!
//! - [`WorkflowStep`] - A step definition: name, type and opaque properties
//! - [`TaskGenerator`] - Turns a step definition into a runner
//! - [`TaskRunner`] - The unit the engine evaluates on every reconciliation pass
//! - [`StepStatus`] / [`Operation`] - The informational status and the control
//!   instruction a runner reports, kept as separate values
//! - [`WorkflowContext`] - Variables shared by the steps of a pipeline
//! - [`TaskError`] - Error types for resolution and generation
//! - [`parse_duration`] - Duration strings such as `"1h30m"`

mod context;
mod duration;
mod error;
mod step;
mod traits;

pub use context::{VarPath, WorkflowContext};
pub use duration::parse_duration;
pub use error::{DurationParseError, TaskError};
pub use step::{
    GeneratorOptions, Operation, StepName, StepPhase, StepStatus, TaskOutput, TaskRunOptions,
    WorkflowStep, STEP_TYPE_SUSPEND,
};
pub use traits::{TaskGenerator, TaskRunner};
