//! Task runner and task generator traits.

use crate::context::WorkflowContext;
use crate::error::TaskError;
use crate::step::{GeneratorOptions, TaskOutput, TaskRunOptions, WorkflowStep};
use async_trait::async_trait;
use std::fmt::Debug;

/// An executable unit the engine evaluates once per reconciliation pass.
///
/// Runners are rebuilt for every evaluation and should hold only what they
/// were constructed with, so repeated calls are safe without locking.
///
/// # Examples
///
/// ```
/// use shiori_core::{
///     Operation, StepName, StepPhase, StepStatus, TaskError, TaskOutput, TaskRunOptions,
///     TaskRunner, WorkflowContext,
/// };
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct NoopRunner {
///     name: StepName,
/// }
///
/// #[async_trait]
/// impl TaskRunner for NoopRunner {
///     fn name(&self) -> &str {
///         self.name.as_str()
///     }
///
///     async fn run(
///         &self,
///         _ctx: &mut WorkflowContext,
///         _options: &TaskRunOptions,
///     ) -> Result<TaskOutput, TaskError> {
///         Ok(TaskOutput {
///             status: StepStatus {
///                 name: self.name.clone(),
///                 step_type: "noop".to_string(),
///                 phase: StepPhase::Succeeded,
///                 ..StepStatus::default()
///             },
///             operation: Operation::default(),
///         })
///     }
///
///     fn pending(&self, _ctx: &WorkflowContext) -> bool {
///         false
///     }
/// }
/// ```
#[async_trait]
pub trait TaskRunner: Send + Sync + Debug {
    /// Returns the declared step name. Constant for the runner's lifetime.
    fn name(&self) -> &str;

    /// Evaluates the step once.
    ///
    /// # Returns
    ///
    /// - `Ok(output)` - the status to record and the instruction for the engine
    /// - `Err(error)` - the evaluation failed
    async fn run(
        &self,
        ctx: &mut WorkflowContext,
        options: &TaskRunOptions,
    ) -> Result<TaskOutput, TaskError>;

    /// Returns `true` if the step is not yet eligible to run.
    fn pending(&self, ctx: &WorkflowContext) -> bool;
}

/// Builds a [`TaskRunner`] from a step definition.
///
/// Any `Fn(&WorkflowStep, &GeneratorOptions) -> Result<Box<dyn TaskRunner>, TaskError>`
/// is a generator, so plain functions can be registered directly.
pub trait TaskGenerator: Send + Sync {
    /// Builds a runner for `step`.
    ///
    /// Fails if the step's properties are not valid for this generator; a
    /// runner is never built from invalid configuration.
    fn generate(
        &self,
        step: &WorkflowStep,
        options: &GeneratorOptions,
    ) -> Result<Box<dyn TaskRunner>, TaskError>;
}

impl<F> TaskGenerator for F
where
    F: Fn(&WorkflowStep, &GeneratorOptions) -> Result<Box<dyn TaskRunner>, TaskError>
        + Send
        + Sync,
{
    fn generate(
        &self,
        step: &WorkflowStep,
        options: &GeneratorOptions,
    ) -> Result<Box<dyn TaskRunner>, TaskError> {
        self(step, options)
    }
}
