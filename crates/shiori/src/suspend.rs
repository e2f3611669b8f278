//! The builtin `suspend` step.
//!
//! A suspend step holds the pipeline where it stands. Its only property is
//! an optional `duration`:
//!
//! ```yaml
//! - name: wait-for-approval
//!   type: suspend
//! - name: soak
//!   type: suspend
//!   properties:
//!     duration: 10m
//! ```
//!
//! Without a duration the step reports `succeeded` and waits for an external
//! resume. With one it reports `running` until the engine sees the duration
//! elapse. Either way every run returns [`Operation::suspend`], which is the
//! signal the engine acts on.

use async_trait::async_trait;
use chrono::TimeDelta;
use serde::Deserialize;
use serde_json::Value;
use shiori_core::{
    parse_duration, GeneratorOptions, Operation, StepName, StepPhase, StepStatus, TaskError,
    TaskOutput, TaskRunOptions, TaskRunner, WorkflowContext, WorkflowStep, STEP_TYPE_SUSPEND,
};
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
struct SuspendProperties {
    #[serde(default, alias = "Duration")]
    duration: Option<String>,
}

/// Reads the wait duration requested by a suspend step.
///
/// Returns `Ok(None)` when the step has no properties or no `duration`, and
/// `Ok(Some(d))` for a well-formed duration. Unknown properties are ignored.
///
/// # Errors
///
/// - [`TaskError::PropertyDecode`] if the properties are not an object or
///   `duration` is not a string
/// - [`TaskError::DurationParse`] if `duration` is malformed
///
/// # Examples
///
/// ```
/// use shiori::{suspend_step_wait, WorkflowStep};
/// use chrono::TimeDelta;
/// use serde_json::json;
///
/// let step = WorkflowStep::new("soak", "suspend").with_properties(json!({"duration": "2m"}));
/// assert_eq!(suspend_step_wait(&step).unwrap(), Some(TimeDelta::minutes(2)));
///
/// let step = WorkflowStep::new("approve", "suspend");
/// assert_eq!(suspend_step_wait(&step).unwrap(), None);
/// ```
pub fn suspend_step_wait(step: &WorkflowStep) -> Result<Option<TimeDelta>, TaskError> {
    let properties = match &step.properties {
        None | Some(Value::Null) => return Ok(None),
        Some(properties) => properties,
    };

    let properties =
        SuspendProperties::deserialize(properties).map_err(|source| TaskError::PropertyDecode {
            step: step.name.clone(),
            source,
        })?;

    match properties.duration.as_deref() {
        None | Some("") => Ok(None),
        Some(duration) => Ok(Some(parse_duration(duration)?)),
    }
}

/// Generator for the `suspend` step type.
///
/// Fails when the step's duration policy is invalid; no runner is built in
/// that case.
pub fn suspend(
    step: &WorkflowStep,
    options: &GeneratorOptions,
) -> Result<Box<dyn TaskRunner>, TaskError> {
    let wait = suspend_step_wait(step)?;
    Ok(Box::new(SuspendTaskRunner::new(
        options.id.clone(),
        step.name.clone(),
        wait.is_some(),
    )))
}

/// Runner for a suspend step. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspendTaskRunner {
    id: String,
    name: StepName,
    wait: bool,
}

impl SuspendTaskRunner {
    /// Creates a runner. `wait` records whether a duration was requested.
    pub fn new(id: impl Into<String>, name: impl Into<StepName>, wait: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            wait,
        }
    }

    /// Returns the instance id the runner reports.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns `true` if the step asked for a timed wait.
    pub fn is_waiting(&self) -> bool {
        self.wait
    }

    fn phase(&self) -> StepPhase {
        if self.wait {
            StepPhase::Running
        } else {
            StepPhase::Succeeded
        }
    }
}

#[async_trait]
impl TaskRunner for SuspendTaskRunner {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    async fn run(
        &self,
        _ctx: &mut WorkflowContext,
        _options: &TaskRunOptions,
    ) -> Result<TaskOutput, TaskError> {
        let phase = self.phase();
        debug!("Suspending at step '{}' (phase: {})", self.name, phase);

        Ok(TaskOutput {
            status: StepStatus {
                id: self.id.clone(),
                name: self.name.clone(),
                step_type: STEP_TYPE_SUSPEND.to_string(),
                phase,
                ..StepStatus::default()
            },
            operation: Operation::suspend(),
        })
    }

    fn pending(&self, _ctx: &WorkflowContext) -> bool {
        false
    }
}
