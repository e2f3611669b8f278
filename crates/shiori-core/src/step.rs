//! Step definitions and the values a runner reports back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Step type of the builtin suspend primitive.
pub const STEP_TYPE_SUSPEND: &str = "suspend";

/// Type-safe step name wrapper.
///
/// Step names are unique within a pipeline instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepName(String);

impl StepName {
    /// Creates a new StepName.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the step name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StepName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for StepName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for StepName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for StepName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One declarative step of a pipeline.
///
/// `step_type` selects the generator; `properties` is an opaque payload
/// only the generator interprets.
///
/// # Examples
///
/// ```
/// use shiori_core::WorkflowStep;
///
/// let step: WorkflowStep = serde_json::from_str(
///     r#"{"name": "pause", "type": "suspend", "properties": {"duration": "10s"}}"#,
/// ).unwrap();
/// assert_eq!(step.name.as_str(), "pause");
/// assert_eq!(step.step_type, "suspend");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Step name, unique within the pipeline.
    pub name: StepName,
    /// Step type used to look up a generator.
    #[serde(rename = "type")]
    pub step_type: String,
    /// Generator-specific configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
}

impl WorkflowStep {
    /// Creates a step without properties.
    pub fn new(name: impl Into<StepName>, step_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            step_type: step_type.into(),
            properties: None,
        }
    }

    /// Sets the step properties.
    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = Some(properties);
        self
    }
}

/// Per-invocation context handed to a generator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Distinguishes repeated instantiations of a step across revisions.
    pub id: String,
    /// Engine-owned metadata. Generators in this crate do not read it.
    pub metadata: HashMap<String, String>,
}

impl GeneratorOptions {
    /// Creates options with the given instance id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            metadata: HashMap::new(),
        }
    }
}

/// Per-run options handed to [`TaskRunner::run`](crate::TaskRunner::run).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskRunOptions {
    /// Input data supplied by the engine for this run.
    pub data: Option<Value>,
    /// Whether the engine is collecting debug output.
    pub debug: bool,
}

/// Phase a step reports for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepPhase {
    /// The step finished successfully.
    Succeeded,
    /// The step failed.
    Failed,
    /// The step was skipped.
    Skipped,
    /// The step was stopped before finishing.
    Stopped,
    /// The step is in progress.
    Running,
    /// The step has not started.
    #[default]
    Pending,
}

impl StepPhase {
    /// Returns the wire name of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepPhase::Succeeded => "succeeded",
            StepPhase::Failed => "failed",
            StepPhase::Skipped => "skipped",
            StepPhase::Stopped => "stopped",
            StepPhase::Running => "running",
            StepPhase::Pending => "pending",
        }
    }
}

impl fmt::Display for StepPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one step evaluation, produced fresh on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStatus {
    /// Instance id from [`GeneratorOptions::id`].
    pub id: String,
    /// Declared step name.
    pub name: StepName,
    /// Step type.
    #[serde(rename = "type")]
    pub step_type: String,
    /// Display phase. Not a control signal; see [`Operation::suspend`].
    pub phase: StepPhase,
    /// Human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Short machine-readable cause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Out-of-band instruction to the engine, returned next to a [`StepStatus`].
///
/// `suspend` is authoritative: the engine holds the pipeline at this step
/// whenever it is set, whatever the reported phase says.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operation {
    /// Hold the pipeline at this step.
    pub suspend: bool,
    /// Stop the pipeline.
    pub terminated: bool,
    /// The step is waiting on an external condition.
    pub waiting: bool,
    /// The step exhausted the engine's retries.
    pub failed_after_retries: bool,
}

impl Operation {
    /// An operation that only asks the engine to suspend.
    pub fn suspend() -> Self {
        Self {
            suspend: true,
            ..Self::default()
        }
    }
}

/// What a runner hands back from one evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOutput {
    /// Informational status.
    pub status: StepStatus,
    /// Control instruction for the engine.
    pub operation: Operation,
}
