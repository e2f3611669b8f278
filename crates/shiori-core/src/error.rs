//! Task resolution and generation error types.

use crate::step::StepName;
use thiserror::Error;

/// Errors produced while parsing a duration string such as `"1h30m"`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DurationParseError {
    /// The input is not a well-formed duration, or it does not fit in a
    /// signed 64-bit nanosecond count.
    #[error("invalid duration {0:?}")]
    Invalid(String),

    /// A number was not followed by a unit.
    #[error("missing unit in duration {0:?}")]
    MissingUnit(String),

    /// A number was followed by a unit that is not recognized.
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit {
        /// The unrecognized unit.
        unit: String,
        /// The full input being parsed.
        input: String,
    },
}

/// Errors that can occur while resolving a generator or building a runner.
///
/// Every failure path in this crate yields one of these values. None of
/// them are retried internally; retrying is the caller's decision.
///
/// # Non-Exhaustive
///
/// This enum is marked `#[non_exhaustive]`, so always include a wildcard
/// pattern when matching:
///
/// ```
/// use shiori_core::TaskError;
///
/// fn describe(error: &TaskError) -> String {
///     match error {
///         TaskError::GeneratorNotFound(name) => format!("unknown step type {name}"),
///         TaskError::DurationParse(e) => format!("bad duration: {e}"),
///         other => other.to_string(),
///     }
/// }
/// ```
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TaskError {
    /// Neither the builtin registry nor the remote resolver knows the step type.
    #[error("can't find task generator: {0}")]
    GeneratorNotFound(String),

    /// A step's properties do not match the shape its generator expects.
    #[error("invalid properties for step '{step}': {source}")]
    PropertyDecode {
        /// The step whose properties failed to decode.
        step: StepName,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// A duration property could not be parsed.
    #[error(transparent)]
    DurationParse(#[from] DurationParseError),

    /// A template source has no template for the requested step type.
    #[error("task template '{name}' not found in {scope}")]
    TemplateNotFound {
        /// The requested step type.
        name: String,
        /// Where the lookup happened, e.g. a revision or namespace.
        scope: String,
    },

    /// The caller cancelled resolution or its deadline passed.
    #[error("task resolution cancelled: {0}")]
    Cancelled(String),

    /// An opaque failure from an external collaborator, passed through as is.
    #[error(transparent)]
    Delegate(Box<dyn std::error::Error + Send + Sync>),
}

impl TaskError {
    /// Wraps a collaborator error without altering its message.
    pub fn delegate(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Delegate(error.into())
    }

    /// Returns `true` if the step type could not be resolved.
    ///
    /// Both [`TaskError::GeneratorNotFound`] and [`TaskError::TemplateNotFound`]
    /// are in this class. A resolver with a template source reports the
    /// latter for unknown step types.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::GeneratorNotFound(_) | Self::TemplateNotFound { .. }
        )
    }
}
