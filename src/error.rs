use crate::step::StepName;
use std::time::Duration;
use thiserror::Error;

/// The category a [`PipelineError`] belongs to.
///
/// Retry decisions and failure reports are made on the kind rather than on
/// the concrete variant payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The payload failed a structural precondition.
    Validation,
    /// A delegated operation (usually a collaborator call) failed.
    Operation,
    /// Any other failure raised by a step body.
    Unexpected,
    /// A deadline expired before the pipeline finished.
    Timeout,
    /// The pipeline or a policy was configured incorrectly.
    Configuration,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Operation => write!(f, "operation"),
            ErrorKind::Unexpected => write!(f, "unexpected"),
            ErrorKind::Timeout => write!(f, "timeout"),
            ErrorKind::Configuration => write!(f, "configuration"),
        }
    }
}

/// Errors that can occur during pipeline execution.
///
/// Step bodies return these directly; the pipeline never translates them, so
/// the error a caller receives is the one the failing step produced.
///
/// # Non-Exhaustive
///
/// This enum is marked `#[non_exhaustive]`. When matching on it, always
/// include a wildcard pattern:
///
/// ```
/// use nagare::{PipelineError, StepName};
///
/// fn describe(error: &PipelineError) -> String {
///     match error {
///         PipelineError::Validation { step_name, details } => {
///             format!("{} rejected the input: {}", step_name, details)
///         }
///         PipelineError::Operation { step_name, .. } => {
///             format!("{} could not complete its operation", step_name)
///         }
///         _ => error.to_string(),
///     }
/// }
///
/// let error = PipelineError::validation(StepName::new("Validate"), "no items");
/// assert_eq!(describe(&error), "Validate rejected the input: no items");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PipelineError {
    /// The input failed a structural precondition.
    ///
    /// Never retried, regardless of the step's retry policy.
    #[error("Validation failed in step '{step_name}': {details}")]
    Validation {
        /// The name of the step that rejected the input
        step_name: StepName,
        /// Details about the failure
        details: String,
    },

    /// A step's delegated operation failed.
    ///
    /// Retried according to the step's policy and fatal once attempts run out.
    #[error("Operation failed in step '{step_name}': {details}")]
    Operation {
        /// The name of the step whose operation failed
        step_name: StepName,
        /// Details about the failure
        details: String,
    },

    /// Any other failure raised by a step body.
    ///
    /// Treated like [`PipelineError::Operation`] for retry purposes unless the
    /// step's policy excludes it.
    #[error("Unexpected failure in step '{step_name}': {details}")]
    Unexpected {
        /// The name of the step that failed
        step_name: StepName,
        /// Details about the failure
        details: String,
    },

    /// The pipeline did not finish before its deadline.
    #[error("Pipeline exceeded its deadline of {limit:?}")]
    Timeout {
        /// The configured deadline that expired
        limit: Duration,
    },

    /// The pipeline configuration is invalid.
    #[error("Invalid pipeline configuration: {0}")]
    Configuration(String),
}

impl PipelineError {
    /// Creates a [`PipelineError::Validation`].
    pub fn validation(step_name: impl Into<StepName>, details: impl Into<String>) -> Self {
        PipelineError::Validation {
            step_name: step_name.into(),
            details: details.into(),
        }
    }

    /// Creates a [`PipelineError::Operation`].
    pub fn operation(step_name: impl Into<StepName>, details: impl Into<String>) -> Self {
        PipelineError::Operation {
            step_name: step_name.into(),
            details: details.into(),
        }
    }

    /// Creates a [`PipelineError::Unexpected`].
    pub fn unexpected(step_name: impl Into<StepName>, details: impl Into<String>) -> Self {
        PipelineError::Unexpected {
            step_name: step_name.into(),
            details: details.into(),
        }
    }

    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Validation { .. } => ErrorKind::Validation,
            PipelineError::Operation { .. } => ErrorKind::Operation,
            PipelineError::Unexpected { .. } => ErrorKind::Unexpected,
            PipelineError::Timeout { .. } => ErrorKind::Timeout,
            PipelineError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Returns the name of the step that raised this error, if any.
    pub fn step_name(&self) -> Option<&StepName> {
        match self {
            PipelineError::Validation { step_name, .. }
            | PipelineError::Operation { step_name, .. }
            | PipelineError::Unexpected { step_name, .. } => Some(step_name),
            PipelineError::Timeout { .. } | PipelineError::Configuration(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = PipelineError::validation("ValidateOrder", "no items");
        assert_eq!(
            error.to_string(),
            "Validation failed in step 'ValidateOrder': no items"
        );

        let error = PipelineError::operation("ProcessPayment", "declined");
        assert_eq!(
            error.to_string(),
            "Operation failed in step 'ProcessPayment': declined"
        );

        let error = PipelineError::Timeout {
            limit: Duration::from_millis(50),
        };
        assert_eq!(error.to_string(), "Pipeline exceeded its deadline of 50ms");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(
            PipelineError::validation("a", "b").kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            PipelineError::operation("a", "b").kind(),
            ErrorKind::Operation
        );
        assert_eq!(
            PipelineError::unexpected("a", "b").kind(),
            ErrorKind::Unexpected
        );
        assert_eq!(
            PipelineError::Configuration("bad".to_string()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_error_step_name() {
        let error = PipelineError::unexpected("NotifyCustomer", "boom");
        assert_eq!(
            error.step_name().map(|n| n.as_str()),
            Some("NotifyCustomer")
        );
        assert_eq!(PipelineError::Configuration("x".into()).step_name(), None);
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::Validation.to_string(), "validation");
        assert_eq!(ErrorKind::Operation.to_string(), "operation");
        assert_eq!(ErrorKind::Timeout.to_string(), "timeout");
    }
}
