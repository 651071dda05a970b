//! Saga error types.

use thiserror::Error;
use wire::ChannelError;

/// Errors that can occur during an exchange saga.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A participant answered and refused the step.
    #[error("{reason}")]
    StepFailed {
        step: &'static str,
        code: Option<String>,
        reason: String,
    },

    /// The participant could not be reached or did not answer in time.
    #[error("Exchange step '{step}' failed: {source}")]
    Transport {
        step: &'static str,
        #[source]
        source: ChannelError,
    },

    /// A compensating call failed.
    #[error("Compensation step '{step}' failed: {reason}")]
    CompensationFailed { step: &'static str, reason: String },
}

impl SagaError {
    /// Refusal of `step` with a stable error code.
    pub fn rejected(step: &'static str, code: impl Into<String>, reason: impl Into<String>) -> Self {
        SagaError::StepFailed {
            step,
            code: Some(code.into()),
            reason: reason.into(),
        }
    }

    /// The step the error was raised by.
    pub fn step(&self) -> &'static str {
        match self {
            SagaError::StepFailed { step, .. }
            | SagaError::Transport { step, .. }
            | SagaError::CompensationFailed { step, .. } => step,
        }
    }

    /// Error code from the participant or the transport.
    pub fn code(&self) -> Option<&str> {
        match self {
            SagaError::StepFailed { code, .. } => code.as_deref(),
            SagaError::Transport { source, .. } => Some(source.code()),
            SagaError::CompensationFailed { .. } => None,
        }
    }

    /// True if the participant may have applied the step anyway.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, SagaError::Transport { source, .. } if source.outcome_unknown())
    }

    /// True for transport failures as opposed to business refusals.
    pub fn is_transport(&self) -> bool {
        matches!(self, SagaError::Transport { .. })
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
