//! Top-level error type for the action pipeline.
//!
//! [`ActionError`] covers every condition that fails an invocation. Adapter
//! crates define their own transport-level errors and convert them into
//! [`ActionError::Transport`] at the port boundary.
//!
//! The `Display` output of every variant is the failure reason reported to
//! the workflow, so messages are written for the person reading the job log.
//!
//! A status job that cannot be found is *not* an error: it is
//! reported as a warning and the pipeline continues.

use thiserror::Error;

/// Errors that abort an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// A required input or credential is missing for an enabled feature.
    ///
    /// Produced while reading configuration, before any network call.
    #[error("{message}")]
    Config {
        /// Description of the configuration problem.
        message: String,
    },

    /// An input that must hold a JSON object could not be parsed as one.
    #[error("Input '{input}' is not a valid JSON object: {message}")]
    Parse {
        /// Name of the offending input.
        input: String,
        /// Parser diagnostic.
        message: String,
    },

    /// The platform API or the analytics service could not be reached, or
    /// answered with an error.
    #[error("{message}")]
    Transport {
        /// Description of the failed call.
        message: String,
    },

    /// Inter-step state could not be persisted.
    #[error("Failed to save state '{name}': {message}")]
    State {
        /// State key.
        name: String,
        /// Underlying I/O failure.
        message: String,
    },
}

impl ActionError {
    /// Shorthand for [`ActionError::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Shorthand for [`ActionError::Transport`].
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}
