//! GitHub Actions runtime infrastructure.
//!
//! Implements the runtime-facing ports of the [`pipeline`] crate:
//!
//! - [`EnvInputs`]: [`pipeline::InputSource`] over `INPUT_*` variables.
//! - [`collect_context`]: builds the [`pipeline::ExecutionContext`] from
//!   `GITHUB_*` variables.
//! - [`RuntimeState`]: [`pipeline::StateStore`] over the `GITHUB_STATE` file
//!   (write) and `STATE_*` variables (read).
//! - [`WorkflowCommands`]: [`pipeline::Reporter`] emitting `::warning::` and
//!   `::error::` workflow commands.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Every adapter reads from an explicit [`Environment`]
//! snapshot instead of the live process environment, so the same code runs
//! against a map in tests.

mod commands;
mod context;
mod environment;
mod inputs;
mod state;

use thiserror::Error;

pub use commands::WorkflowCommands;
pub use context::collect_context;
pub use environment::Environment;
pub use inputs::{input_variable, EnvInputs};
pub use state::RuntimeState;

/// Failures interacting with the Actions runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Writing a workflow command or the state file failed.
    #[error("failed to write to {target}: {source}")]
    Io {
        /// What was being written (`stdout`, a file path).
        target: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
