//! Inter-step state for the pre and post phases.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pipeline::{ActionError, StateStore};
use tracing::debug;
use uuid::Uuid;

use crate::{RuntimeError, WorkflowCommands};

/// [`StateStore`] backed by the Actions runtime.
///
/// Writes go to the file named by `GITHUB_STATE` using the heredoc format
/// `name<<delimiter`, or to the legacy `::save-state::` command when the file
/// is not provided. Reads come from the `STATE_*` variables the runner exports
/// to later phases.
#[derive(Debug)]
pub struct RuntimeState {
    state_file: Option<PathBuf>,
    values: HashMap<String, String>,
    commands: Arc<WorkflowCommands>,
}

impl RuntimeState {
    /// Creates a store writing to `state_file` and reading from `values`.
    pub fn new(
        state_file: Option<PathBuf>,
        values: HashMap<String, String>,
        commands: Arc<WorkflowCommands>,
    ) -> Self {
        Self {
            state_file,
            values,
            commands,
        }
    }

    fn append_to_file(&self, path: &Path, name: &str, value: &str) -> Result<(), RuntimeError> {
        let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
        let io_error = |source| RuntimeError::Io {
            target: path.display().to_string(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_error)?;
        write!(file, "{name}<<{delimiter}\n{value}\n{delimiter}\n").map_err(io_error)
    }
}

impl StateStore for RuntimeState {
    fn save_state(&self, name: &str, value: &str) -> Result<(), ActionError> {
        let result = match &self.state_file {
            Some(path) => self.append_to_file(path, name, value),
            None => self.commands.issue("save-state", &[("name", name)], value),
        };
        result.map_err(|e| ActionError::State {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        debug!(name, "saved state");
        Ok(())
    }

    fn get_state(&self, name: &str) -> Option<String> {
        self.values.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::SharedBuffer;
    use crate::Environment;

    #[test]
    fn save_state_appends_heredoc_to_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");
        let env = Environment::from_pairs([("GITHUB_STATE", path.display().to_string())]);
        let state = env.state(Arc::new(WorkflowCommands::new(SharedBuffer::default())));

        state.save_state("jobStartTime", "1714557600000").unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 3);
        let delimiter = lines[0].strip_prefix("jobStartTime<<").unwrap();
        assert!(delimiter.starts_with("ghadelimiter_"));
        assert_eq!(lines[1], "1714557600000");
        assert_eq!(lines[2], delimiter);
    }

    #[test]
    fn save_state_falls_back_to_command() {
        let buffer = SharedBuffer::default();
        let env = Environment::default();
        let state = env.state(Arc::new(WorkflowCommands::new(buffer.clone())));

        state.save_state("jobStartTime", "42").unwrap();

        assert_eq!(buffer.contents(), "::save-state name=jobStartTime::42\n");
    }

    #[test]
    fn get_state_reads_state_variables() {
        let env = Environment::from_pairs([("STATE_jobStartTime", "42"), ("STATE_empty", "")]);
        let state = env.state(Arc::new(WorkflowCommands::new(SharedBuffer::default())));

        assert_eq!(state.get_state("jobStartTime").as_deref(), Some("42"));
        assert_eq!(state.get_state("empty"), None);
        assert_eq!(state.get_state("missing"), None);
    }

    #[test]
    fn unwritable_state_file_is_a_state_error() {
        let dir = tempfile::tempdir().unwrap();
        let env = Environment::from_pairs([(
            "GITHUB_STATE",
            dir.path().join("missing").join("state").display().to_string(),
        )]);
        let state = env.state(Arc::new(WorkflowCommands::new(SharedBuffer::default())));

        let err = state.save_state("jobStartTime", "42").unwrap_err();
        assert!(matches!(err, ActionError::State { ref name, .. } if name == "jobStartTime"));
    }
}
