//! Workflow commands written to stdout for the runner to interpret.

use std::io::Write;
use std::sync::Mutex;

use pipeline::Reporter;
use tracing::{error, warn};

use crate::RuntimeError;

/// Writer of `::command key=value::message` workflow commands.
pub struct WorkflowCommands {
    out: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for WorkflowCommands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowCommands").finish_non_exhaustive()
    }
}

impl WorkflowCommands {
    /// Commands written to standard output, where the runner picks them up.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Commands written to `out`.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    /// Issues `command` with optional `key=value` properties.
    pub fn issue(
        &self,
        command: &str,
        properties: &[(&str, &str)],
        message: &str,
    ) -> Result<(), RuntimeError> {
        let mut line = format!("::{command}");
        if !properties.is_empty() {
            let rendered: Vec<String> = properties
                .iter()
                .map(|(k, v)| format!("{k}={}", escape_property(v)))
                .collect();
            line.push(' ');
            line.push_str(&rendered.join(","));
        }
        line.push_str("::");
        line.push_str(&escape_data(message));

        // A poisoned lock only means another writer panicked mid-line.
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out, "{line}")
            .and_then(|()| out.flush())
            .map_err(|source| RuntimeError::Io {
                target: "stdout".to_string(),
                source,
            })
    }
}

impl Reporter for WorkflowCommands {
    fn warning(&self, message: &str) {
        warn!(%message, "reporting warning");
        if let Err(e) = self.issue("warning", &[], message) {
            error!(error = %e, "failed to issue warning command");
        }
    }

    fn error(&self, message: &str) {
        error!(%message, "reporting failure");
        if let Err(e) = self.issue("error", &[], message) {
            error!(error = %e, "failed to issue error command");
        }
    }
}

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    /// Cloneable in-memory writer for asserting on issued commands.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(pub(crate) Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn warning_and_error_commands_escape_data() {
        let buffer = SharedBuffer::default();
        let commands = WorkflowCommands::new(buffer.clone());

        commands.warning("Job \"lint\" not found\n100% sure");
        commands.error("boom");

        assert_eq!(
            buffer.contents(),
            "::warning::Job \"lint\" not found%0A100%25 sure\n::error::boom\n"
        );
    }

    #[test]
    fn properties_are_escaped() {
        let buffer = SharedBuffer::default();
        let commands = WorkflowCommands::new(buffer.clone());

        commands
            .issue("save-state", &[("name", "a:b,c")], "value")
            .unwrap();

        assert_eq!(buffer.contents(), "::save-state name=a%3Ab%2Cc::value\n");
    }
}
