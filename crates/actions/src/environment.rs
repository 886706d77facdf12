//! Snapshot of the process environment the runtime adapters read from.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{EnvInputs, RuntimeState, WorkflowCommands};

/// Snapshot of the process environment.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Captures the current process environment.
    pub fn from_process() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    /// Builds an environment from raw OS pairs.
    ///
    /// Variables whose name is not valid UTF-8 are skipped; invalid bytes in
    /// values are replaced with U+FFFD.
    pub fn from_os_pairs(pairs: impl IntoIterator<Item = (OsString, OsString)>) -> Self {
        Self::from_pairs(pairs.into_iter().filter_map(|(name, value)| {
            let name = name.into_string().ok()?;
            let value = value
                .into_string()
                .unwrap_or_else(|raw| raw.to_string_lossy().into_owned());
            Some((name, value))
        }))
    }

    /// Builds an environment from explicit pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Returns the value of variable `name`, if set and non-empty.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Action inputs backed by this environment.
    pub fn inputs(&self) -> EnvInputs<'_> {
        EnvInputs::new(self)
    }

    /// Inter-step state backed by this environment.
    pub fn state(&self, commands: Arc<WorkflowCommands>) -> RuntimeState {
        let values = self
            .vars
            .iter()
            .filter_map(|(k, v)| Some((k.strip_prefix("STATE_")?.to_string(), v.clone())))
            .collect();
        RuntimeState::new(self.get("GITHUB_STATE").map(PathBuf::from), values, commands)
    }

    /// Base URL of the platform REST API.
    pub fn api_url(&self) -> Option<&str> {
        self.get("GITHUB_API_URL")
    }
}
