//! Newtype domain identifiers.
//!
//! Every ambient or configured name that flows into an analytics event is a
//! distinct newtype wrapping a primitive. This keeps a [`RunId`] from being
//! passed where a [`RunNumber`] is expected even though both are `u64` under
//! the hood, and keeps an [`EventName`] from silently being empty.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Macro for u64-wrapped newtypes (GitHub-assigned integers).
// Generates: struct (Copy), new(), as_u64(), Display.
// ---------------------------------------------------------------------------
macro_rules! u64_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates a new identifier from a raw integer.
            pub fn new(value: u64) -> Self {
                Self(value)
            }

            /// Returns the underlying integer value.
            pub fn as_u64(self) -> u64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: GitHub-integer-backed
// ---------------------------------------------------------------------------

u64_id! {
    /// Identifies a workflow run. Unique across the repository and stable
    /// across re-runs of the same run.
    RunId
}

u64_id! {
    /// Sequential number of a workflow run within its workflow.
    RunNumber
}

u64_id! {
    /// Attempt number of a workflow run; starts at 1 and increments on re-run.
    RunAttempt
}

// ---------------------------------------------------------------------------
// Identifiers: String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// Name of an analytics event (e.g. `"ci-run"`). Never empty: an event
    /// without a name is never emitted.
    EventName
}

string_id! {
    /// Name of a job inside a workflow run, as shown by the platform.
    JobName
}

string_id! {
    /// Account or organisation that owns the repository.
    RepositoryOwner
}

string_id! {
    /// Repository name without its owner prefix.
    RepositoryName
}

string_id! {
    /// Key that groups every event of one workflow run, in
    /// `"owner/repo/run_id"` format.
    GroupKey
}

impl EventName {
    /// Returns the event name used for per-job duration events
    /// (`"<name>-job"`).
    pub fn job_variant(&self) -> EventName {
        Self(format!("{}-job", self.0))
    }
}

impl GroupKey {
    /// Builds the `owner/repo/run_id` key of a workflow run. Never empty.
    pub fn for_run(owner: &str, repo: &str, run_id: &str) -> Self {
        Self(format!("{owner}/{repo}/{run_id}"))
    }
}
