//! Ambient execution metadata of the current invocation.
//!
//! [`ExecutionContext`] is captured once, by the runtime adapter, and passed
//! explicitly to every component that needs it. Nothing in this crate reads
//! process-wide state.

use serde_json::Value;

use crate::{GroupKey, JobName, PropertyBag, RepositoryName, RepositoryOwner, RunAttempt, RunId, RunNumber};

/// Immutable snapshot of the identifiers describing where the action runs.
///
/// Every field is optional: a missing ambient value is represented as `None`,
/// never as an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    /// Commit SHA that triggered the workflow.
    pub sha: Option<String>,
    /// Git ref that triggered the workflow (e.g. `refs/heads/main`).
    pub git_ref: Option<String>,
    /// Workflow name.
    pub workflow: Option<String>,
    /// Identifier of the job running the action.
    pub job: Option<JobName>,
    /// Run number within the workflow.
    pub run_number: Option<RunNumber>,
    /// Run identifier.
    pub run_id: Option<RunId>,
    /// Attempt number of the run.
    pub run_attempt: Option<RunAttempt>,
    /// Repository owner.
    pub repository_owner: Option<RepositoryOwner>,
    /// Repository name (without owner).
    pub repository: Option<RepositoryName>,
    /// Login of the user that triggered the run.
    pub actor: Option<String>,
    /// Name of the triggering event (e.g. `push`).
    pub event_name: Option<String>,
}

/// The coordinates needed to address a workflow run on the platform API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRef {
    /// Repository owner.
    pub owner: RepositoryOwner,
    /// Repository name.
    pub repo: RepositoryName,
    /// Run identifier.
    pub run_id: RunId,
}

impl ExecutionContext {
    /// Renders the context as event properties.
    ///
    /// Every key is always present; absent values are written as `null` so
    /// that a context key always overrides a same-named user property.
    pub fn to_properties(&self) -> PropertyBag {
        fn opt<T: Into<Value>>(value: Option<T>) -> Value {
            value.map(Into::into).unwrap_or(Value::Null)
        }

        PropertyBag::new()
            .with("sha", opt(self.sha.clone()))
            .with("ref", opt(self.git_ref.clone()))
            .with("workflow", opt(self.workflow.clone()))
            .with("job", opt(self.job.as_ref().map(|j| j.to_string())))
            .with("runNumber", opt(self.run_number.map(RunNumber::as_u64)))
            .with("runId", opt(self.run_id.map(RunId::as_u64)))
            .with("repository", opt(self.repository.as_ref().map(|r| r.to_string())))
            .with(
                "repositoryOwner",
                opt(self.repository_owner.as_ref().map(|o| o.to_string())),
            )
            .with("actor", opt(self.actor.clone()))
            .with("eventName", opt(self.event_name.clone()))
    }

    /// Key grouping all events of this run: `owner/repo/run_id`.
    ///
    /// Absent parts render as empty strings, so the key is always derivable.
    pub fn group_key(&self) -> GroupKey {
        let owner = self.repository_owner.as_ref().map(|o| o.as_str()).unwrap_or("");
        let repo = self.repository.as_ref().map(|r| r.as_str()).unwrap_or("");
        let run = self.run_id.map(|r| r.to_string()).unwrap_or_default();
        GroupKey::for_run(owner, repo, &run)
    }

    /// Returns the API coordinates of the current run, if all parts are known.
    pub fn run_ref(&self) -> Option<RunRef> {
        Some(RunRef {
            owner: self.repository_owner.clone()?,
            repo: self.repository.clone()?,
            run_id: self.run_id?,
        })
    }
}
