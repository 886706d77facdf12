//! Port traits implemented by the infrastructure crates.
//!
//! The pipeline sees the outside world only through these traits: action
//! inputs, inter-step state, the platform API, the analytics client, the
//! user-facing reporter, and the clock.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    ActionError, Credential, EventPayload, ExecutionContext, GroupUpdate, JobsPage,
    PostHogSettings, RunRef, Timestamp, WorkflowRun,
};

/// Raw, untyped access to action inputs.
pub trait InputSource {
    /// Returns the raw value of input `name`, if set.
    fn raw(&self, name: &str) -> Option<String>;
}

/// Durable key/value state shared between the phases of one job.
pub trait StateStore {
    /// Persists `value` under `name` for later phases.
    fn save_state(&self, name: &str, value: &str) -> Result<(), ActionError>;

    /// Returns the value saved under `name` by an earlier phase.
    fn get_state(&self, name: &str) -> Option<String>;
}

/// User-facing diagnostics (annotations in the job log).
pub trait Reporter: Send + Sync {
    /// Reports a non-fatal warning.
    fn warning(&self, message: &str);

    /// Reports the failure reason of the invocation.
    fn error(&self, message: &str);
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// [`Clock`] backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Read access to workflow run metadata on the CI platform.
#[async_trait]
pub trait WorkflowApi: Send + Sync {
    /// Fetches the workflow run record.
    async fn get_run(&self, run: &RunRef) -> Result<WorkflowRun, ActionError>;

    /// Fetches one page (1-based) of the run's jobs.
    async fn list_jobs_page(
        &self,
        run: &RunRef,
        page: u32,
        per_page: u32,
    ) -> Result<JobsPage, ActionError>;
}

/// Buffered analytics client.
///
/// `capture` and `group_identify` only enqueue; `flush_and_close` delivers
/// everything buffered and releases the transport. It must be called on
/// every exit path once a client exists.
#[async_trait]
pub trait AnalyticsClient: Send {
    /// Enqueues an event.
    fn capture(&mut self, event: &EventPayload) -> Result<(), ActionError>;

    /// Enqueues a group-identify update.
    fn group_identify(&mut self, update: &GroupUpdate) -> Result<(), ActionError>;

    /// Delivers buffered messages and closes the client.
    async fn flush_and_close(&mut self) -> Result<(), ActionError>;
}

/// Constructs the infrastructure adapters used by a phase.
pub trait AdapterFactory: Send + Sync {
    /// Creates the analytics client.
    fn analytics(
        &self,
        settings: &PostHogSettings,
    ) -> Result<Box<dyn AnalyticsClient>, ActionError>;

    /// Creates the platform API client.
    fn workflow_api(
        &self,
        token: &Credential,
        context: &ExecutionContext,
    ) -> Result<Arc<dyn WorkflowApi>, ActionError>;
}
