//! Event payloads and the platform records they are derived from.

use serde::Serialize;

use crate::{EventName, GroupKey, JobName, PropertyBag, RunAttempt, RunId, Timestamp};

/// Distinct id attached to every emitted event.
pub const ACTOR_ID: &str = "posthog-github-action";

/// Group type under which all events of one workflow run are grouped.
pub const WORKFLOW_RUN_GROUP: &str = "workflow_run";

// ---------------------------------------------------------------------------
// Outgoing payloads
// ---------------------------------------------------------------------------

/// One analytics event, ready to send.
///
/// Created immediately before emission and never mutated afterwards.
/// Serialises to the wire contract
/// `{distinctId, event, properties, groups?}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    /// Always [`ACTOR_ID`].
    pub distinct_id: String,
    /// Event name.
    pub event: EventName,
    /// Merged properties (user input, enrichment, context).
    pub properties: PropertyBag,
    /// Group memberships, keyed by group type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Groups>,
}

/// Group memberships of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Groups {
    /// Key of the workflow run group.
    pub workflow_run: GroupKey,
}

/// Properties set on a group (a group-identify call, not an event).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupUpdate {
    /// Group type (e.g. [`WORKFLOW_RUN_GROUP`]).
    pub group_type: String,
    /// Group key.
    pub group_key: GroupKey,
    /// Properties to set on the group.
    pub properties: PropertyBag,
}

/// Everything emitted by one invocation of the main phase, in send order.
#[derive(Debug, Clone, PartialEq)]
pub struct EventBatch {
    /// Group-identify calls, sent first.
    pub group_updates: Vec<GroupUpdate>,
    /// The primary event.
    pub primary: EventPayload,
    /// Per-job duration events, in listing order.
    pub job_events: Vec<EventPayload>,
}

impl EventBatch {
    /// Number of capture calls (primary plus job events).
    pub fn event_count(&self) -> usize {
        1 + self.job_events.len()
    }
}

// ---------------------------------------------------------------------------
// Platform records
// ---------------------------------------------------------------------------

/// Timing and status of a workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    /// Run identifier.
    pub id: RunId,
    /// Browser URL of the run.
    pub html_url: String,
    /// Attempt number.
    pub run_attempt: Option<RunAttempt>,
    /// When the current attempt started.
    pub run_started_at: Option<Timestamp>,
    /// When the run was created.
    pub created_at: Option<Timestamp>,
}

impl WorkflowRun {
    /// Start of the current attempt, falling back to the creation time.
    pub fn start_time(&self) -> Option<Timestamp> {
        self.run_started_at.or(self.created_at)
    }
}

/// Timing and status of one job in a workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    /// Job display name.
    pub name: JobName,
    /// When the job started.
    pub started_at: Option<Timestamp>,
    /// When the job completed; `None` while it is still running.
    pub completed_at: Option<Timestamp>,
    /// Final conclusion (`success`, `failure`, ...), once completed.
    pub conclusion: Option<String>,
    /// Name of the runner that executed the job.
    pub runner_name: Option<String>,
}

/// One page of a job listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobsPage {
    /// Jobs on this page, in platform order.
    pub jobs: Vec<JobRecord>,
    /// Total number of jobs across all pages.
    pub total_count: usize,
}

// ---------------------------------------------------------------------------
// Enrichment accumulator
// ---------------------------------------------------------------------------

/// State accumulated by the enrichment steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    /// The property bag, starting from the user-supplied properties.
    pub properties: PropertyBag,
    /// Workflow-level conclusion, if a status job was found.
    pub workflow_conclusion: Option<String>,
    /// Jobs for which per-job duration events are derived.
    pub jobs: Vec<JobRecord>,
}

impl Enrichment {
    /// Starts an accumulator from the user-supplied properties.
    pub fn new(properties: PropertyBag) -> Self {
        Self {
            properties,
            ..Self::default()
        }
    }
}
