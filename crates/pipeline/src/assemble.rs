//! The Event Assembler.
//!
//! Pure functions turning an [`Enrichment`] and an [`ExecutionContext`] into
//! the payloads of an [`EventBatch`]. Merge order is fixed: start from the
//! accumulated bag and spread the context over it, so ambient identity can
//! never be overridden by user input.

use serde_json::Value;

use crate::{
    EventBatch, EventName, EventPayload, ExecutionContext, GroupKey, GroupUpdate, Groups,
    JobRecord, PropertyBag, ACTOR_ID, WORKFLOW_RUN_GROUP,
};

/// Builds one event payload from `bag` and `context`.
pub fn assemble(
    bag: PropertyBag,
    context: &ExecutionContext,
    event: EventName,
    group_key: Option<GroupKey>,
) -> EventPayload {
    let mut properties = bag;
    properties.merge(context.to_properties());
    EventPayload {
        distinct_id: ACTOR_ID.to_string(),
        event,
        properties,
        groups: group_key.map(|workflow_run| Groups { workflow_run }),
    }
}

/// Derives one duration event per completed job, in listing order.
///
/// Jobs that have not completed, have no start time, or carry the invoking
/// job's own name are skipped.
pub fn job_events(
    jobs: &[JobRecord],
    context: &ExecutionContext,
    base_event: &EventName,
    group_key: &GroupKey,
) -> Vec<EventPayload> {
    let event = base_event.job_variant();
    jobs.iter()
        .filter(|job| context.job.as_ref() != Some(&job.name))
        .filter_map(|job| {
            let completed_at = job.completed_at?;
            let started_at = job.started_at?;
            let bag = PropertyBag::new()
                .with("name", job.name.as_str())
                .with(
                    "duration_seconds",
                    completed_at.seconds_since(started_at).as_i64(),
                )
                .with("conclusion", optional(job.conclusion.clone()))
                .with("started_at", started_at.to_iso8601())
                .with("completed_at", completed_at.to_iso8601())
                .with("runner", optional(job.runner_name.clone()));
            Some(assemble(bag, context, event.clone(), Some(group_key.clone())))
        })
        .collect()
}

/// Group-identify update attaching the workflow conclusion to the run group.
pub fn workflow_group_update(conclusion: &str, group_key: &GroupKey) -> GroupUpdate {
    GroupUpdate {
        group_type: WORKFLOW_RUN_GROUP.to_string(),
        group_key: group_key.clone(),
        properties: PropertyBag::new().with("conclusion", conclusion),
    }
}

/// Assembles everything the main phase emits.
pub fn assemble_batch(
    enrichment: crate::Enrichment,
    context: &ExecutionContext,
    event: &EventName,
) -> EventBatch {
    let group_key = context.group_key();

    let group_updates = enrichment
        .workflow_conclusion
        .as_deref()
        .map(|conclusion| workflow_group_update(conclusion, &group_key))
        .into_iter()
        .collect();
    let job_events = job_events(&enrichment.jobs, context, event, &group_key);
    let primary = assemble(
        enrichment.properties,
        context,
        event.clone(),
        Some(group_key),
    );

    EventBatch {
        group_updates,
        primary,
        job_events,
    }
}

fn optional(value: Option<String>) -> Value {
    value.map(Value::String).unwrap_or(Value::Null)
}
