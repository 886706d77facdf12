//! The two-phase job duration variant.
//!
//! `pre` runs before the job's steps and persists the current time under
//! [`JOB_START_STATE`]. `post` runs after them, reads the value back and
//! emits a single event carrying `job_duration_seconds`. Neither phase calls
//! the platform API, and neither ever fails the job: every error is
//! downgraded to a warning.

use std::sync::Arc;

use pipeline::{
    assemble, ActionError, AdapterFactory, Clock, DurationSeconds, EventBatch, ExecutionContext,
    InputSource, JobDurationConfig, Reporter, StateStore, Timestamp,
};
use tracing::{info, info_span, warn, Instrument};

use crate::emitter;

/// State key holding the job start time in milliseconds since the epoch.
pub const JOB_START_STATE: &str = "jobStartTime";

/// What the `pre` phase did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreOutcome {
    /// `capture-job-duration` is not `true`.
    Disabled,
    /// The start time was persisted.
    Recorded(Timestamp),
    /// Persisting failed; a warning was reported.
    Failed(ActionError),
}

/// What the `post` phase did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// `capture-job-duration` is not `true`.
    Disabled,
    /// No usable start time was found; a warning was reported.
    Skipped,
    /// The duration event was delivered.
    Emitted(DurationSeconds),
    /// Building or delivering the event failed; a warning was reported.
    Failed(ActionError),
}

/// Runs the `pre` and `post` phases against injected adapters.
pub struct JobDurationPhases {
    adapters: Arc<dyn AdapterFactory>,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn Reporter>,
}

impl JobDurationPhases {
    /// Creates the phase runner.
    pub fn new(
        adapters: Arc<dyn AdapterFactory>,
        clock: Arc<dyn Clock>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            adapters,
            clock,
            reporter,
        }
    }

    /// Persists the job start time if the variant is enabled.
    pub fn pre(&self, inputs: &dyn InputSource, state: &dyn StateStore) -> PreOutcome {
        let _span = info_span!("pre").entered();
        if !JobDurationConfig::is_enabled(inputs) {
            return PreOutcome::Disabled;
        }

        let now = self.clock.now();
        match state.save_state(JOB_START_STATE, &now.as_millis().to_string()) {
            Ok(()) => {
                info!(started_at = %now, "recorded job start time");
                PreOutcome::Recorded(now)
            }
            Err(e) => {
                warn!(error = %e, "failed to record job start time");
                self.reporter
                    .warning(&format!("Failed to record job start time: {e}"));
                PreOutcome::Failed(e)
            }
        }
    }

    /// Emits the job duration event if the variant is enabled and a start
    /// time was recorded.
    pub async fn post(
        &self,
        inputs: &dyn InputSource,
        state: &dyn StateStore,
        context: &ExecutionContext,
    ) -> PostOutcome {
        async {
            if !JobDurationConfig::is_enabled(inputs) {
                return PostOutcome::Disabled;
            }
            let Some(started_at) = self.start_time(state) else {
                return PostOutcome::Skipped;
            };

            let duration = self.clock.now().seconds_since(started_at);
            match self.emit_duration(inputs, context, duration).await {
                Ok(()) => {
                    info!(duration = %duration, "captured job duration");
                    PostOutcome::Emitted(duration)
                }
                Err(e) => {
                    warn!(error = %e, "job duration capture failed");
                    self.reporter
                        .warning(&format!("Failed to capture job duration: {e}"));
                    PostOutcome::Failed(e)
                }
            }
        }
        .instrument(info_span!("post", run_id = ?context.run_id))
        .await
    }

    fn start_time(&self, state: &dyn StateStore) -> Option<Timestamp> {
        let Some(raw) = state.get_state(JOB_START_STATE) else {
            self.reporter
                .warning("No job start time found in state, skipping job duration capture");
            return None;
        };
        let parsed = raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(Timestamp::from_millis);
        if parsed.is_none() {
            self.reporter.warning(&format!(
                "Job start time '{raw}' in state is not a valid timestamp, skipping job duration capture"
            ));
        }
        parsed
    }

    async fn emit_duration(
        &self,
        inputs: &dyn InputSource,
        context: &ExecutionContext,
        duration: DurationSeconds,
    ) -> Result<(), ActionError> {
        let config = JobDurationConfig::from_inputs(inputs)?;

        let mut bag = config.properties;
        bag.insert("job_duration_seconds", duration.as_i64());
        if let Some(runner) = config.runner {
            bag.insert("runner", runner);
        }
        if let Some(conclusion) = config.job_conclusion {
            bag.insert("job_conclusion", conclusion);
        }
        let batch = EventBatch {
            group_updates: Vec::new(),
            primary: assemble(bag, context, config.event, Some(context.group_key())),
            job_events: Vec::new(),
        };

        let mut client = self.adapters.analytics(&config.posthog)?;
        emitter::emit(client.as_mut(), &batch).await
    }
}
