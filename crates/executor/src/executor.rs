//! The main-phase pipeline.
//!
//! ```text
//! Idle → Reading → Enriching → Assembling → Emitting → ShuttingDown → Done
//!           └──────────┴───────────┴──────────┴─────────────┴──→ Failed
//! ```
//!
//! Every fatal error is caught here, reported verbatim through the
//! [`Reporter`], and turned into a failed [`RunOutcome`]. The analytics client
//! is created on entering `Emitting` and is always flushed and closed, on
//! success and on error alike.

use std::sync::Arc;

use pipeline::{
    assemble_batch, ActionConfig, ActionError, AdapterFactory, Clock, EventName, ExecutionContext,
    InputSource, Reporter,
};
use tracing::{error, info, info_span, Instrument};

use crate::emitter;
use crate::steps::{EnrichmentPlan, StepContext};

/// Stages of one main-phase invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Not started.
    Idle,
    /// Reading configuration.
    Reading,
    /// Running enrichment steps.
    Enriching,
    /// Building payloads.
    Assembling,
    /// Enqueueing payloads.
    Emitting,
    /// Flushing and closing the analytics client.
    ShuttingDown,
    /// Finished successfully.
    Done,
    /// Aborted by a fatal error.
    Failed,
}

/// What a successful invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Name of the primary event.
    pub event: EventName,
    /// Enrichment steps that ran, in order.
    pub steps: Vec<&'static str>,
    /// Group-identify calls sent.
    pub group_updates: usize,
    /// Events sent (primary plus job events).
    pub events: usize,
}

/// Result of one invocation, after failures have been reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Terminal state ([`PipelineState::Done`] or [`PipelineState::Failed`]).
    pub state: PipelineState,
    /// Summary on success, error on failure.
    pub result: Result<RunSummary, ActionError>,
}

impl RunOutcome {
    /// Returns `true` if the invocation succeeded.
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Drives the main phase against injected adapters.
pub struct ActionExecutor {
    adapters: Arc<dyn AdapterFactory>,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn Reporter>,
}

impl ActionExecutor {
    /// Creates an executor.
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

    /// Runs the pipeline once and reports a failure, if any.
    pub async fn run(&self, inputs: &dyn InputSource, context: &ExecutionContext) -> RunOutcome {
        let mut state = PipelineState::Idle;
        let result = self
            .run_stages(inputs, context, &mut state)
            .instrument(info_span!("main", run_id = ?context.run_id))
            .await;

        match result {
            Ok(summary) => {
                info!(
                    event = %summary.event,
                    events = summary.events,
                    group_updates = summary.group_updates,
                    "pipeline finished"
                );
                RunOutcome {
                    state: PipelineState::Done,
                    result: Ok(summary),
                }
            }
            Err(e) => {
                error!(error = %e, failed_in = ?state, "pipeline failed");
                self.reporter.error(&e.to_string());
                RunOutcome {
                    state: PipelineState::Failed,
                    result: Err(e),
                }
            }
        }
    }

    async fn run_stages(
        &self,
        inputs: &dyn InputSource,
        context: &ExecutionContext,
        state: &mut PipelineState,
    ) -> Result<RunSummary, ActionError> {
        transition(state, PipelineState::Reading);
        let config = ActionConfig::from_inputs(inputs)?;

        transition(state, PipelineState::Enriching);
        let api = match &config.github_token {
            Some(token) if config.needs_workflow_api() => {
                Some(self.adapters.workflow_api(token, context)?)
            }
            _ => None,
        };
        let plan = EnrichmentPlan::from_config(&config, api)?;
        let cx = StepContext {
            context,
            clock: self.clock.as_ref(),
            reporter: self.reporter.as_ref(),
        };
        let enrichment = plan.run(&cx, config.properties.clone()).await?;

        transition(state, PipelineState::Assembling);
        let batch = assemble_batch(enrichment, context, &config.event);

        transition(state, PipelineState::Emitting);
        let mut client = self.adapters.analytics(&config.posthog)?;
        emitter::emit_then_close(client.as_mut(), &batch, || {
            transition(state, PipelineState::ShuttingDown)
        })
        .await?;

        Ok(RunSummary {
            event: config.event,
            steps: plan.step_names(),
            group_updates: batch.group_updates.len(),
            events: batch.event_count(),
        })
    }
}

fn transition(state: &mut PipelineState, next: PipelineState) {
    tracing::debug!(from = ?*state, to = ?next, "state transition");
    *state = next;
}
