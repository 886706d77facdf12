//! The Metadata Enricher: independent, separately toggled enrichment steps.
//!
//! Each step reads platform metadata (or a plain input) and folds it into the
//! shared [`Enrichment`] accumulator. An [`EnrichmentPlan`] selects the steps
//! enabled by the configuration and runs them in a fixed order:
//!
//! 1. [`RunDurationStep`]: `duration_seconds`, `url`, `attempt`, `started_at`
//! 2. [`StatusJobStep`]: `conclusion` of a named job
//! 3. [`RunnerLabelStep`]: `runner`
//! 4. [`JobDurationsStep`]: job records for per-job duration events
//!
//! A failure in any step aborts the invocation. A status job that cannot be
//! found is only a warning.

use std::sync::Arc;

use async_trait::async_trait;
use pipeline::{
    inputs, ActionConfig, ActionError, Clock, Enrichment, ExecutionContext, JobName, PropertyBag,
    Reporter, RunAttempt, RunRef, WorkflowApi,
};
use serde_json::Value;
use tracing::{info, info_span, Instrument};

use crate::pager::JobPager;

/// Shared, read-only collaborators of every step.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    /// Ambient execution metadata.
    pub context: &'a ExecutionContext,
    /// Time source for duration calculations.
    pub clock: &'a dyn Clock,
    /// Sink for non-fatal warnings.
    pub reporter: &'a dyn Reporter,
}

impl StepContext<'_> {
    fn run_ref(&self) -> Result<RunRef, ActionError> {
        self.context.run_ref().ok_or_else(|| {
            ActionError::config(
                "GITHUB_REPOSITORY and GITHUB_RUN_ID must be set to query workflow run metadata",
            )
        })
    }
}

/// One enrichment behaviour.
#[async_trait]
pub trait EnrichmentStep: Send + Sync {
    /// Name used in logs and spans.
    fn name(&self) -> &'static str;

    /// Folds this step's metadata into `enrichment`.
    async fn apply(
        &self,
        cx: &StepContext<'_>,
        enrichment: &mut Enrichment,
    ) -> Result<(), ActionError>;
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Captures how long the current workflow run has been running.
pub struct RunDurationStep {
    api: Arc<dyn WorkflowApi>,
}

impl RunDurationStep {
    /// Creates the step over `api`.
    pub fn new(api: Arc<dyn WorkflowApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl EnrichmentStep for RunDurationStep {
    fn name(&self) -> &'static str {
        "run-duration"
    }

    async fn apply(
        &self,
        cx: &StepContext<'_>,
        enrichment: &mut Enrichment,
    ) -> Result<(), ActionError> {
        let run = self.api.get_run(&cx.run_ref()?).await?;
        let started_at = run
            .start_time()
            .ok_or_else(|| ActionError::transport("workflow run has no start time"))?;
        let duration = cx.clock.now().seconds_since(started_at);
        info!(duration = %duration, run_id = %run.id, "captured run duration");

        let bag = &mut enrichment.properties;
        bag.insert("duration_seconds", duration.as_i64());
        bag.insert("url", run.html_url);
        // Some GitHub Enterprise Server versions omit run_attempt.
        let attempt = run.run_attempt.or(cx.context.run_attempt);
        bag.insert(
            "attempt",
            attempt
                .map(|a| Value::from(RunAttempt::as_u64(a)))
                .unwrap_or(Value::Null),
        );
        bag.insert("started_at", started_at.to_iso8601());
        Ok(())
    }
}

/// Reports the conclusion of a named job in the current run.
pub struct StatusJobStep {
    api: Arc<dyn WorkflowApi>,
    job: JobName,
}

impl StatusJobStep {
    /// Creates the step looking up `job` over `api`.
    pub fn new(api: Arc<dyn WorkflowApi>, job: JobName) -> Self {
        Self { api, job }
    }
}

#[async_trait]
impl EnrichmentStep for StatusJobStep {
    fn name(&self) -> &'static str {
        "status-job"
    }

    async fn apply(
        &self,
        cx: &StepContext<'_>,
        enrichment: &mut Enrichment,
    ) -> Result<(), ActionError> {
        let run = cx.run_ref()?;
        let Some(found) = JobPager::new(self.api.as_ref(), &run).find(&self.job).await? else {
            cx.reporter.warning(&format!(
                "Job '{}' not found in workflow run {}",
                self.job, run.run_id
            ));
            return Ok(());
        };

        info!(job = %self.job, conclusion = ?found.conclusion, "found status job");
        enrichment.properties.insert(
            "conclusion",
            found.conclusion.clone().map(Value::String).unwrap_or(Value::Null),
        );
        enrichment.workflow_conclusion = found.conclusion;
        Ok(())
    }
}

/// Adds the configured runner label verbatim.
pub struct RunnerLabelStep {
    runner: String,
}

impl RunnerLabelStep {
    /// Creates the step adding `runner`.
    pub fn new(runner: impl Into<String>) -> Self {
        Self {
            runner: runner.into(),
        }
    }
}

#[async_trait]
impl EnrichmentStep for RunnerLabelStep {
    fn name(&self) -> &'static str {
        "runner-label"
    }

    async fn apply(
        &self,
        _cx: &StepContext<'_>,
        enrichment: &mut Enrichment,
    ) -> Result<(), ActionError> {
        enrichment.properties.insert("runner", self.runner.as_str());
        Ok(())
    }
}

/// Collects every job of the current run for per-job duration events.
pub struct JobDurationsStep {
    api: Arc<dyn WorkflowApi>,
}

impl JobDurationsStep {
    /// Creates the step over `api`.
    pub fn new(api: Arc<dyn WorkflowApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl EnrichmentStep for JobDurationsStep {
    fn name(&self) -> &'static str {
        "job-durations"
    }

    async fn apply(
        &self,
        cx: &StepContext<'_>,
        enrichment: &mut Enrichment,
    ) -> Result<(), ActionError> {
        let run = cx.run_ref()?;
        let jobs = JobPager::new(self.api.as_ref(), &run).collect_all().await?;
        info!(job_count = jobs.len(), "collected jobs");
        enrichment.jobs = jobs;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// The enrichment steps enabled for one invocation, in execution order.
pub struct EnrichmentPlan {
    steps: Vec<Box<dyn EnrichmentStep>>,
}

impl EnrichmentPlan {
    /// Selects the steps enabled by `config`.
    ///
    /// `api` must be present when any platform-backed step is enabled.
    pub fn from_config(
        config: &ActionConfig,
        api: Option<Arc<dyn WorkflowApi>>,
    ) -> Result<Self, ActionError> {
        let require_api = |feature: &str| {
            api.clone().ok_or_else(|| {
                ActionError::config(format!("github-token is required when {feature} is enabled"))
            })
        };

        let mut steps: Vec<Box<dyn EnrichmentStep>> = Vec::new();
        if config.capture_run_duration {
            steps.push(Box::new(RunDurationStep::new(require_api(
                inputs::CAPTURE_RUN_DURATION,
            )?)));
        }
        if let Some(job) = &config.status_job {
            steps.push(Box::new(StatusJobStep::new(
                require_api(inputs::STATUS_JOB)?,
                job.clone(),
            )));
        }
        if let Some(runner) = &config.runner {
            steps.push(Box::new(RunnerLabelStep::new(runner.as_str())));
        }
        if config.capture_job_durations {
            steps.push(Box::new(JobDurationsStep::new(require_api(
                inputs::CAPTURE_JOB_DURATIONS,
            )?)));
        }
        Ok(Self { steps })
    }

    /// Names of the selected steps, in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Runs every step in order, starting from `properties`.
    pub async fn run(
        &self,
        cx: &StepContext<'_>,
        properties: PropertyBag,
    ) -> Result<Enrichment, ActionError> {
        let mut enrichment = Enrichment::new(properties);
        for step in &self.steps {
            step.apply(cx, &mut enrichment)
                .instrument(info_span!("enrich", step = step.name()))
                .await?;
        }
        Ok(enrichment)
    }
}
