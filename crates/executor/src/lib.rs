//! Orchestration of the PostHog GitHub Action.
//!
//! This crate sequences the Input Reader, the Metadata Enricher, the Event
//! Assembler and the Emitter into the main pipeline ([`ActionExecutor`]), and
//! provides the two-phase job duration variant ([`JobDurationPhases`]).
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Everything here talks to the outside world only
//! through the port traits of the [`pipeline`] crate; adapters are supplied by
//! an [`AdapterFactory`](pipeline::AdapterFactory). No domain rules live here.

pub mod emitter;
pub mod executor;
pub mod pager;
pub mod steps;
pub mod two_phase;

#[cfg(test)]
mod testing;

pub use executor::{ActionExecutor, PipelineState, RunOutcome, RunSummary};
pub use pager::{JobPager, JOBS_PER_PAGE};
pub use steps::{
    EnrichmentPlan, EnrichmentStep, JobDurationsStep, RunDurationStep, RunnerLabelStep,
    StatusJobStep, StepContext,
};
pub use two_phase::{JobDurationPhases, PostOutcome, PreOutcome, JOB_START_STATE};
