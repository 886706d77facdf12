//! Core domain of the PostHog GitHub Action.
//!
//! This crate contains every domain concept, newtype identifier, value type,
//! and error type used to turn action inputs and CI metadata into analytics
//! events. Infrastructure crates implement the port traits defined here; they
//! never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`EventName`, `RunId`, `GroupKey`, etc.) |
//! | [`types`] | Value types (`Timestamp`, `DurationSeconds`, `Credential`) |
//! | [`errors`] | The [`ActionError`] taxonomy |
//! | [`config`] | Input Reader and validated configuration |
//! | [`context`] | [`ExecutionContext`] snapshot |
//! | [`properties`] | [`PropertyBag`] |
//! | [`event`] | Payloads, group updates, platform records |
//! | [`assemble`] | The Event Assembler |
//! | [`ports`] | Traits implemented by infrastructure crates |

pub mod assemble;
pub mod config;
pub mod context;
pub mod errors;
pub mod event;
pub mod identifiers;
pub mod ports;
pub mod properties;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use assemble::{assemble, assemble_batch, job_events, workflow_group_update};
pub use config::{
    inputs, ActionConfig, InputReader, JobDurationConfig, PostHogSettings, DEFAULT_POSTHOG_HOST,
};
pub use context::{ExecutionContext, RunRef};
pub use errors::ActionError;
pub use event::{
    Enrichment, EventBatch, EventPayload, GroupUpdate, Groups, JobRecord, JobsPage, WorkflowRun,
    ACTOR_ID, WORKFLOW_RUN_GROUP,
};
pub use identifiers::{
    EventName, GroupKey, JobName, RepositoryName, RepositoryOwner, RunAttempt, RunId, RunNumber,
};
pub use ports::{
    AdapterFactory, AnalyticsClient, Clock, InputSource, Reporter, StateStore, SystemClock,
    WorkflowApi,
};
pub use properties::PropertyBag;
pub use types::{Credential, DurationSeconds, Timestamp};
