//! PostHog GitHub Action entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Select the phase**: `run` (the default), `pre`, or `post`, matching
//!    the `pre-entrypoint`, `entrypoint` and `post-entrypoint` of `action.yml`.
//! 2. **Wire observability**: `tracing-subscriber` on stderr, optionally JSON,
//!    plus an OpenTelemetry OTLP exporter when an endpoint is configured.
//!    Stdout is reserved for workflow commands.
//! 3. **Construct infrastructure**: the environment snapshot, the workflow
//!    command writer, and [`LiveAdapters`] for the GitHub and PostHog clients.
//! 4. **Map outcomes to exit codes**: a failed `run` exits 1; `pre` and `post`
//!    always exit 0.

mod adapters;
mod observability;

use std::process::ExitCode;
use std::sync::Arc;

use actions::{collect_context, Environment, WorkflowCommands};
use clap::{Parser, Subcommand};
use executor::{ActionExecutor, JobDurationPhases};
use pipeline::SystemClock;

use crate::adapters::LiveAdapters;

#[derive(Debug, Parser)]
#[command(name = "posthog-action", version, about = "Send CI events to PostHog")]
struct Cli {
    #[command(subcommand)]
    phase: Option<Phase>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Phase {
    /// Emit the configured event (main step).
    Run,
    /// Record the job start time.
    Pre,
    /// Emit the job duration event.
    Post,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let telemetry = observability::init();

    let phase = cli.phase.unwrap_or(Phase::Run);
    tracing::debug!(?phase, "starting");
    let code = run_phase(phase).await;

    telemetry.shutdown();
    code
}

async fn run_phase(phase: Phase) -> ExitCode {
    let env = Environment::from_process();
    let commands = Arc::new(WorkflowCommands::stdout());
    let adapters = Arc::new(LiveAdapters::from_environment(&env));
    let clock = Arc::new(SystemClock);
    let inputs = env.inputs();

    match phase {
        Phase::Run => {
            let context = collect_context(&env);
            let outcome = ActionExecutor::new(adapters, clock, commands)
                .run(&inputs, &context)
                .await;
            if outcome.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Phase::Pre => {
            let state = env.state(commands.clone());
            JobDurationPhases::new(adapters, clock, commands).pre(&inputs, &state);
            ExitCode::SUCCESS
        }
        Phase::Post => {
            let context = collect_context(&env);
            let state = env.state(commands.clone());
            JobDurationPhases::new(adapters, clock, commands)
                .post(&inputs, &state, &context)
                .await;
            ExitCode::SUCCESS
        }
    }
}
