//! The Context Collector.

use pipeline::{
    ExecutionContext, JobName, RepositoryName, RepositoryOwner, RunAttempt, RunId, RunNumber,
};

use crate::Environment;

/// Reads the ambient execution metadata from `GITHUB_*` variables.
///
/// Never fails: missing or unparsable values become `None`.
pub fn collect_context(env: &Environment) -> ExecutionContext {
    let text = |name: &str| env.get(name).map(str::to_string);
    let number = |name: &str| env.get(name).and_then(|v| v.parse::<u64>().ok());

    let (owner, repo) = env
        .get("GITHUB_REPOSITORY")
        .and_then(|full| full.split_once('/'))
        .map(|(owner, repo)| (RepositoryOwner::new(owner), RepositoryName::new(repo)))
        .unwrap_or((None, None));

    ExecutionContext {
        sha: text("GITHUB_SHA"),
        git_ref: text("GITHUB_REF"),
        workflow: text("GITHUB_WORKFLOW"),
        job: env.get("GITHUB_JOB").and_then(JobName::new),
        run_number: number("GITHUB_RUN_NUMBER").map(RunNumber::new),
        run_id: number("GITHUB_RUN_ID").map(RunId::new),
        run_attempt: number("GITHUB_RUN_ATTEMPT").map(RunAttempt::new),
        repository_owner: owner,
        repository: repo,
        actor: text("GITHUB_ACTOR"),
        event_name: text("GITHUB_EVENT_NAME"),
    }
}
