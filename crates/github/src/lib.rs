//! GitHub REST infrastructure adapter.
//!
//! Implements the [`pipeline::WorkflowApi`] port over the GitHub Actions REST
//! endpoints for workflow runs and their jobs.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! HTTP transport, authentication headers, and response decoding live here;
//! the [`pipeline`] crate never sees them. Pagination *policy* (when to stop)
//! belongs to the caller: this adapter fetches exactly the page it is asked for.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pipeline::{
    ActionError, Credential, JobName, JobRecord, JobsPage, RunAttempt, RunId, RunRef, Timestamp,
    WorkflowApi, WorkflowRun,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

/// Base URL used when the runtime does not provide `GITHUB_API_URL`.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("posthog-github-action/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures talking to the GitHub REST API.
#[derive(Debug, Error)]
pub enum GithubError {
    /// The request could not be sent or the response body not read.
    #[error("GitHub API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub answered with a non-success status.
    #[error("GitHub API returned {status} for {url}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
        /// Response body, for the job log.
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("GitHub API returned an unexpected body for {url}: {source}")]
    Decode {
        /// Requested URL.
        url: String,
        /// Decoder diagnostic.
        #[source]
        source: serde_json::Error,
    },
}

impl From<GithubError> for ActionError {
    fn from(err: GithubError) -> Self {
        ActionError::transport(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RunResponse {
    id: u64,
    html_url: String,
    run_attempt: Option<u64>,
    run_started_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
}

impl From<RunResponse> for WorkflowRun {
    fn from(run: RunResponse) -> Self {
        WorkflowRun {
            id: RunId::new(run.id),
            html_url: run.html_url,
            run_attempt: run.run_attempt.map(RunAttempt::new),
            run_started_at: run.run_started_at.map(Timestamp::from_utc),
            created_at: run.created_at.map(Timestamp::from_utc),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JobsResponse {
    total_count: usize,
    #[serde(default)]
    jobs: Vec<JobResponse>,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    name: String,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    conclusion: Option<String>,
    runner_name: Option<String>,
}

impl JobResponse {
    fn into_record(self) -> Option<JobRecord> {
        Some(JobRecord {
            name: JobName::new(self.name)?,
            started_at: self.started_at.map(Timestamp::from_utc),
            completed_at: self.completed_at.map(Timestamp::from_utc),
            conclusion: self.conclusion,
            runner_name: self.runner_name.filter(|r| !r.is_empty()),
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Authenticated client for the workflow run endpoints.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: Credential,
}

impl GithubClient {
    /// Creates a client for the API rooted at `api_url`.
    pub fn new(api_url: impl Into<String>, token: Credential) -> Result<Self, GithubError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn run_url(&self, run: &RunRef) -> String {
        format!(
            "{}/repos/{}/{}/actions/runs/{}",
            self.api_url, run.owner, run.repo, run.run_id
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, GithubError> {
        let response = self
            .http
            .get(url)
            .query(query)
            .bearer_auth(self.token.expose())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GithubError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|source| GithubError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[async_trait]
impl WorkflowApi for GithubClient {
    #[instrument(skip(self), fields(run_id = %run.run_id))]
    async fn get_run(&self, run: &RunRef) -> Result<WorkflowRun, ActionError> {
        let response: RunResponse = self.get_json(&self.run_url(run), &[]).await?;
        debug!(html_url = %response.html_url, "fetched workflow run");
        Ok(response.into())
    }

    #[instrument(skip(self), fields(run_id = %run.run_id))]
    async fn list_jobs_page(
        &self,
        run: &RunRef,
        page: u32,
        per_page: u32,
    ) -> Result<JobsPage, ActionError> {
        let url = format!("{}/jobs", self.run_url(run));
        let response: JobsResponse = self
            .get_json(
                &url,
                &[("per_page", per_page.to_string()), ("page", page.to_string())],
            )
            .await?;
        debug!(
            total_count = response.total_count,
            job_count = response.jobs.len(),
            "fetched jobs page"
        );
        Ok(JobsPage {
            total_count: response.total_count,
            jobs: response
                .jobs
                .into_iter()
                .filter_map(JobResponse::into_record)
                .collect(),
        })
    }
}
