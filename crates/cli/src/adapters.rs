//! Production [`AdapterFactory`].

use std::sync::Arc;

use actions::Environment;
use analytics::PostHogClient;
use github::{GithubClient, DEFAULT_API_URL};
use pipeline::{
    ActionError, AdapterFactory, AnalyticsClient, Credential, ExecutionContext, PostHogSettings,
    WorkflowApi,
};

/// Builds the GitHub REST and PostHog clients.
#[derive(Debug, Clone)]
pub struct LiveAdapters {
    api_url: String,
}

impl LiveAdapters {
    /// Uses `GITHUB_API_URL` when set, else the public API.
    pub fn from_environment(env: &Environment) -> Self {
        let api_url = env.api_url().unwrap_or(DEFAULT_API_URL);
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }
}

impl AdapterFactory for LiveAdapters {
    fn analytics(
        &self,
        settings: &PostHogSettings,
    ) -> Result<Box<dyn AnalyticsClient>, ActionError> {
        let client: Box<dyn AnalyticsClient> = Box::new(PostHogClient::new(settings)?);
        Ok(client)
    }

    fn workflow_api(
        &self,
        token: &Credential,
        context: &ExecutionContext,
    ) -> Result<Arc<dyn WorkflowApi>, ActionError> {
        tracing::debug!(api_url = %self.api_url, run_id = ?context.run_id, "creating GitHub client");
        let api: Arc<dyn WorkflowApi> = Arc::new(GithubClient::new(&self.api_url, token.clone())?);
        Ok(api)
    }
}
