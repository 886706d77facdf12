//! PostHog analytics infrastructure adapter.
//!
//! Implements the [`pipeline::AnalyticsClient`] port against PostHog's batch
//! ingestion endpoint (`POST {host}/batch/`).
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Message framing, delivery metadata (timestamp, message
//! uuid), and HTTP transport live here. The [`pipeline`] crate sees only
//! [`pipeline::AnalyticsClient`].
//!
//! ## Delivery model
//!
//! `capture` and `group_identify` only append to an in-memory buffer. Nothing
//! touches the network until [`PostHogClient::flush_and_close`], which sends
//! the whole buffer in one request and closes the client. There are no
//! retries.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pipeline::{ActionError, AnalyticsClient, EventPayload, GroupUpdate, PostHogSettings};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Value of the `$lib` property on every message.
pub const LIB_NAME: &str = "posthog-github-action";

const LIB_VERSION: &str = env!("CARGO_PKG_VERSION");
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const GROUP_IDENTIFY_EVENT: &str = "$groupidentify";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures delivering analytics messages.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// The HTTP client could not be built or the request not sent.
    #[error("PostHog request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The ingestion endpoint rejected the batch.
    #[error("PostHog returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// A message was enqueued after the client was closed.
    #[error("PostHog client closed; message for '{event}' dropped")]
    Closed {
        /// Name of the rejected event.
        event: String,
    },
}

impl From<AnalyticsError> for ActionError {
    fn from(err: AnalyticsError) -> Self {
        ActionError::transport(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
struct BatchMessage {
    #[serde(rename = "type")]
    kind: &'static str,
    event: String,
    distinct_id: String,
    properties: Map<String, Value>,
    timestamp: DateTime<Utc>,
    uuid: Uuid,
}

impl BatchMessage {
    fn new(event: String, distinct_id: String, mut properties: Map<String, Value>) -> Self {
        properties.insert("$lib".to_string(), Value::from(LIB_NAME));
        properties.insert("$lib_version".to_string(), Value::from(LIB_VERSION));
        Self {
            kind: "capture",
            event,
            distinct_id,
            properties,
            timestamp: Utc::now(),
            uuid: Uuid::new_v4(),
        }
    }

    fn capture(payload: &EventPayload) -> Self {
        let mut properties = payload.properties.clone().into_object();
        if let Some(groups) = &payload.groups {
            let groups = serde_json::to_value(groups).unwrap_or(Value::Null);
            properties.insert("$groups".to_string(), groups);
        }
        Self::new(
            payload.event.to_string(),
            payload.distinct_id.clone(),
            properties,
        )
    }

    fn group_identify(update: &GroupUpdate) -> Self {
        let mut properties = Map::new();
        properties.insert("$group_type".to_string(), Value::from(update.group_type.as_str()));
        properties.insert("$group_key".to_string(), Value::from(update.group_key.as_str()));
        properties.insert(
            "$group_set".to_string(),
            Value::Object(update.properties.clone().into_object()),
        );
        Self::new(
            GROUP_IDENTIFY_EVENT.to_string(),
            format!("${}_{}", update.group_type, update.group_key),
            properties,
        )
    }
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    api_key: &'a str,
    batch: &'a [BatchMessage],
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Buffered PostHog client.
#[derive(Debug)]
pub struct PostHogClient {
    http: reqwest::Client,
    endpoint: String,
    settings: PostHogSettings,
    queue: Vec<BatchMessage>,
    closed: bool,
}

impl PostHogClient {
    /// Creates a client for the project identified by `settings`.
    pub fn new(settings: &PostHogSettings) -> Result<Self, AnalyticsError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("posthog-github-action/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/batch/", settings.host.trim_end_matches('/')),
            settings: settings.clone(),
            queue: Vec::new(),
            closed: false,
        })
    }

    /// Number of buffered messages.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn enqueue(&mut self, message: BatchMessage) -> Result<(), AnalyticsError> {
        if self.closed {
            return Err(AnalyticsError::Closed {
                event: message.event,
            });
        }
        debug!(event = %message.event, "enqueued analytics message");
        self.queue.push(message);
        Ok(())
    }

    /// Sends every buffered message in one batch and closes the client.
    ///
    /// The client is closed even when delivery fails; the buffer is dropped.
    #[instrument(skip(self), fields(endpoint = %self.endpoint, messages = self.queue.len()))]
    pub async fn flush_and_close(&mut self) -> Result<(), AnalyticsError> {
        self.closed = true;
        let batch = std::mem::take(&mut self.queue);
        if batch.is_empty() {
            debug!("nothing to flush");
            return Ok(());
        }

        let response = self
            .http
            .post(&self.endpoint)
            .json(&BatchRequest {
                api_key: self.settings.token.expose(),
                batch: &batch,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyticsError::Status {
                status: status.as_u16(),
                body,
            });
        }
        info!(messages = batch.len(), "delivered analytics batch");
        Ok(())
    }
}

#[async_trait]
impl AnalyticsClient for PostHogClient {
    fn capture(&mut self, event: &EventPayload) -> Result<(), ActionError> {
        Ok(self.enqueue(BatchMessage::capture(event))?)
    }

    fn group_identify(&mut self, update: &GroupUpdate) -> Result<(), ActionError> {
        Ok(self.enqueue(BatchMessage::group_identify(update))?)
    }

    async fn flush_and_close(&mut self) -> Result<(), ActionError> {
        Ok(PostHogClient::flush_and_close(self).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::{Credential, EventName, GroupKey, Groups, PropertyBag, ACTOR_ID};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(host: String) -> PostHogSettings {
        PostHogSettings {
            token: Credential::new("phc_test").unwrap(),
            host,
        }
    }

    fn payload() -> EventPayload {
        EventPayload {
            distinct_id: ACTOR_ID.to_string(),
            event: EventName::new("ci-run").unwrap(),
            properties: PropertyBag::new().with("sha", "abc123"),
            groups: Some(Groups {
                workflow_run: GroupKey::for_run("posthog", "posthog", "7"),
            }),
        }
    }

    async fn received_body(server: &MockServer) -> Value {
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        serde_json::from_slice(&requests[0].body).unwrap()
    }

    #[tokio::test]
    async fn flush_sends_single_batch_in_enqueue_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/batch/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = PostHogClient::new(&settings(server.uri())).unwrap();
        client
            .group_identify(&GroupUpdate {
                group_type: "workflow_run".into(),
                group_key: GroupKey::for_run("posthog", "posthog", "7"),
                properties: PropertyBag::new().with("conclusion", "success"),
            })
            .unwrap();
        client.capture(&payload()).unwrap();
        assert_eq!(client.pending(), 2);

        AnalyticsClient::flush_and_close(&mut client).await.unwrap();

        let body = received_body(&server).await;
        assert_eq!(body["api_key"], json!("phc_test"));
        let batch = body["batch"].as_array().unwrap();
        assert_eq!(batch.len(), 2);

        assert_eq!(batch[0]["event"], json!("$groupidentify"));
        assert_eq!(batch[0]["distinct_id"], json!("$workflow_run_posthog/posthog/7"));
        assert_eq!(batch[0]["properties"]["$group_type"], json!("workflow_run"));
        assert_eq!(batch[0]["properties"]["$group_set"]["conclusion"], json!("success"));

        assert_eq!(batch[1]["type"], json!("capture"));
        assert_eq!(batch[1]["event"], json!("ci-run"));
        assert_eq!(batch[1]["distinct_id"], json!(ACTOR_ID));
        assert_eq!(batch[1]["properties"]["sha"], json!("abc123"));
        assert_eq!(
            batch[1]["properties"]["$groups"]["workflow_run"],
            json!("posthog/posthog/7")
        );
        assert_eq!(batch[1]["properties"]["$lib"], json!(LIB_NAME));
        assert!(batch[1]["uuid"].is_string());
    }

    #[tokio::test]
    async fn empty_flush_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut client = PostHogClient::new(&settings(server.uri())).unwrap();
        client.flush_and_close().await.unwrap();
    }

    #[tokio::test]
    async fn rejected_batch_is_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/batch/"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let mut client = PostHogClient::new(&settings(server.uri())).unwrap();
        client.capture(&payload()).unwrap();
        let err = AnalyticsClient::flush_and_close(&mut client).await.unwrap_err();

        assert_eq!(
            err,
            ActionError::transport("PostHog returned 401: invalid api key")
        );
    }

    #[tokio::test]
    async fn closed_client_rejects_new_messages() {
        let server = MockServer::start().await;
        let mut client = PostHogClient::new(&settings(server.uri())).unwrap();
        client.flush_and_close().await.unwrap();

        let err = client.capture(&payload()).unwrap_err();
        assert!(err.to_string().contains("client closed"));
    }
}
