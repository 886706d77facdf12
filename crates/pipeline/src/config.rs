//! Action inputs: the Input Reader and the validated per-invocation
//! configuration built from it.
//!
//! Inputs are read once into an immutable [`ActionConfig`] (main phase) or
//! [`JobDurationConfig`] (post phase). Validation happens here, before any
//! network call is made: a feature that needs the platform API without a
//! `github-token` fails the invocation with [`ActionError::Config`].

use serde_json::Value;

use crate::{ActionError, Credential, EventName, InputSource, JobName, PropertyBag};

// ---------------------------------------------------------------------------
// Input names
// ---------------------------------------------------------------------------

/// Names of every input the action recognises.
pub mod inputs {
    /// Analytics project key.
    pub const POSTHOG_TOKEN: &str = "posthog-token";
    /// Analytics ingestion base URL.
    pub const POSTHOG_API_HOST: &str = "posthog-api-host";
    /// Name of the primary event.
    pub const EVENT: &str = "event";
    /// JSON object of user-supplied properties.
    pub const PROPERTIES: &str = "properties";
    /// Capture the duration of the current workflow run.
    pub const CAPTURE_RUN_DURATION: &str = "capture-run-duration";
    /// Alias of [`CAPTURE_RUN_DURATION`].
    pub const CAPTURE_WORKFLOW_DURATION: &str = "capture-workflow-duration";
    /// Emit one duration event per completed job of the run.
    pub const CAPTURE_JOB_DURATIONS: &str = "capture-job-durations";
    /// Two-phase mode: time the invoking job from `pre` to `post`.
    pub const CAPTURE_JOB_DURATION: &str = "capture-job-duration";
    /// Platform API token.
    pub const GITHUB_TOKEN: &str = "github-token";
    /// Runner label added verbatim as the `runner` property.
    pub const RUNNER: &str = "runner";
    /// Name of the job whose conclusion is reported.
    pub const STATUS_JOB: &str = "status-job";
    /// Two-phase mode: conclusion of the timed job.
    pub const JOB_CONCLUSION: &str = "job-conclusion";
}

/// Ingestion host used when `posthog-api-host` is empty.
pub const DEFAULT_POSTHOG_HOST: &str = "https://us.i.posthog.com";

// ---------------------------------------------------------------------------
// Input Reader
// ---------------------------------------------------------------------------

/// Typed access to raw action inputs.
#[derive(Clone, Copy)]
pub struct InputReader<'a> {
    source: &'a dyn InputSource,
}

impl<'a> InputReader<'a> {
    /// Creates a reader over `source`.
    pub fn new(source: &'a dyn InputSource) -> Self {
        Self { source }
    }

    /// Returns the trimmed input value, or an empty string when unset.
    pub fn read(&self, name: &str) -> String {
        self.source
            .raw(name)
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    }

    /// Returns the input if it is non-empty.
    pub fn read_optional(&self, name: &str) -> Option<String> {
        Some(self.read(name)).filter(|v| !v.is_empty())
    }

    /// Returns `true` iff the input is exactly the literal `"true"`.
    pub fn read_bool(&self, name: &str) -> bool {
        self.read(name) == "true"
    }

    /// Parses the input as a JSON object. An empty input yields an empty bag.
    pub fn read_json(&self, name: &str) -> Result<PropertyBag, ActionError> {
        let raw = self.read(name);
        if raw.is_empty() {
            return Ok(PropertyBag::new());
        }
        let parse_error = |message: String| ActionError::Parse {
            input: name.to_string(),
            message,
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(object)) => Ok(PropertyBag::from_object(object)),
            Ok(other) => Err(parse_error(format!(
                "expected an object, found {}",
                json_kind(&other)
            ))),
            Err(e) => Err(parse_error(e.to_string())),
        }
    }

    /// Returns the input, failing if it is empty.
    pub fn read_required(&self, name: &str) -> Result<String, ActionError> {
        self.read_optional(name).ok_or_else(|| {
            ActionError::config(format!("Input required and not supplied: {name}"))
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Where and how to deliver analytics events.
#[derive(Debug, Clone, PartialEq)]
pub struct PostHogSettings {
    /// Project API key.
    pub token: Credential,
    /// Base URL of the ingestion service, without a trailing slash.
    pub host: String,
}

impl PostHogSettings {
    fn from_inputs(reader: &InputReader<'_>) -> Result<Self, ActionError> {
        let token = Credential::new(reader.read_required(inputs::POSTHOG_TOKEN)?)
            .ok_or_else(|| ActionError::config("posthog-token must not be empty"))?;
        let host = reader
            .read_optional(inputs::POSTHOG_API_HOST)
            .unwrap_or_else(|| DEFAULT_POSTHOG_HOST.to_string());
        Ok(Self {
            token,
            host: host.trim_end_matches('/').to_string(),
        })
    }
}

fn read_event_name(reader: &InputReader<'_>) -> Result<EventName, ActionError> {
    let raw = reader.read_required(inputs::EVENT)?;
    EventName::new(raw).ok_or_else(|| ActionError::config("event must not be empty"))
}

/// Validated configuration of the main phase.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionConfig {
    /// Delivery settings.
    pub posthog: PostHogSettings,
    /// Name of the primary event.
    pub event: EventName,
    /// User-supplied properties.
    pub properties: PropertyBag,
    /// Capture run duration, URL, attempt and start time.
    pub capture_run_duration: bool,
    /// Emit one duration event per completed job.
    pub capture_job_durations: bool,
    /// Job whose conclusion is reported, if any.
    pub status_job: Option<JobName>,
    /// Runner label, if any.
    pub runner: Option<String>,
    /// Platform API token, if any.
    pub github_token: Option<Credential>,
}

impl ActionConfig {
    /// Reads and validates every main-phase input.
    pub fn from_inputs(source: &dyn InputSource) -> Result<Self, ActionError> {
        let reader = InputReader::new(source);

        let config = Self {
            posthog: PostHogSettings::from_inputs(&reader)?,
            event: read_event_name(&reader)?,
            properties: reader.read_json(inputs::PROPERTIES)?,
            capture_run_duration: reader.read_bool(inputs::CAPTURE_RUN_DURATION)
                || reader.read_bool(inputs::CAPTURE_WORKFLOW_DURATION),
            capture_job_durations: reader.read_bool(inputs::CAPTURE_JOB_DURATIONS),
            status_job: reader
                .read_optional(inputs::STATUS_JOB)
                .and_then(JobName::new),
            runner: reader.read_optional(inputs::RUNNER),
            github_token: reader
                .read_optional(inputs::GITHUB_TOKEN)
                .and_then(Credential::new),
        };
        config.validate()?;
        Ok(config)
    }

    /// Names of the enabled features that call the platform API.
    pub fn api_features(&self) -> Vec<&'static str> {
        let mut features = Vec::new();
        if self.capture_run_duration {
            features.push(inputs::CAPTURE_RUN_DURATION);
        }
        if self.status_job.is_some() {
            features.push(inputs::STATUS_JOB);
        }
        if self.capture_job_durations {
            features.push(inputs::CAPTURE_JOB_DURATIONS);
        }
        features
    }

    /// Returns `true` if any enabled feature needs the platform API.
    pub fn needs_workflow_api(&self) -> bool {
        !self.api_features().is_empty()
    }

    fn validate(&self) -> Result<(), ActionError> {
        if self.github_token.is_some() {
            return Ok(());
        }
        match self.api_features().first() {
            Some(feature) => Err(ActionError::config(format!(
                "github-token is required when {feature} is enabled"
            ))),
            None => Ok(()),
        }
    }
}

/// Configuration of the two-phase job duration variant (`post` phase).
#[derive(Debug, Clone, PartialEq)]
pub struct JobDurationConfig {
    /// Delivery settings.
    pub posthog: PostHogSettings,
    /// Name of the emitted event.
    pub event: EventName,
    /// User-supplied properties.
    pub properties: PropertyBag,
    /// Runner label, if any.
    pub runner: Option<String>,
    /// Externally supplied job conclusion, if any.
    pub job_conclusion: Option<String>,
}

impl JobDurationConfig {
    /// Returns `true` if the two-phase variant is switched on.
    pub fn is_enabled(source: &dyn InputSource) -> bool {
        InputReader::new(source).read_bool(inputs::CAPTURE_JOB_DURATION)
    }

    /// Reads and validates the post-phase inputs.
    pub fn from_inputs(source: &dyn InputSource) -> Result<Self, ActionError> {
        let reader = InputReader::new(source);
        Ok(Self {
            posthog: PostHogSettings::from_inputs(&reader)?,
            event: read_event_name(&reader)?,
            properties: reader.read_json(inputs::PROPERTIES)?,
            runner: reader.read_optional(inputs::RUNNER),
            job_conclusion: reader.read_optional(inputs::JOB_CONCLUSION),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapInputs(HashMap<&'static str, &'static str>);

    impl InputSource for MapInputs {
        fn raw(&self, name: &str) -> Option<String> {
            self.0.get(name).map(|v| v.to_string())
        }
    }

    fn inputs(pairs: &[(&'static str, &'static str)]) -> MapInputs {
        MapInputs(pairs.iter().copied().collect())
    }

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![(inputs::POSTHOG_TOKEN, "phc_test"), (inputs::EVENT, "ci-run")]
    }

    #[test]
    fn read_bool_only_accepts_literal_true() {
        let source = inputs(&[("a", "true"), ("b", "TRUE"), ("c", "yes"), ("d", " true ")]);
        let reader = InputReader::new(&source);
        assert!(reader.read_bool("a"));
        assert!(!reader.read_bool("b"));
        assert!(!reader.read_bool("c"));
        assert!(reader.read_bool("d"));
        assert!(!reader.read_bool("missing"));
    }

    #[test]
    fn read_json_defaults_to_empty_object() {
        let source = inputs(&[]);
        let bag = InputReader::new(&source).read_json(inputs::PROPERTIES).unwrap();
        assert!(bag.is_empty());
    }

    #[test]
    fn read_json_rejects_malformed_input() {
        let source = inputs(&[(inputs::PROPERTIES, "{not json")]);
        let err = InputReader::new(&source)
            .read_json(inputs::PROPERTIES)
            .unwrap_err();
        assert!(matches!(err, ActionError::Parse { ref input, .. } if input == "properties"));
    }

    #[test]
    fn read_json_rejects_non_objects() {
        let source = inputs(&[(inputs::PROPERTIES, "[1, 2]")]);
        let err = InputReader::new(&source)
            .read_json(inputs::PROPERTIES)
            .unwrap_err();
        assert!(err.to_string().contains("found an array"));
    }

    #[test]
    fn config_applies_defaults() {
        let config = ActionConfig::from_inputs(&inputs(&base())).unwrap();
        assert_eq!(config.posthog.host, DEFAULT_POSTHOG_HOST);
        assert_eq!(config.event.as_str(), "ci-run");
        assert!(!config.needs_workflow_api());
        assert!(config.runner.is_none());
    }

    #[test]
    fn config_trims_trailing_slash_from_host() {
        let mut pairs = base();
        pairs.push((inputs::POSTHOG_API_HOST, "https://eu.i.posthog.com/"));
        let config = ActionConfig::from_inputs(&inputs(&pairs)).unwrap();
        assert_eq!(config.posthog.host, "https://eu.i.posthog.com");
    }

    #[test]
    fn missing_event_is_a_config_error() {
        let source = inputs(&[(inputs::POSTHOG_TOKEN, "phc_test")]);
        let err = ActionConfig::from_inputs(&source).unwrap_err();
        assert_eq!(
            err,
            ActionError::config("Input required and not supplied: event")
        );
    }

    #[test]
    fn api_features_require_github_token() {
        for flag in [
            inputs::CAPTURE_RUN_DURATION,
            inputs::CAPTURE_WORKFLOW_DURATION,
            inputs::CAPTURE_JOB_DURATIONS,
        ] {
            let mut pairs = base();
            pairs.push((flag, "true"));
            let err = ActionConfig::from_inputs(&inputs(&pairs)).unwrap_err();
            assert!(matches!(err, ActionError::Config { .. }), "{flag}");
            assert!(err.to_string().contains("github-token is required"));
        }

        let mut pairs = base();
        pairs.push((inputs::STATUS_JOB, "build"));
        let err = ActionConfig::from_inputs(&inputs(&pairs)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "github-token is required when status-job is enabled"
        );
    }

    #[test]
    fn workflow_duration_is_an_alias() {
        let mut pairs = base();
        pairs.push((inputs::CAPTURE_WORKFLOW_DURATION, "true"));
        pairs.push((inputs::GITHUB_TOKEN, "ghs_token"));
        let config = ActionConfig::from_inputs(&inputs(&pairs)).unwrap();
        assert!(config.capture_run_duration);
        assert!(config.needs_workflow_api());
    }

    #[test]
    fn job_duration_config_reads_conclusion() {
        let mut pairs = base();
        pairs.push((inputs::CAPTURE_JOB_DURATION, "true"));
        pairs.push((inputs::JOB_CONCLUSION, "success"));
        let source = inputs(&pairs);
        assert!(JobDurationConfig::is_enabled(&source));
        let config = JobDurationConfig::from_inputs(&source).unwrap();
        assert_eq!(config.job_conclusion.as_deref(), Some("success"));
    }
}
