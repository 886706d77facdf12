//! In-memory fakes of the port traits.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pipeline::{
    ActionError, AdapterFactory, AnalyticsClient, Clock, Credential, EventPayload,
    ExecutionContext, GroupUpdate, InputSource, JobName, JobRecord, JobsPage, PostHogSettings,
    Reporter, RepositoryName, RepositoryOwner, RunAttempt, RunId, RunNumber, RunRef, StateStore,
    Timestamp, WorkflowApi, WorkflowRun,
};

/// 2024-05-01T10:00:00Z
pub const BASE_MILLIS: i64 = 1_714_557_600_000;

pub fn at(offset_secs: i64) -> Timestamp {
    Timestamp::from_millis(BASE_MILLIS + offset_secs * 1000).unwrap()
}

pub fn job(name: &str, start_secs: i64, end_secs: Option<i64>) -> JobRecord {
    JobRecord {
        name: JobName::new(name).unwrap(),
        started_at: Some(at(start_secs)),
        completed_at: end_secs.map(at),
        conclusion: end_secs.map(|_| "success".to_string()),
        runner_name: Some("GitHub Actions 1".to_string()),
    }
}

pub fn run_ref() -> RunRef {
    RunRef {
        owner: RepositoryOwner::new("posthog").unwrap(),
        repo: RepositoryName::new("posthog").unwrap(),
        run_id: RunId::new(77),
    }
}

pub fn context() -> ExecutionContext {
    ExecutionContext {
        sha: Some("abc123".into()),
        git_ref: Some("refs/heads/main".into()),
        workflow: Some("CI".into()),
        job: JobName::new("report"),
        run_number: Some(RunNumber::new(3)),
        run_id: Some(RunId::new(77)),
        run_attempt: Some(RunAttempt::new(1)),
        repository_owner: RepositoryOwner::new("posthog"),
        repository: RepositoryName::new("posthog"),
        actor: Some("octocat".into()),
        event_name: Some("push".into()),
    }
}

// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MapInputs(HashMap<String, String>);

impl MapInputs {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl InputSource for MapInputs {
    fn raw(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

// ---------------------------------------------------------------------------

pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingReporter {
    warnings: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryState(Mutex<HashMap<String, String>>);

impl MemoryState {
    pub fn with(name: &str, value: &str) -> Self {
        let state = Self::default();
        state.0.lock().unwrap().insert(name.into(), value.into());
        state
    }
}

impl StateStore for MemoryState {
    fn save_state(&self, name: &str, value: &str) -> Result<(), ActionError> {
        self.0.lock().unwrap().insert(name.into(), value.into());
        Ok(())
    }

    fn get_state(&self, name: &str) -> Option<String> {
        self.0.lock().unwrap().get(name).cloned()
    }
}

/// State store whose writes always fail, as with an unwritable state file.
pub struct ReadOnlyState;

impl StateStore for ReadOnlyState {
    fn save_state(&self, name: &str, _value: &str) -> Result<(), ActionError> {
        Err(ActionError::State {
            name: name.to_string(),
            message: "Permission denied (os error 13)".to_string(),
        })
    }

    fn get_state(&self, _name: &str) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    GroupIdentify(GroupUpdate),
    Capture(EventPayload),
    FlushAndClose,
}

#[derive(Clone, Default)]
pub struct RecordingAnalytics {
    log: Arc<Mutex<Vec<Recorded>>>,
    fail_flush: bool,
}

impl RecordingAnalytics {
    pub fn failing_flush() -> Self {
        Self {
            fail_flush: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    pub fn captures(&self) -> Vec<EventPayload> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Recorded::Capture(e) => Some(e),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl AnalyticsClient for RecordingAnalytics {
    fn capture(&mut self, event: &EventPayload) -> Result<(), ActionError> {
        self.log.lock().unwrap().push(Recorded::Capture(event.clone()));
        Ok(())
    }

    fn group_identify(&mut self, update: &GroupUpdate) -> Result<(), ActionError> {
        self.log
            .lock()
            .unwrap()
            .push(Recorded::GroupIdentify(update.clone()));
        Ok(())
    }

    async fn flush_and_close(&mut self) -> Result<(), ActionError> {
        self.log.lock().unwrap().push(Recorded::FlushAndClose);
        if self.fail_flush {
            Err(ActionError::transport("PostHog returned 503: unavailable"))
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptedApi {
    run: Option<WorkflowRun>,
    jobs: Vec<JobRecord>,
    pages: Mutex<Vec<u32>>,
    run_fetches: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run(mut self, run: WorkflowRun) -> Self {
        self.run = Some(run);
        self
    }

    pub fn with_jobs(mut self, jobs: Vec<JobRecord>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn pages_requested(&self) -> Vec<u32> {
        self.pages.lock().unwrap().clone()
    }

    pub fn run_fetches(&self) -> usize {
        self.run_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkflowApi for ScriptedApi {
    async fn get_run(&self, _run: &RunRef) -> Result<WorkflowRun, ActionError> {
        self.run_fetches.fetch_add(1, Ordering::SeqCst);
        self.run
            .clone()
            .ok_or_else(|| ActionError::transport("GitHub API returned 404 for run: Not Found"))
    }

    async fn list_jobs_page(
        &self,
        _run: &RunRef,
        page: u32,
        per_page: u32,
    ) -> Result<JobsPage, ActionError> {
        self.pages.lock().unwrap().push(page);
        let start = ((page - 1) * per_page) as usize;
        let jobs = self
            .jobs
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect();
        Ok(JobsPage {
            jobs,
            total_count: self.jobs.len(),
        })
    }
}

// ---------------------------------------------------------------------------

pub struct FakeAdapters {
    pub analytics: RecordingAnalytics,
    pub api: Arc<ScriptedApi>,
    pub analytics_created: AtomicUsize,
    pub api_created: AtomicUsize,
}

impl FakeAdapters {
    pub fn new(api: ScriptedApi) -> Self {
        Self::with_analytics(api, RecordingAnalytics::default())
    }

    pub fn with_analytics(api: ScriptedApi, analytics: RecordingAnalytics) -> Self {
        Self {
            analytics,
            api: Arc::new(api),
            analytics_created: AtomicUsize::new(0),
            api_created: AtomicUsize::new(0),
        }
    }
}

impl AdapterFactory for FakeAdapters {
    fn analytics(
        &self,
        _settings: &PostHogSettings,
    ) -> Result<Box<dyn AnalyticsClient>, ActionError> {
        self.analytics_created.fetch_add(1, Ordering::SeqCst);
        let client: Box<dyn AnalyticsClient> = Box::new(self.analytics.clone());
        Ok(client)
    }

    fn workflow_api(
        &self,
        _token: &Credential,
        _context: &ExecutionContext,
    ) -> Result<Arc<dyn WorkflowApi>, ActionError> {
        self.api_created.fetch_add(1, Ordering::SeqCst);
        let api: Arc<dyn WorkflowApi> = self.api.clone();
        Ok(api)
    }
}
