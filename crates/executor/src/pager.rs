//! Page-by-page iteration over the jobs of a workflow run.

use pipeline::{ActionError, JobName, JobRecord, RunRef, WorkflowApi};
use tracing::debug;

/// Page size requested from the platform API (its maximum).
pub const JOBS_PER_PAGE: u32 = 100;

/// Walks the job listing of one run, one page per call.
///
/// Stops after a page that is empty, shorter than [`JOBS_PER_PAGE`], or that
/// brings the number of seen jobs up to the reported total.
pub struct JobPager<'a> {
    api: &'a dyn WorkflowApi,
    run: &'a RunRef,
    next_page: u32,
    seen: usize,
    exhausted: bool,
}

impl<'a> JobPager<'a> {
    /// Starts at the first page of `run`.
    pub fn new(api: &'a dyn WorkflowApi, run: &'a RunRef) -> Self {
        Self {
            api,
            run,
            next_page: 1,
            seen: 0,
            exhausted: false,
        }
    }

    /// Fetches the next page; `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<JobRecord>>, ActionError> {
        if self.exhausted {
            return Ok(None);
        }
        let page = self
            .api
            .list_jobs_page(self.run, self.next_page, JOBS_PER_PAGE)
            .await?;
        debug!(page = self.next_page, jobs = page.jobs.len(), total = page.total_count, "listed jobs");

        self.next_page += 1;
        self.seen += page.jobs.len();
        if page.jobs.len() < JOBS_PER_PAGE as usize || self.seen >= page.total_count {
            self.exhausted = true;
        }
        if page.jobs.is_empty() {
            return Ok(None);
        }
        Ok(Some(page.jobs))
    }

    /// Returns the first job named `name`, fetching no further pages once found.
    pub async fn find(mut self, name: &JobName) -> Result<Option<JobRecord>, ActionError> {
        while let Some(jobs) = self.next_page().await? {
            if let Some(job) = jobs.into_iter().find(|job| &job.name == name) {
                return Ok(Some(job));
            }
        }
        Ok(None)
    }

    /// Collects every job of the run in listing order.
    pub async fn collect_all(mut self) -> Result<Vec<JobRecord>, ActionError> {
        let mut all = Vec::new();
        while let Some(jobs) = self.next_page().await? {
            all.extend(jobs);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{job, run_ref, ScriptedApi};

    fn jobs(count: usize) -> Vec<JobRecord> {
        (0..count).map(|i| job(&format!("job-{i}"), 0, Some(60))).collect()
    }

    #[tokio::test]
    async fn find_stops_at_first_match() {
        let mut listing = jobs(250);
        listing[120] = job("lint", 0, Some(10));
        listing[200] = job("lint", 0, Some(99));
        let api = ScriptedApi::new().with_jobs(listing);
        let run = run_ref();

        let found = JobPager::new(&api, &run)
            .find(&JobName::new("lint").unwrap())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.completed_at, job("lint", 0, Some(10)).completed_at);
        assert_eq!(api.pages_requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn collect_all_reads_every_page_in_order() {
        let api = ScriptedApi::new().with_jobs(jobs(201));
        let run = run_ref();

        let all = JobPager::new(&api, &run).collect_all().await.unwrap();

        assert_eq!(all.len(), 201);
        assert_eq!(all[0].name.as_str(), "job-0");
        assert_eq!(all[200].name.as_str(), "job-200");
        assert_eq!(api.pages_requested(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn exact_multiple_of_page_size_stops_on_total_count() {
        let api = ScriptedApi::new().with_jobs(jobs(200));
        let run = run_ref();

        let all = JobPager::new(&api, &run).collect_all().await.unwrap();

        assert_eq!(all.len(), 200);
        assert_eq!(api.pages_requested(), vec![1, 2]);
    }

    #[tokio::test]
    async fn missing_job_reads_all_pages() {
        let api = ScriptedApi::new().with_jobs(jobs(3));
        let run = run_ref();

        let found = JobPager::new(&api, &run)
            .find(&JobName::new("absent").unwrap())
            .await
            .unwrap();

        assert!(found.is_none());
        assert_eq!(api.pages_requested(), vec![1]);
    }
}
