//! Job repository: the source of truth behind the cache.

use crate::job::Job;
use async_trait::async_trait;
use jobboard_cache::ListQuery;
use jobboard_core::{JobBoardError, JobBoardResult, JobId, Page};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Job repository trait.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Finds a job by ID.
    async fn find_by_id(&self, id: JobId) -> JobBoardResult<Option<Job>>;

    /// Finds one page of jobs matching the query's search term, newest first.
    async fn find_page(&self, query: &ListQuery) -> JobBoardResult<Page<Job>>;

    /// Saves a new job.
    async fn save(&self, job: &Job) -> JobBoardResult<Job>;

    /// Updates an existing job.
    async fn update(&self, job: &Job) -> JobBoardResult<Job>;

    /// Deletes a job by ID. Returns false if nothing was deleted.
    async fn delete(&self, id: JobId) -> JobBoardResult<bool>;

    /// Counts all jobs.
    async fn count(&self) -> JobBoardResult<u64>;
}

/// Job repository held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-filled with `jobs`.
    #[must_use]
    pub fn with_jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
        let jobs = jobs.into_iter().map(|job| (job.id, job)).collect();
        Self {
            jobs: RwLock::new(jobs),
        }
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn find_by_id(&self, id: JobId) -> JobBoardResult<Option<Job>> {
        Ok(self.jobs.read().get(&id).cloned())
    }

    async fn find_page(&self, query: &ListQuery) -> JobBoardResult<Page<Job>> {
        let request = query.page_request();
        let mut matching: Vec<Job> = self
            .jobs
            .read()
            .values()
            .filter(|job| job.matches_search(query.search()))
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let content = matching
            .into_iter()
            .skip(request.offset())
            .take(request.limit as usize)
            .collect();

        Ok(Page::new(content, request, total))
    }

    async fn save(&self, job: &Job) -> JobBoardResult<Job> {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&job.id) {
            return Err(JobBoardError::conflict(format!("Job '{}' already exists", job.id)));
        }
        jobs.insert(job.id, job.clone());
        Ok(job.clone())
    }

    async fn update(&self, job: &Job) -> JobBoardResult<Job> {
        let mut jobs = self.jobs.write();
        let Some(stored) = jobs.get_mut(&job.id) else {
            return Err(JobBoardError::not_found("Job", job.id));
        };
        *stored = job.clone();
        Ok(job.clone())
    }

    async fn delete(&self, id: JobId) -> JobBoardResult<bool> {
        Ok(self.jobs.write().remove(&id).is_some())
    }

    async fn count(&self) -> JobBoardResult<u64> {
        Ok(self.jobs.read().len() as u64)
    }
}
