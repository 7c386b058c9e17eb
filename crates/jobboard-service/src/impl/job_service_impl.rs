//! Job service implementation.

use crate::dto::{CreateJobRequest, JobListResponse, JobResponse, UpdateJobRequest};
use crate::job::Job;
use crate::job_service::JobService;
use crate::repository::JobRepository;
use async_trait::async_trait;
use jobboard_cache::{ListQuery, Namespace, QueryCache};
use jobboard_core::{JobBoardError, JobBoardResult, JobId, ValidateExt};
use jobboard_resilience::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Cache namespace for job postings.
pub const JOBS_NAMESPACE: Namespace = Namespace::from_static("jobs");

/// Expiry applied to cached job reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtl {
    /// TTL for paginated listings.
    pub list: Duration,
    /// TTL for single postings.
    pub detail: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            list: Duration::from_secs(300),
            detail: Duration::from_secs(600),
        }
    }
}

/// Job service backed by a repository and a query cache.
///
/// Reads are served cache-aside; every successful write invalidates the whole
/// `jobs` namespace before it returns, so the next read recomputes.
pub struct JobServiceImpl<R: JobRepository> {
    job_repository: Arc<R>,
    cache: QueryCache,
    ttl: CacheTtl,
    retry: RetryPolicy,
}

impl<R: JobRepository> JobServiceImpl<R> {
    /// Creates a new job service.
    pub fn new(job_repository: Arc<R>, cache: QueryCache) -> Self {
        Self {
            job_repository,
            cache,
            ttl: CacheTtl::default(),
            retry: RetryPolicy::fixed(Duration::from_millis(50)).with_max_attempts(3),
        }
    }

    /// Overrides the cache TTLs.
    #[must_use]
    pub fn with_ttl(mut self, ttl: CacheTtl) -> Self {
        self.ttl = ttl;
        self
    }

    /// Overrides the retry policy used for repository reads.
    ///
    /// Only errors for which [`JobBoardError::is_retriable`] holds are retried.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn invalidate(&self) {
        if !self.cache.on_mutated(&JOBS_NAMESPACE).await {
            warn!("Job listings may be stale until their TTL expires");
        }
    }
}

#[async_trait]
impl<R: JobRepository + 'static> JobService for JobServiceImpl<R> {
    async fn list_jobs(&self, query: ListQuery) -> JobBoardResult<JobListResponse> {
        debug!(
            "Listing jobs, page: {}, limit: {}, search: {:?}",
            query.page(),
            query.limit(),
            query.search()
        );

        self.cache
            .fetch_list(&JOBS_NAMESPACE, &query, self.ttl.list, || async {
                let page = self
                    .retry
                    .execute_if(
                        || self.job_repository.find_page(&query),
                        JobBoardError::is_retriable,
                    )
                    .await?;
                Ok(page.map(JobResponse::from))
            })
            .await
    }

    async fn get_job(&self, id: JobId) -> JobBoardResult<JobResponse> {
        debug!("Getting job: {}", id);

        self.cache
            .fetch_detail(&JOBS_NAMESPACE, id, self.ttl.detail, || async {
                let job = self
                    .retry
                    .execute_if(
                        || self.job_repository.find_by_id(id),
                        JobBoardError::is_retriable,
                    )
                    .await?
                    .ok_or_else(|| JobBoardError::not_found("Job", id))?;
                Ok(JobResponse::from(job))
            })
            .await
    }

    async fn create_job(&self, request: CreateJobRequest) -> JobBoardResult<JobResponse> {
        debug!("Creating job: {}", request.title);

        request.validate_request()?;

        let job = Job::new(
            request.title,
            request.company,
            request.location,
            request.description,
            request.employment_type,
            request.salary,
        );

        let saved_job = self.job_repository.save(&job).await?;
        self.invalidate().await;

        info!("Job created: {}", saved_job.id);
        Ok(JobResponse::from(saved_job))
    }

    async fn update_job(&self, id: JobId, request: UpdateJobRequest) -> JobBoardResult<JobResponse> {
        debug!("Updating job: {}", id);

        request.validate_request()?;

        let mut job = self
            .job_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| JobBoardError::not_found("Job", id))?;

        request.apply_to(&mut job);

        let updated_job = self.job_repository.update(&job).await?;
        self.invalidate().await;

        info!("Job updated: {}", id);
        Ok(JobResponse::from(updated_job))
    }

    async fn delete_job(&self, id: JobId) -> JobBoardResult<()> {
        debug!("Deleting job: {}", id);

        let deleted = self.job_repository.delete(id).await?;

        if !deleted {
            return Err(JobBoardError::not_found("Job", id));
        }

        self.invalidate().await;

        info!("Job deleted: {}", id);
        Ok(())
    }
}

impl<R: JobRepository> std::fmt::Debug for JobServiceImpl<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobServiceImpl")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
