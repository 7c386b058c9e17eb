//! Job service trait definition.

use crate::dto::{CreateJobRequest, JobListResponse, JobResponse, UpdateJobRequest};
use async_trait::async_trait;
use jobboard_cache::ListQuery;
use jobboard_core::{JobBoardResult, JobId};

/// Job service trait.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Lists one page of jobs, optionally filtered by a search term.
    async fn list_jobs(&self, query: ListQuery) -> JobBoardResult<JobListResponse>;

    /// Gets a job by ID.
    async fn get_job(&self, id: JobId) -> JobBoardResult<JobResponse>;

    /// Posts a new job.
    async fn create_job(&self, request: CreateJobRequest) -> JobBoardResult<JobResponse>;

    /// Edits an existing job.
    async fn update_job(&self, id: JobId, request: UpdateJobRequest) -> JobBoardResult<JobResponse>;

    /// Deletes a job.
    async fn delete_job(&self, id: JobId) -> JobBoardResult<()>;
}
