//! Job DTOs.

use crate::job::{EmploymentType, Job, SalaryRange};
use chrono::{DateTime, Utc};
use jobboard_core::rules::not_blank;
use jobboard_core::{JobId, Page};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Request to post a new job.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_create_salary"))]
pub struct CreateJobRequest {
    #[validate(
        length(min = 3, max = 120, message = "Title must be 3-120 characters"),
        custom(function = "not_blank")
    )]
    pub title: String,

    #[validate(length(min = 1, max = 120, message = "Company must be 1-120 characters"))]
    pub company: String,

    #[validate(length(max = 120))]
    pub location: String,

    #[validate(length(max = 10_000, message = "Description cannot exceed 10000 characters"))]
    pub description: String,

    #[serde(default)]
    pub employment_type: EmploymentType,

    pub salary: Option<SalaryRange>,
}

/// Request to edit an existing job. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_update_salary"))]
pub struct UpdateJobRequest {
    #[validate(
        length(min = 3, max = 120, message = "Title must be 3-120 characters"),
        custom(function = "not_blank")
    )]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 120, message = "Company must be 1-120 characters"))]
    pub company: Option<String>,

    #[validate(length(max = 120))]
    pub location: Option<String>,

    #[validate(length(max = 10_000, message = "Description cannot exceed 10000 characters"))]
    pub description: Option<String>,

    pub employment_type: Option<EmploymentType>,

    pub salary: Option<SalaryRange>,
}

impl UpdateJobRequest {
    /// Applies the present fields to `job`.
    pub fn apply_to(self, job: &mut Job) {
        if let Some(title) = self.title {
            job.title = title;
        }
        if let Some(company) = self.company {
            job.company = company;
        }
        if let Some(location) = self.location {
            job.location = location;
        }
        if let Some(description) = self.description {
            job.description = description;
        }
        if let Some(employment_type) = self.employment_type {
            job.employment_type = employment_type;
        }
        if let Some(salary) = self.salary {
            job.salary = Some(salary);
        }
        job.touch();
    }
}

fn check_salary(salary: Option<&SalaryRange>) -> Result<(), ValidationError> {
    match salary {
        Some(range) if range.min > range.max => {
            let mut err = ValidationError::new("salary_range");
            err.message = Some("Salary minimum cannot exceed maximum".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

fn validate_create_salary(request: &CreateJobRequest) -> Result<(), ValidationError> {
    check_salary(request.salary.as_ref())
}

fn validate_update_salary(request: &UpdateJobRequest) -> Result<(), ValidationError> {
    check_salary(request.salary.as_ref())
}

/// Job response DTO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: JobId,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub employment_type: EmploymentType,
    pub salary: Option<SalaryRange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            title: job.title,
            company: job.company,
            location: job.location,
            description: job.description,
            employment_type: job.employment_type,
            salary: job.salary,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// One page of job postings.
pub type JobListResponse = Page<JobResponse>;
