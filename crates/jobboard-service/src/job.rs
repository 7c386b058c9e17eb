//! Job posting entity.

use chrono::{DateTime, Utc};
use jobboard_cache::normalize_search;
use jobboard_core::JobId;
use serde::{Deserialize, Serialize};

/// Kind of employment offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    #[default]
    FullTime,
    PartTime,
    Contract,
    Internship,
}

/// Yearly salary range in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: u32,
    pub max: u32,
}

/// A job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
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

impl Job {
    /// Creates a new posting with a fresh ID.
    pub fn new(
        title: String,
        company: String,
        location: String,
        description: String,
        employment_type: EmploymentType,
        salary: Option<SalaryRange>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            title,
            company,
            location,
            description,
            employment_type,
            salary,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if the posting matches a free-text search.
    ///
    /// The term is normalized the same way list cache keys are, so a cached
    /// page and a fresh query always agree on what matches. An empty term
    /// matches everything.
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        let term = normalize_search(term);
        if term.is_empty() {
            return true;
        }

        [&self.title, &self.company, &self.location]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }

    /// Marks the posting as modified.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(
            "Senior Rust Engineer".to_string(),
            "Ferrous Systems".to_string(),
            "Berlin".to_string(),
            "Build things".to_string(),
            EmploymentType::FullTime,
            Some(SalaryRange { min: 80_000, max: 110_000 }),
        )
    }

    #[test]
    fn test_matches_search_fields() {
        let job = job();
        assert!(job.matches_search("rust"));
        assert!(job.matches_search("  FERROUS "));
        assert!(job.matches_search("berlin"));
        assert!(!job.matches_search("python"));
    }

    #[test]
    fn test_empty_search_matches_everything() {
        assert!(job().matches_search(""));
        assert!(job().matches_search("   "));
    }

    #[test]
    fn test_description_is_not_searched() {
        assert!(!job().matches_search("build things"));
    }

    #[test]
    fn test_employment_type_serde() {
        let json = serde_json::to_string(&EmploymentType::PartTime).unwrap();
        assert_eq!(json, "\"part_time\"");
    }

    #[test]
    fn test_touch_advances_updated_at() {
        let mut job = job();
        let before = job.updated_at;
        job.touch();
        assert!(job.updated_at >= before);
        assert_eq!(job.created_at, before);
    }
}
