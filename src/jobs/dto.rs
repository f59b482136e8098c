use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::jobs::repo::Job;
use crate::jobs::schema::RequirementsSchema;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub description: String,
    pub location: String,
    pub salary_range: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    #[serde(default)]
    pub requirements_schema: RequirementsSchema,
}

/// Partial update: absent (or null) fields keep their stored value. A field
/// can be overwritten but not cleared back to null; in particular
/// `salary_range`, once set, can only be replaced.
#[derive(Debug, Deserialize)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub deadline: Option<OffsetDateTime>,
    pub requirements_schema: Option<RequirementsSchema>,
}

#[derive(Debug, Deserialize)]
pub struct JobSearch {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: Uuid,
    pub recruiter: Uuid,
    pub recruiter_email: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub salary_range: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub deadline: OffsetDateTime,
    pub requirements_schema: RequirementsSchema,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Job> for JobResponse {
    fn from(j: Job) -> Self {
        Self {
            id: j.id,
            recruiter: j.recruiter_id,
            recruiter_email: j.recruiter_email,
            title: j.title,
            description: j.description,
            location: j.location,
            salary_range: j.salary_range,
            deadline: j.deadline,
            requirements_schema: j.requirements_schema.0,
            created_at: j.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_defaults_empty_schema() {
        let req: CreateJobRequest = serde_json::from_value(json!({
            "title": "Backend Engineer",
            "description": "Rust services",
            "location": "Remote",
            "deadline": "2026-12-31T00:00:00Z"
        }))
        .unwrap();
        assert!(req.requirements_schema.questions.is_empty());
        assert!(req.salary_range.is_none());
    }

    #[test]
    fn create_request_parses_schema_questions() {
        let req: CreateJobRequest = serde_json::from_value(json!({
            "title": "Backend Engineer",
            "description": "Rust services",
            "location": "Remote",
            "deadline": "2026-12-31T00:00:00Z",
            "requirements_schema": {
                "questions": [{"id": "q1", "text": "Why apply?", "required": true}]
            }
        }))
        .unwrap();
        assert_eq!(req.requirements_schema.questions.len(), 1);
        assert_eq!(req.requirements_schema.questions[0].id, "q1");
    }
}
