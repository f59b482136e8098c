use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::applications::repo::ApplicationStatus;

#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub job_id: Uuid,
    #[serde(default)]
    pub responses: Map<String, Value>,
    /// Raw attachment bytes; stored to the object store when present.
    #[serde(default)]
    pub extra_attachment: Option<serde_bytes::ByteBuf>,
    pub extra_attachment_name: Option<String>,
}

/// Status arrives as a string so an unknown value is a 400, not a
/// deserialization rejection.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationFilter {
    pub job: Option<Uuid>,
}

/// Profile summary joined onto application reads; null when the applicant has
/// no profile.
#[derive(Debug, Serialize)]
pub struct ApplicantDetails {
    pub skills: Value,
    pub experience: Value,
    pub education: Value,
    pub certifications: Value,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub job: Uuid,
    pub job_title: String,
    pub applicant: Uuid,
    pub applicant_email: String,
    pub status: ApplicationStatus,
    pub responses: Value,
    pub extra_attachment: Option<String>,
    pub resume_url: Option<String>,
    pub applicant_details: Option<ApplicantDetails>,
    #[serde(with = "time::serde::rfc3339")]
    pub applied_at: OffsetDateTime,
}
