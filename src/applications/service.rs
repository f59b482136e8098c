use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    applications::{
        dto::{ApplicantDetails, ApplicationResponse, ApplyRequest},
        repo::{Application, ApplicationStatus},
    },
    auth::{Principal, Role},
    error::{is_unique_violation, ApiError},
    jobs::repo::Job,
    profiles::repo::SeekerProfile,
    state::AppState,
};

/// Submit an application: resolve the job, check required answers against its
/// schema, insert with status APPLIED, store the optional attachment.
pub async fn submit(
    state: &AppState,
    principal: &Principal,
    req: ApplyRequest,
) -> Result<ApplicationResponse, ApiError> {
    let job = Job::find(&state.db, req.job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Job not found".into()))?;

    job.requirements_schema
        .0
        .check_responses(&req.responses)
        .map_err(ApiError::Validation)?;

    // Attachment goes to the store before the row exists; the key is bound in
    // the same INSERT so an application is never persisted half-written.
    let attachment_key = match req.extra_attachment {
        Some(data) => Some(
            store_attachment(
                state,
                job.id,
                principal.id,
                req.extra_attachment_name.as_deref(),
                Bytes::from(data.into_vec()),
            )
            .await?,
        ),
        None => None,
    };

    let inserted = Application::insert(
        &state.db,
        job.id,
        principal.id,
        &req.responses,
        attachment_key.as_deref(),
    )
    .await;

    let id = match inserted {
        Ok(id) => id,
        Err(e) => {
            // The row never landed, so the uploaded object must not linger
            if let Some(key) = attachment_key.as_deref() {
                if let Err(del) = state.storage.delete_object(key).await {
                    warn!(key = %key, error = %del, "orphaned attachment cleanup failed");
                }
            }
            return Err(if is_unique_violation(&e) {
                warn!(job_id = %job.id, applicant = %principal.id, "duplicate application");
                ApiError::Conflict("You have already applied to this job".into())
            } else {
                ApiError::from(e)
            });
        }
    };

    info!(application_id = %id, job_id = %job.id, applicant = %principal.id, "application created");

    let app = Application::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Application not found".into()))?;
    enrich(state, app).await
}

/// Scoped listing: recruiters see applications to their own jobs, everyone
/// else sees their own submissions.
pub async fn list_for(
    state: &AppState,
    principal: &Principal,
    job_filter: Option<Uuid>,
) -> Result<Vec<ApplicationResponse>, ApiError> {
    let rows = if principal.role == Role::Recruiter {
        Application::list_for_recruiter(&state.db, principal.id, job_filter).await?
    } else {
        Application::list_for_applicant(&state.db, principal.id, job_filter).await?
    };

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(enrich(state, row).await?);
    }
    Ok(out)
}

/// Overwrite the status unconditionally once authorized. No ordering between
/// the four values is enforced.
pub async fn set_status(
    state: &AppState,
    principal: &Principal,
    application_id: Uuid,
    status: &str,
) -> Result<ApplicationResponse, ApiError> {
    let app = Application::find(&state.db, application_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Application not found".into()))?;

    if app.job_recruiter_id != principal.id {
        return Err(ApiError::PermissionDenied("Not authorized".into()));
    }

    let status = ApplicationStatus::parse(status)
        .ok_or_else(|| ApiError::Validation("Invalid status".into()))?;

    Application::set_status(&state.db, application_id, status).await?;
    info!(application_id = %application_id, status = ?status, "application status updated");

    let app = Application::find(&state.db, application_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Application not found".into()))?;
    enrich(state, app).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDisposition {
    Download,
    Inline,
}

pub struct ResumeFile {
    pub bytes: Bytes,
    pub content_type: &'static str,
    pub filename: String,
}

/// Stream the applicant's stored resume. Visible to the job's recruiter and
/// the applicant; a missing profile or resume is a normal not-found, never a
/// server error.
pub async fn fetch_resume(
    state: &AppState,
    principal: &Principal,
    application_id: Uuid,
    mode: ResumeDisposition,
) -> Result<ResumeFile, ApiError> {
    let app = Application::find(&state.db, application_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Application not found".into()))?;

    if app.job_recruiter_id != principal.id && app.applicant_id != principal.id {
        return Err(ApiError::PermissionDenied("Not authorized".into()));
    }

    let resume_key = SeekerProfile::find(&state.db, app.applicant_id)
        .await?
        .and_then(|p| p.resume_key)
        .ok_or_else(|| ApiError::NotFound("No resume found".into()))?;

    let bytes = state
        .storage
        .get_object(&resume_key)
        .await?
        .ok_or_else(|| ApiError::NotFound("No resume found".into()))?;

    let filename = base_name(&resume_key);
    Ok(ResumeFile {
        bytes,
        content_type: resume_content_type(&filename, mode),
        filename,
    })
}

/// Inline viewing infers PDF from the filename; downloads always get the
/// generic binary type.
fn resume_content_type(filename: &str, mode: ResumeDisposition) -> &'static str {
    match mode {
        ResumeDisposition::Inline if filename.to_lowercase().ends_with(".pdf") => {
            "application/pdf"
        }
        _ => "application/octet-stream",
    }
}

fn base_name(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

/// Uploads the attachment under a key derived from the (job, applicant) pair,
/// which is unique per application. Runs before the row insert.
async fn store_attachment(
    state: &AppState,
    job_id: Uuid,
    applicant_id: Uuid,
    name_hint: Option<&str>,
    data: Bytes,
) -> Result<String, ApiError> {
    let name = name_hint
        .map(base_name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "attachment".into());
    let key = format!("application_docs/{}/{}/{}", job_id, applicant_id, name);
    state
        .storage
        .put_object(&key, data, "application/octet-stream")
        .await?;
    Ok(key)
}

/// Read-time projection: job title, applicant email, presigned resume URL and
/// profile summary. Nothing here is stored on the application row.
pub async fn enrich(state: &AppState, app: Application) -> Result<ApplicationResponse, ApiError> {
    let ttl = state.config.storage.presign_ttl_seconds;

    let profile = SeekerProfile::find(&state.db, app.applicant_id).await?;

    let resume_url = match profile.as_ref().and_then(|p| p.resume_key.as_deref()) {
        Some(key) => Some(state.storage.presign_get(key, ttl).await?),
        None => None,
    };

    let applicant_details = match profile {
        Some(p) => {
            let profile_picture = match p.profile_picture_key.as_deref() {
                Some(key) => Some(state.storage.presign_get(key, ttl).await?),
                None => None,
            };
            Some(ApplicantDetails {
                skills: p.skills,
                experience: p.experience,
                education: p.education,
                certifications: p.certifications,
                profile_picture,
            })
        }
        None => None,
    };

    let extra_attachment = match app.extra_attachment_key.as_deref() {
        Some(key) => Some(state.storage.presign_get(key, ttl).await?),
        None => None,
    };

    Ok(ApplicationResponse {
        id: app.id,
        job: app.job_id,
        job_title: app.job_title,
        applicant: app.applicant_id,
        applicant_email: app.applicant_email,
        status: app.status,
        responses: app.responses,
        extra_attachment,
        resume_url,
        applicant_details,
        applied_at: app.applied_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_pdf_detection_is_case_insensitive() {
        assert_eq!(
            resume_content_type("cv.pdf", ResumeDisposition::Inline),
            "application/pdf"
        );
        assert_eq!(
            resume_content_type("CV.PDF", ResumeDisposition::Inline),
            "application/pdf"
        );
        assert_eq!(
            resume_content_type("cv.docx", ResumeDisposition::Inline),
            "application/octet-stream"
        );
    }

    #[test]
    fn download_is_always_generic_binary() {
        assert_eq!(
            resume_content_type("cv.pdf", ResumeDisposition::Download),
            "application/octet-stream"
        );
        assert_eq!(
            resume_content_type("cv.docx", ResumeDisposition::Download),
            "application/octet-stream"
        );
    }

    #[test]
    fn base_name_keeps_only_the_last_segment() {
        assert_eq!(base_name("resumes/abc/cv.pdf"), "cv.pdf");
        assert_eq!(base_name("cv.pdf"), "cv.pdf");
    }

    #[tokio::test]
    async fn attachment_is_stored_before_any_row_exists() {
        let state = AppState::fake();
        let job_id = Uuid::new_v4();
        let applicant_id = Uuid::new_v4();

        let key = store_attachment(
            &state,
            job_id,
            applicant_id,
            Some("docs/cover letter.pdf"),
            Bytes::from_static(b"hello"),
        )
        .await
        .expect("upload to fake storage");

        assert_eq!(
            key,
            format!("application_docs/{}/{}/cover letter.pdf", job_id, applicant_id)
        );
        let stored = state.storage.get_object(&key).await.unwrap();
        assert_eq!(stored.as_deref(), Some(&b"hello"[..]));
    }

    #[tokio::test]
    async fn attachment_name_falls_back_when_hint_is_missing_or_empty() {
        let state = AppState::fake();
        let job_id = Uuid::new_v4();
        let applicant_id = Uuid::new_v4();

        for hint in [None, Some(""), Some("dir/")] {
            let key = store_attachment(&state, job_id, applicant_id, hint, Bytes::new())
                .await
                .unwrap();
            assert!(key.ends_with("/attachment"), "hint {:?} gave {}", hint, key);
        }
    }
}
