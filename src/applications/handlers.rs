use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    applications::{
        dto::{ApplicationFilter, ApplicationResponse, ApplyRequest, UpdateStatusRequest},
        service::{self, ResumeDisposition},
    },
    auth::AuthUser,
    error::ApiError,
    state::AppState,
};

pub fn application_routes() -> Router<AppState> {
    Router::new()
        .route("/applications", get(list_applications).post(apply))
        .route("/applications/:id/update_status", post(update_status))
        .route("/applications/:id/download_resume", get(download_resume))
        .route("/applications/:id/view_resume", get(view_resume))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[instrument(skip(state))]
pub async fn list_applications(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Query(filter): Query<ApplicationFilter>,
) -> Result<Json<Vec<ApplicationResponse>>, ApiError> {
    let items = service::list_for(&state, &principal, filter.job).await?;
    Ok(Json(items))
}

#[instrument(skip(state, payload))]
pub async fn apply(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(payload): Json<ApplyRequest>,
) -> Result<(StatusCode, Json<ApplicationResponse>), ApiError> {
    let created = service::submit(&state, &principal, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state, payload))]
pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let updated = service::set_status(&state, &principal, id, &payload.status).await?;
    Ok(Json(updated))
}

#[instrument(skip(state))]
pub async fn download_resume(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let file = service::fetch_resume(&state, &principal, id, ResumeDisposition::Download).await?;
    resume_response(file, "attachment")
}

#[instrument(skip(state))]
pub async fn view_resume(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let file = service::fetch_resume(&state, &principal, id, ResumeDisposition::Inline).await?;
    resume_response(file, "inline")
}

fn resume_response(
    file: service::ResumeFile,
    disposition: &str,
) -> Result<(HeaderMap, bytes::Bytes), ApiError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        file.content_type
            .parse()
            .map_err(|_| ApiError::Internal(anyhow::anyhow!("bad content type")))?,
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        format!("{}; filename=\"{}\"", disposition, file.filename)
            .parse()
            .map_err(|_| ApiError::Internal(anyhow::anyhow!("bad disposition header")))?,
    );
    Ok((headers, file.bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applications::service::ResumeFile;
    use axum::http::header;

    #[test]
    fn download_sets_attachment_disposition_and_binary_type() {
        let file = ResumeFile {
            bytes: bytes::Bytes::from_static(b"%PDF-"),
            content_type: "application/octet-stream",
            filename: "cv.pdf".into(),
        };
        let (headers, body) = resume_response(file, "attachment").unwrap();
        assert_eq!(
            headers.get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"cv.pdf\""
        );
        assert_eq!(
            headers.get(header::CONTENT_TYPE).unwrap(),
            "application/octet-stream"
        );
        assert_eq!(&body[..], b"%PDF-");
    }

    #[test]
    fn inline_disposition_carries_filename() {
        let file = ResumeFile {
            bytes: bytes::Bytes::from_static(b"%PDF-"),
            content_type: "application/pdf",
            filename: "cv.pdf".into(),
        };
        let (headers, _) = resume_response(file, "inline").unwrap();
        assert_eq!(
            headers.get(header::CONTENT_DISPOSITION).unwrap(),
            "inline; filename=\"cv.pdf\""
        );
        assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "application/pdf");
    }
}
