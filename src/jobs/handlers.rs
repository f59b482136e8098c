use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{AuthUser, Role},
    error::ApiError,
    jobs::{
        dto::{CreateJobRequest, JobResponse, JobSearch, UpdateJobRequest},
        repo::{Job, JobPatch, NewJob},
    },
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/:id", get(get_job))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/:id", put(update_job).delete(delete_job))
}

/// Public listing; no auth required.
#[instrument(skip(state))]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobSearch>,
) -> Result<Json<Vec<JobResponse>>, ApiError> {
    let jobs = Job::list(&state.db, params.search.as_deref()).await?;
    Ok(Json(jobs.into_iter().map(JobResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = Job::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Job not found".into()))?;
    Ok(Json(job.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_job(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(payload): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    if principal.role != Role::Recruiter {
        warn!(user_id = %principal.id, "non-recruiter tried to post a job");
        return Err(ApiError::PermissionDenied(
            "Only recruiters can post jobs".into(),
        ));
    }

    let job = Job::create(
        &state.db,
        principal.id,
        NewJob {
            title: &payload.title,
            description: &payload.description,
            location: &payload.location,
            salary_range: payload.salary_range.as_deref(),
            deadline: payload.deadline,
            requirements_schema: &payload.requirements_schema,
        },
    )
    .await?;

    info!(job_id = %job.id, recruiter = %principal.id, "job created");
    Ok((StatusCode::CREATED, Json(job.into())))
}

#[instrument(skip(state, payload))]
pub async fn update_job(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJobRequest>,
) -> Result<Json<JobResponse>, ApiError> {
    let job = Job::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Job not found".into()))?;
    if job.recruiter_id != principal.id {
        return Err(ApiError::PermissionDenied(
            "Only the owning recruiter can edit this job".into(),
        ));
    }

    let updated = Job::update(
        &state.db,
        id,
        JobPatch {
            title: payload.title.as_deref(),
            description: payload.description.as_deref(),
            location: payload.location.as_deref(),
            salary_range: payload.salary_range.as_deref(),
            deadline: payload.deadline,
            requirements_schema: payload.requirements_schema.as_ref(),
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Job not found".into()))?;

    Ok(Json(updated.into()))
}

#[instrument(skip(state))]
pub async fn delete_job(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let job = Job::find(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Job not found".into()))?;
    if job.recruiter_id != principal.id {
        return Err(ApiError::PermissionDenied(
            "Only the owning recruiter can delete this job".into(),
        ));
    }

    Job::delete(&state.db, id).await?;
    info!(job_id = %id, recruiter = %principal.id, "job deleted");
    Ok(StatusCode::NO_CONTENT)
}
