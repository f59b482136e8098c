use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};

use crate::{
    auth::AuthUser,
    error::ApiError,
    profiles::{
        dto::{ProfileResponse, UpdateProfileRequest},
        repo::{ProfilePatch, SeekerProfile},
    },
    state::AppState,
    storage::StorageClient,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profiles/me", get(get_profile).put(update_profile))
        .route("/profiles/me/resume", post(upload_resume))
        .route("/profiles/me/picture", post(upload_picture))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

async fn render(state: &AppState, profile: SeekerProfile) -> Result<ProfileResponse, ApiError> {
    let ttl = state.config.storage.presign_ttl_seconds;
    let profile_picture = match &profile.profile_picture_key {
        Some(key) => Some(state.storage.presign_get(key, ttl).await?),
        None => None,
    };
    let resume = match &profile.resume_key {
        Some(key) => Some(state.storage.presign_get(key, ttl).await?),
        None => None,
    };
    Ok(ProfileResponse {
        profile_picture,
        resume,
        skills: profile.skills,
        experience: profile.experience,
        education: profile.education,
        certifications: profile.certifications,
    })
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = SeekerProfile::get_or_create(&state.db, principal.id).await?;
    Ok(Json(render(&state, profile).await?))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    // Resolve-from-principal means no ownership check is needed here
    SeekerProfile::get_or_create(&state.db, principal.id).await?;
    let profile = SeekerProfile::update(
        &state.db,
        principal.id,
        ProfilePatch {
            skills: payload.skills,
            experience: payload.experience,
            education: payload.education,
            certifications: payload.certifications,
        },
    )
    .await?;
    Ok(Json(render(&state, profile).await?))
}

/// First multipart field named `file`; anything else is ignored. A body that
/// fails to decode is reported as such, not as a missing field.
async fn read_upload(mut mp: Multipart) -> Result<(String, String, Bytes), ApiError> {
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(base_name)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ApiError::Validation("file must have a filename".into()))?;
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        return Ok((filename, content_type, data));
    }
    Err(ApiError::Validation("file field is required".into()))
}

fn base_name(name: &str) -> String {
    name.rsplit(['/', '\\']).next().unwrap_or(name).to_string()
}

/// Drops the previously stored object once a replacement is recorded, so a
/// re-upload under a new filename does not orphan the old blob. Cleanup
/// failure is logged and swallowed; the new upload already succeeded.
async fn sweep_replaced(storage: &dyn StorageClient, old_key: Option<&str>, new_key: &str) {
    if let Some(old) = old_key {
        if old != new_key {
            if let Err(e) = storage.delete_object(old).await {
                warn!(key = %old, error = %e, "stale object cleanup failed");
            }
        }
    }
}

#[instrument(skip(state, mp))]
pub async fn upload_resume(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    mp: Multipart,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (filename, content_type, data) = read_upload(mp).await?;
    let existing = SeekerProfile::get_or_create(&state.db, principal.id).await?;

    let key = format!("resumes/{}/{}", principal.id, filename);
    state.storage.put_object(&key, data, &content_type).await?;
    SeekerProfile::set_resume_key(&state.db, principal.id, &key).await?;
    sweep_replaced(state.storage.as_ref(), existing.resume_key.as_deref(), &key).await;

    info!(user_id = %principal.id, key = %key, "resume uploaded");
    let profile = SeekerProfile::get_or_create(&state.db, principal.id).await?;
    Ok(Json(render(&state, profile).await?))
}

#[instrument(skip(state, mp))]
pub async fn upload_picture(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    mp: Multipart,
) -> Result<Json<ProfileResponse>, ApiError> {
    let (filename, content_type, data) = read_upload(mp).await?;
    let existing = SeekerProfile::get_or_create(&state.db, principal.id).await?;

    let key = format!("profile_pics/{}/{}", principal.id, filename);
    state.storage.put_object(&key, data, &content_type).await?;
    SeekerProfile::set_picture_key(&state.db, principal.id, &key).await?;
    sweep_replaced(
        state.storage.as_ref(),
        existing.profile_picture_key.as_deref(),
        &key,
    )
    .await;

    info!(user_id = %principal.id, key = %key, "profile picture uploaded");
    let profile = SeekerProfile::get_or_create(&state.db, principal.id).await?;
    Ok(Json(render(&state, profile).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRequest;
    use axum::http::Request;

    #[test]
    fn base_name_strips_path_components() {
        assert_eq!(base_name("resumes/u1/cv.pdf"), "cv.pdf");
        assert_eq!(base_name("C:\\docs\\cv.pdf"), "cv.pdf");
        assert_eq!(base_name("cv.pdf"), "cv.pdf");
    }

    #[tokio::test]
    async fn read_upload_returns_the_file_field() {
        let body = "--XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"cv.pdf\"\r\n\
            Content-Type: application/pdf\r\n\r\n\
            %PDF-data\r\n\
            --XBOUNDARY--\r\n";
        let req = Request::builder()
            .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
            .body(axum::body::Body::from(body))
            .unwrap();
        let mp = Multipart::from_request(req, &()).await.unwrap();

        let (filename, content_type, data) = read_upload(mp).await.unwrap();
        assert_eq!(filename, "cv.pdf");
        assert_eq!(content_type, "application/pdf");
        assert_eq!(&data[..], b"%PDF-data");
    }

    #[tokio::test]
    async fn read_upload_surfaces_decode_errors_not_missing_field() {
        // Declared boundary never appears in the body
        let req = Request::builder()
            .header("content-type", "multipart/form-data; boundary=XBOUNDARY")
            .body(axum::body::Body::from("this is not a multipart body"))
            .unwrap();
        let mp = Multipart::from_request(req, &()).await.unwrap();

        let err = read_upload(mp).await.unwrap_err();
        match err {
            ApiError::Validation(msg) => {
                assert_ne!(msg, "file field is required");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn sweep_replaced_removes_only_the_old_object() {
        let state = crate::state::AppState::fake();
        state
            .storage
            .put_object("resumes/u1/old.pdf", Bytes::from_static(b"old"), "application/pdf")
            .await
            .unwrap();
        state
            .storage
            .put_object("resumes/u1/new.pdf", Bytes::from_static(b"new"), "application/pdf")
            .await
            .unwrap();

        sweep_replaced(
            state.storage.as_ref(),
            Some("resumes/u1/old.pdf"),
            "resumes/u1/new.pdf",
        )
        .await;

        assert!(state.storage.get_object("resumes/u1/old.pdf").await.unwrap().is_none());
        assert!(state.storage.get_object("resumes/u1/new.pdf").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweep_replaced_keeps_the_object_when_the_key_is_unchanged() {
        let state = crate::state::AppState::fake();
        state
            .storage
            .put_object("resumes/u1/cv.pdf", Bytes::from_static(b"v2"), "application/pdf")
            .await
            .unwrap();

        sweep_replaced(
            state.storage.as_ref(),
            Some("resumes/u1/cv.pdf"),
            "resumes/u1/cv.pdf",
        )
        .await;

        assert!(state.storage.get_object("resumes/u1/cv.pdf").await.unwrap().is_some());
    }
}
