use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    dto::saved_job_dto::{SaveJobPayload, SavedCheckResponse},
    error::Result,
    middleware::auth::AuthUser,
    AppState,
};

pub async fn list_saved_jobs(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let saved = state.saved_jobs_service.list(&user.uid).await?;
    Ok(Json(saved))
}

pub async fn save_job(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SaveJobPayload>,
) -> Result<impl IntoResponse> {
    let saved = state
        .saved_jobs_service
        .save(&user.uid, payload.job_id)
        .await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

pub async fn unsave_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    state.saved_jobs_service.unsave(&user.uid, job_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn check_saved(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let is_saved = state.saved_jobs_service.is_saved(&user.uid, job_id).await?;
    Ok(Json(SavedCheckResponse { is_saved }))
}
