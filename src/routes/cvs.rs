use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::cv_dto::{CreateCvPayload, UpdateCvPayload},
    error::Result,
    services::access_control::Caller,
    AppState,
};

pub async fn list_cvs(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse> {
    let cvs = state.cv_service.list(&caller.uid).await?;
    Ok(Json(cvs))
}

pub async fn create_cv(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateCvPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let cv = state.cv_service.create(&caller.uid, payload).await?;
    Ok((StatusCode::CREATED, Json(cv)))
}

pub async fn update_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<UpdateCvPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let cv = state.cv_service.update(id, &caller, payload).await?;
    Ok(Json(cv))
}

pub async fn delete_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse> {
    state.cv_service.delete(id, &caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Owner or linked recruiter gets a short-lived download descriptor; the
/// file itself is served by the object store.
pub async fn download_cv(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse> {
    let download = state.cv_service.download_url(id, &caller).await?;
    Ok(Json(download))
}
