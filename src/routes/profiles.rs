use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use validator::Validate;

use crate::{
    dto::profile_dto::{CreateProfilePayload, UpdateProfilePayload},
    error::Result,
    middleware::auth::AuthUser,
    AppState,
};

pub async fn get_my_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let profile = state.profile_service.require_by_uid(&user.uid).await?;
    Ok(Json(profile))
}

pub async fn create_my_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateProfilePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let profile = state
        .profile_service
        .create(&user.uid, user.email.as_deref(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn update_my_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<UpdateProfilePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let profile = state.profile_service.update(&user.uid, payload).await?;
    Ok(Json(profile))
}
