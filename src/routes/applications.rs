use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::application_dto::{
        CreateApplicationPayload, RecruiterApplicationsQuery, UpdateApplicationStatusPayload,
    },
    error::Result,
    services::access_control::Caller,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/applications/me",
    responses(
        (status = 200, description = "Applications submitted by the caller", body = Vec<crate::models::application::ApplicationForApplicant>),
        (status = 403, description = "Job seeker role required")
    )
)]
#[axum::debug_handler]
pub async fn my_applications(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse> {
    let applications = state
        .application_service
        .list_for_applicant(&caller.uid)
        .await?;
    Ok(Json(applications))
}

#[utoipa::path(
    post,
    path = "/api/applications",
    request_body = CreateApplicationPayload,
    responses(
        (status = 201, description = "Application submitted", body = crate::models::application::Application),
        (status = 404, description = "Job or CV not found"),
        (status = 409, description = "Already applied to this job")
    )
)]
#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<CreateApplicationPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let application = state
        .application_service
        .submit(&caller.uid, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

#[utoipa::path(
    get,
    path = "/api/applications/recruiter",
    params(
        ("job_id" = Option<Uuid>, Query, description = "Restrict to one job posting")
    ),
    responses(
        (status = 200, description = "Applications to the caller's jobs", body = Vec<crate::models::application::ApplicationForRecruiter>),
        (status = 403, description = "Recruiter role required")
    )
)]
#[axum::debug_handler]
pub async fn recruiter_applications(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<RecruiterApplicationsQuery>,
) -> Result<impl IntoResponse> {
    let applications = state
        .application_service
        .list_for_recruiter(&caller.uid, query.job_id)
        .await?;
    Ok(Json(applications))
}

#[utoipa::path(
    patch,
    path = "/api/applications/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = UpdateApplicationStatusPayload,
    responses(
        (status = 200, description = "Status updated", body = crate::models::application::Application),
        (status = 403, description = "Not the owning recruiter"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn update_application_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(caller): Extension<Caller>,
    Json(payload): Json<UpdateApplicationStatusPayload>,
) -> Result<impl IntoResponse> {
    let application = state
        .application_service
        .update_status(id, &caller, payload.status)
        .await?;
    Ok(Json(application))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/withdraw",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    responses(
        (status = 200, description = "Application withdrawn", body = crate::models::application::Application),
        (status = 403, description = "Not the applicant"),
        (status = 404, description = "Application not found")
    )
)]
#[axum::debug_handler]
pub async fn withdraw_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(caller): Extension<Caller>,
) -> Result<impl IntoResponse> {
    let application = state
        .application_service
        .withdraw(id, &caller.uid)
        .await?;
    Ok(Json(application))
}
