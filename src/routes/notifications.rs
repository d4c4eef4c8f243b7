use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::notification_dto::{
        DeviceSummary, MarkReadPayload, NotificationListQuery, NotificationListResponse,
        RegisterDeviceTokenPayload, UnreadCountResponse,
    },
    dto::Pagination,
    error::Result,
    middleware::auth::AuthUser,
    AppState,
};

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<NotificationListQuery>,
) -> Result<impl IntoResponse> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    let unread_only = query.unread_only.unwrap_or(false);

    let (notifications, total) = state
        .notification_service
        .list(&user.uid, page, limit, unread_only)
        .await?;
    let total_pages = ((total as f64) / (limit as f64)).ceil() as i64;

    Ok(Json(NotificationListResponse {
        notifications,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages,
        },
    }))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<MarkReadPayload>,
) -> Result<impl IntoResponse> {
    let notification = state
        .notification_service
        .mark_read(id, &user.uid, payload.is_read)
        .await?;
    Ok(Json(notification))
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    state.notification_service.mark_all_read(&user.uid).await?;
    Ok(Json(json!({ "message": "All notifications marked as read" })))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let unread_count = state.notification_service.unread_count(&user.uid).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

pub async fn register_device_token(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<RegisterDeviceTokenPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state
        .notification_service
        .register_device(&user.uid, &payload.token, &payload.device_id, payload.platform)
        .await?;
    tracing::info!(
        user = %user.uid,
        device = %payload.device_id,
        "device token registered"
    );
    Ok(Json(json!({ "ok": true })))
}

pub async fn deactivate_device_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    state
        .notification_service
        .deactivate_device(&user.uid, &token)
        .await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn list_device_tokens(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let devices: Vec<DeviceSummary> = state
        .notification_service
        .list_devices(&user.uid)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(devices))
}
