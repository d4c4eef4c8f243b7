use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::dto::Pagination;
use crate::models::device_token::{DevicePlatform, DeviceToken};
use crate::models::notification::Notification;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct NotificationListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub unread_only: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadPayload {
    pub is_read: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCountResponse {
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterDeviceTokenPayload {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 1))]
    pub device_id: String,
    #[serde(default = "default_platform")]
    pub platform: DevicePlatform,
}

fn default_platform() -> DevicePlatform {
    DevicePlatform::Android
}

/// Device listing never echoes the raw push token back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub id: Uuid,
    pub device_id: String,
    pub platform: DevicePlatform,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<DeviceToken> for DeviceSummary {
    fn from(value: DeviceToken) -> Self {
        Self {
            id: value.id,
            device_id: value.device_id,
            platform: value.platform,
            is_active: value.is_active,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}
