use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewApplication,
    ApplicationUpdate,
    JobAlert,
    General,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewApplication => "new_application",
            NotificationKind::ApplicationUpdate => "application_update",
            NotificationKind::JobAlert => "job_alert",
            NotificationKind::General => "general",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_uid: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_job_id: Option<Uuid>,
    pub related_application_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: Option<DateTime<Utc>>,
}
