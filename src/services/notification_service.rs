use std::time::Duration;

use sqlx::PgPool;
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::device_token::{DevicePlatform, DeviceToken};
use crate::models::notification::{Notification, NotificationKind};
use crate::services::push_service::{PushMessage, PushService};

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_uid: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_job_id: Option<Uuid>,
    pub related_application_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    push: Option<PushService>,
    push_timeout: Duration,
}

impl NotificationService {
    pub fn new(pool: PgPool, push: Option<PushService>, push_timeout: Duration) -> Self {
        Self {
            pool,
            push,
            push_timeout,
        }
    }

    pub fn push_enabled(&self) -> bool {
        self.push.is_some()
    }

    /// Writes the durable in-app record, then hands the push attempt to a
    /// detached task. The record write is the source of truth and its
    /// failure propagates; the push attempt never blocks or fails the
    /// caller.
    pub async fn dispatch(
        &self,
        new: NewNotification,
        extra_data: Vec<(String, String)>,
    ) -> Result<Notification> {
        let record = self.create(&new).await?;

        if let Some(push) = self.push.clone() {
            let message = push_payload(&record, &extra_data);
            let recipient = record.user_uid.clone();
            let notification_id = record.id;
            let timeout = self.push_timeout;
            tokio::spawn(async move {
                match tokio::time::timeout(timeout, push.deliver(&recipient, message)).await {
                    Ok(Ok(result)) => {
                        if !result.success {
                            warn!(
                                notification = %notification_id,
                                recipient = %recipient,
                                reason = result.reason.as_deref().unwrap_or("all sends failed"),
                                "push delivery did not reach any device"
                            );
                        }
                    }
                    Ok(Err(err)) => {
                        error!(
                            notification = %notification_id,
                            recipient = %recipient,
                            error = %err,
                            "push delivery failed"
                        );
                    }
                    Err(_) => {
                        warn!(
                            notification = %notification_id,
                            recipient = %recipient,
                            timeout_secs = timeout.as_secs(),
                            "push delivery timed out"
                        );
                    }
                }
            });
        }

        Ok(record)
    }

    pub async fn create(&self, new: &NewNotification) -> Result<Notification> {
        let record = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_uid, title, message, kind, related_job_id, related_application_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_uid, title, message, kind, related_job_id, related_application_id, is_read, created_at
            "#,
        )
        .bind(&new.user_uid)
        .bind(&new.title)
        .bind(&new.message)
        .bind(new.kind)
        .bind(new.related_job_id)
        .bind(new.related_application_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn list(
        &self,
        user_uid: &str,
        page: i64,
        limit: i64,
        unread_only: bool,
    ) -> Result<(Vec<Notification>, i64)> {
        let page = page.max(1);
        let limit = limit.clamp(1, 100);
        let offset = (page - 1) * limit;

        let unread_filter = if unread_only {
            " AND is_read = FALSE"
        } else {
            ""
        };

        let items_query = format!(
            "SELECT id, user_uid, title, message, kind, related_job_id, related_application_id, is_read, created_at
             FROM notifications
             WHERE user_uid = $1{}
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
            unread_filter
        );
        let items = sqlx::query_as::<_, Notification>(&items_query)
            .bind(user_uid)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        let count_query = format!(
            "SELECT COUNT(*) FROM notifications WHERE user_uid = $1{}",
            unread_filter
        );
        let total = sqlx::query_scalar::<_, i64>(&count_query)
            .bind(user_uid)
            .fetch_one(&self.pool)
            .await?;

        Ok((items, total))
    }

    pub async fn mark_read(
        &self,
        id: Uuid,
        user_uid: &str,
        is_read: bool,
    ) -> Result<Notification> {
        let record = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET is_read = $3
            WHERE id = $1 AND user_uid = $2
            RETURNING id, user_uid, title, message, kind, related_job_id, related_application_id, is_read, created_at
            "#,
        )
        .bind(id)
        .bind(user_uid)
        .bind(is_read)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Notification not found".to_string()))?;
        Ok(record)
    }

    pub async fn mark_all_read(&self, user_uid: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_uid = $1 AND is_read = FALSE",
        )
        .bind(user_uid)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn unread_count(&self, user_uid: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_uid = $1 AND is_read = FALSE",
        )
        .bind(user_uid)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Re-registration of the same device upserts in place, so one device
    /// never accumulates multiple active rows.
    pub async fn register_device(
        &self,
        user_uid: &str,
        token: &str,
        device_id: &str,
        platform: DevicePlatform,
    ) -> Result<DeviceToken> {
        let row = sqlx::query_as::<_, DeviceToken>(
            r#"
            INSERT INTO device_tokens (user_uid, token, device_id, platform, is_active)
            VALUES ($1, $2, $3, $4, TRUE)
            ON CONFLICT (user_uid, device_id) DO UPDATE
            SET token = EXCLUDED.token,
                platform = EXCLUDED.platform,
                is_active = TRUE,
                updated_at = NOW()
            RETURNING id, user_uid, token, device_id, platform, is_active, created_at, updated_at
            "#,
        )
        .bind(user_uid)
        .bind(token)
        .bind(device_id)
        .bind(platform)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn deactivate_device(&self, user_uid: &str, token: &str) -> Result<DeviceToken> {
        let row = sqlx::query_as::<_, DeviceToken>(
            r#"
            UPDATE device_tokens
            SET is_active = FALSE, updated_at = NOW()
            WHERE user_uid = $1 AND token = $2
            RETURNING id, user_uid, token, device_id, platform, is_active, created_at, updated_at
            "#,
        )
        .bind(user_uid)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Device token not found".to_string()))?;
        Ok(row)
    }

    pub async fn list_devices(&self, user_uid: &str) -> Result<Vec<DeviceToken>> {
        let rows = sqlx::query_as::<_, DeviceToken>(
            r#"
            SELECT id, user_uid, token, device_id, platform, is_active, created_at, updated_at
            FROM device_tokens
            WHERE user_uid = $1 AND is_active = TRUE
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_uid)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

fn push_payload(record: &Notification, extra_data: &[(String, String)]) -> PushMessage {
    let mut message = PushMessage::new(record.title.clone(), record.message.clone())
        .with_data("type", record.kind.as_str());
    if let Some(job_id) = record.related_job_id {
        message = message.with_data("job_id", job_id);
    }
    if let Some(application_id) = record.related_application_id {
        message = message.with_data("application_id", application_id);
    }
    for (key, value) in extra_data {
        message = message.with_data(key, value);
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_payload_carries_kind_related_ids_and_extras() {
        let job_id = Uuid::new_v4();
        let application_id = Uuid::new_v4();
        let record = Notification {
            id: Uuid::new_v4(),
            user_uid: "u1".to_string(),
            title: "Application Shortlisted!".to_string(),
            message: "Great news!".to_string(),
            kind: NotificationKind::ApplicationUpdate,
            related_job_id: Some(job_id),
            related_application_id: Some(application_id),
            is_read: false,
            created_at: None,
        };

        let message = push_payload(
            &record,
            &[
                ("job_title".to_string(), "Backend Engineer".to_string()),
                ("status".to_string(), "shortlisted".to_string()),
            ],
        );

        assert_eq!(message.title, "Application Shortlisted!");
        assert_eq!(
            message.data.get("type").map(String::as_str),
            Some("application_update")
        );
        assert_eq!(message.data.get("job_id"), Some(&job_id.to_string()));
        assert_eq!(
            message.data.get("application_id"),
            Some(&application_id.to_string())
        );
        assert_eq!(
            message.data.get("status").map(String::as_str),
            Some("shortlisted")
        );
    }
}
