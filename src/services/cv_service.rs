use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::cv_dto::{CreateCvPayload, CvDownloadResponse, UpdateCvPayload};
use crate::error::{Error, Result};
use crate::models::cv::Cv;
use crate::models::profile::UserRole;
use crate::services::access_control::{self, Action, Caller, Decision, Resource};

const CV_COLUMNS: &str =
    "id, user_uid, file_name, file_url, file_size, is_primary, created_at, updated_at";

#[derive(Clone)]
pub struct CvService {
    pool: PgPool,
}

impl CvService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user_uid: &str) -> Result<Vec<Cv>> {
        let cvs = sqlx::query_as::<_, Cv>(&format!(
            "SELECT {} FROM cvs WHERE user_uid = $1 ORDER BY created_at DESC",
            CV_COLUMNS
        ))
        .bind(user_uid)
        .fetch_all(&self.pool)
        .await?;
        Ok(cvs)
    }

    pub async fn create(&self, user_uid: &str, payload: CreateCvPayload) -> Result<Cv> {
        if payload.is_primary {
            self.clear_primary(user_uid).await?;
        }

        let cv = sqlx::query_as::<_, Cv>(&format!(
            r#"
            INSERT INTO cvs (user_uid, file_name, file_url, file_size, is_primary)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            CV_COLUMNS
        ))
        .bind(user_uid)
        .bind(&payload.file_name)
        .bind(&payload.file_url)
        .bind(payload.file_size)
        .bind(payload.is_primary)
        .fetch_one(&self.pool)
        .await?;
        Ok(cv)
    }

    pub async fn update(&self, id: Uuid, caller: &Caller, payload: UpdateCvPayload) -> Result<Cv> {
        let existing = self.fetch(id).await?;
        self.ensure_owner_action(caller, &existing, Action::Update)?;

        if payload.is_primary == Some(true) {
            self.clear_primary(&existing.user_uid).await?;
        }

        let cv = sqlx::query_as::<_, Cv>(&format!(
            r#"
            UPDATE cvs
            SET file_name = COALESCE($2, file_name),
                is_primary = COALESCE($3, is_primary),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            CV_COLUMNS
        ))
        .bind(id)
        .bind(payload.file_name.as_deref())
        .bind(payload.is_primary)
        .fetch_one(&self.pool)
        .await?;
        Ok(cv)
    }

    pub async fn delete(&self, id: Uuid, caller: &Caller) -> Result<()> {
        let existing = self.fetch(id).await?;
        self.ensure_owner_action(caller, &existing, Action::Delete)?;

        sqlx::query("DELETE FROM cvs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Owner access, or recruiter access derived from an application that
    /// links this CV to one of the recruiter's jobs.
    pub async fn get_with_access(&self, id: Uuid, caller: &Caller) -> Result<Cv> {
        let cv = self.fetch(id).await?;

        let recruiter_has_application = if cv.user_uid != caller.uid
            && caller.role == UserRole::Recruiter
        {
            sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM applications a
                    JOIN job_postings j ON j.id = a.job_id
                    WHERE a.cv_id = $1 AND j.recruiter_uid = $2
                )
                "#,
            )
            .bind(id)
            .bind(&caller.uid)
            .fetch_one(&self.pool)
            .await?
        } else {
            false
        };

        match access_control::authorize(
            caller,
            Resource::Cv {
                owner_uid: &cv.user_uid,
                recruiter_has_application,
            },
            Action::Download,
        ) {
            Decision::Allow => Ok(cv),
            Decision::Deny("no application linkage") => Err(Error::Forbidden(
                "Access denied. You can only view CVs from applications for your jobs.".to_string(),
            )),
            Decision::Deny(_) => Err(Error::Forbidden("Access denied".to_string())),
        }
    }

    /// Download metadata only; the file itself lives in the object store.
    pub async fn download_url(&self, id: Uuid, caller: &Caller) -> Result<CvDownloadResponse> {
        let cv = self.get_with_access(id, caller).await?;
        Ok(CvDownloadResponse {
            download_url: cv.file_url,
            expires_at: Utc::now() + Duration::hours(1),
            file_name: cv.file_name,
            file_size: cv.file_size.unwrap_or(0),
        })
    }

    async fn fetch(&self, id: Uuid) -> Result<Cv> {
        sqlx::query_as::<_, Cv>(&format!("SELECT {} FROM cvs WHERE id = $1", CV_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("CV not found".to_string()))
    }

    fn ensure_owner_action(&self, caller: &Caller, cv: &Cv, action: Action) -> Result<()> {
        let decision = access_control::authorize(
            caller,
            Resource::Cv {
                owner_uid: &cv.user_uid,
                recruiter_has_application: false,
            },
            action,
        );
        if decision != Decision::Allow {
            return Err(Error::Forbidden(
                "Access denied. You can only manage your own CVs.".to_string(),
            ));
        }
        Ok(())
    }

    async fn clear_primary(&self, user_uid: &str) -> Result<()> {
        sqlx::query("UPDATE cvs SET is_primary = FALSE WHERE user_uid = $1")
            .bind(user_uid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
