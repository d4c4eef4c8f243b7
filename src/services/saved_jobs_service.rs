use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::saved_job::{SavedJob, SavedJobWithPosting};

#[derive(Clone)]
pub struct SavedJobsService {
    pool: PgPool,
}

impl SavedJobsService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user_uid: &str) -> Result<Vec<SavedJobWithPosting>> {
        let items = sqlx::query_as::<_, SavedJobWithPosting>(
            r#"
            SELECT s.id, s.job_id, s.created_at,
                   j.title AS job_title, j.company_name, j.location AS job_location,
                   j.job_type, j.salary_min, j.salary_max, j.created_at AS job_created_at
            FROM saved_jobs s
            JOIN job_postings j ON j.id = s.job_id
            WHERE s.user_uid = $1 AND j.is_active = TRUE
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(user_uid)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn save(&self, user_uid: &str, job_id: Uuid) -> Result<SavedJob> {
        let job_exists = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM job_postings WHERE id = $1 AND is_active = TRUE",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        if job_exists.is_none() {
            return Err(Error::NotFound("Job not found or not active".to_string()));
        }

        let saved = sqlx::query_as::<_, SavedJob>(
            r#"
            INSERT INTO saved_jobs (user_uid, job_id)
            VALUES ($1, $2)
            RETURNING id, user_uid, job_id, created_at
            "#,
        )
        .bind(user_uid)
        .bind(job_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                Error::Conflict("Job already saved".to_string())
            }
            other => other.into(),
        })?;
        Ok(saved)
    }

    pub async fn unsave(&self, user_uid: &str, job_id: Uuid) -> Result<()> {
        let deleted = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM saved_jobs WHERE user_uid = $1 AND job_id = $2 RETURNING id",
        )
        .bind(user_uid)
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        if deleted.is_none() {
            return Err(Error::NotFound("Saved job not found".to_string()));
        }
        Ok(())
    }

    pub async fn is_saved(&self, user_uid: &str, job_id: Uuid) -> Result<bool> {
        let saved = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM saved_jobs WHERE user_uid = $1 AND job_id = $2)",
        )
        .bind(user_uid)
        .bind(job_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }
}
