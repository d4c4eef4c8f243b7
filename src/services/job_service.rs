use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::job_dto::{CreateJobPayload, JobSearchQuery, UpdateJobPayload};
use crate::error::{Error, Result};
use crate::models::job::JobPosting;
use crate::services::access_control::{self, Action, Caller, Decision, Resource};

const JOB_COLUMNS: &str = "id, recruiter_uid, title, description, company_name, location, job_type, salary_min, salary_max, experience_level, industry, requirements, benefits, is_active, created_at, updated_at";

pub struct JobSearchResult {
    pub items: Vec<JobPosting>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Clone)]
pub struct JobService {
    pool: PgPool,
}

impl JobService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn search(&self, query: JobSearchQuery) -> Result<JobSearchResult> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut items_builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM job_postings WHERE is_active = TRUE",
            JOB_COLUMNS
        ));
        push_search_filters(&mut items_builder, &query);
        items_builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let items = items_builder
            .build_query_as::<JobPosting>()
            .fetch_all(&self.pool)
            .await?;

        let mut count_builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM job_postings WHERE is_active = TRUE");
        push_search_filters(&mut count_builder, &query);
        let total = count_builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let total_pages = ((total as f64) / (limit as f64)).ceil() as i64;

        Ok(JobSearchResult {
            items,
            total,
            page,
            limit,
            total_pages,
        })
    }

    pub async fn get_active(&self, id: Uuid) -> Result<JobPosting> {
        let job = sqlx::query_as::<_, JobPosting>(&format!(
            "SELECT {} FROM job_postings WHERE id = $1 AND is_active = TRUE",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;
        Ok(job)
    }

    pub async fn get_any(&self, id: Uuid) -> Result<JobPosting> {
        let job = sqlx::query_as::<_, JobPosting>(&format!(
            "SELECT {} FROM job_postings WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;
        Ok(job)
    }

    pub async fn create(&self, recruiter_uid: &str, payload: CreateJobPayload) -> Result<JobPosting> {
        let job = sqlx::query_as::<_, JobPosting>(&format!(
            r#"
            INSERT INTO job_postings (recruiter_uid, title, description, company_name, location, job_type, salary_min, salary_max, experience_level, industry, requirements, benefits)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(recruiter_uid)
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(&payload.company_name)
        .bind(&payload.location)
        .bind(payload.job_type)
        .bind(payload.salary_min)
        .bind(payload.salary_max)
        .bind(payload.experience_level)
        .bind(payload.industry.as_deref())
        .bind(payload.requirements.as_deref())
        .bind(payload.benefits.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(job)
    }

    pub async fn update(
        &self,
        id: Uuid,
        caller: &Caller,
        payload: UpdateJobPayload,
    ) -> Result<JobPosting> {
        let existing = self.get_any(id).await?;
        let decision = access_control::authorize(
            caller,
            Resource::Job {
                recruiter_uid: &existing.recruiter_uid,
            },
            Action::Update,
        );
        if decision != Decision::Allow {
            return Err(Error::Forbidden(
                "Access denied. You can only update your own jobs.".to_string(),
            ));
        }

        let job = sqlx::query_as::<_, JobPosting>(&format!(
            r#"
            UPDATE job_postings
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                company_name = COALESCE($4, company_name),
                location = COALESCE($5, location),
                job_type = COALESCE($6, job_type),
                salary_min = COALESCE($7, salary_min),
                salary_max = COALESCE($8, salary_max),
                experience_level = COALESCE($9, experience_level),
                industry = COALESCE($10, industry),
                requirements = COALESCE($11, requirements),
                benefits = COALESCE($12, benefits),
                is_active = COALESCE($13, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(id)
        .bind(payload.title.as_deref())
        .bind(payload.description.as_deref())
        .bind(payload.company_name.as_deref())
        .bind(payload.location.as_deref())
        .bind(payload.job_type)
        .bind(payload.salary_min)
        .bind(payload.salary_max)
        .bind(payload.experience_level)
        .bind(payload.industry.as_deref())
        .bind(payload.requirements.as_deref())
        .bind(payload.benefits.as_deref())
        .bind(payload.is_active)
        .fetch_one(&self.pool)
        .await?;
        Ok(job)
    }

    pub async fn delete(&self, id: Uuid, caller: &Caller) -> Result<()> {
        let existing = self.get_any(id).await?;
        let decision = access_control::authorize(
            caller,
            Resource::Job {
                recruiter_uid: &existing.recruiter_uid,
            },
            Action::Delete,
        );
        if decision != Decision::Allow {
            return Err(Error::Forbidden(
                "Access denied. You can only delete your own jobs.".to_string(),
            ));
        }

        sqlx::query("DELETE FROM job_postings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

fn push_search_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, query: &JobSearchQuery) {
    if let Some(location) = &query.location {
        builder
            .push(" AND location ILIKE ")
            .push_bind(format!("%{}%", location));
    }
    if let Some(job_type) = query.job_type {
        builder.push(" AND job_type = ").push_bind(job_type);
    }
    if let Some(level) = query.experience_level {
        builder.push(" AND experience_level = ").push_bind(level);
    }
    if let Some(industry) = &query.industry {
        builder
            .push(" AND industry ILIKE ")
            .push_bind(format!("%{}%", industry));
    }
    if let Some(salary_min) = query.salary_min {
        builder.push(" AND salary_min >= ").push_bind(salary_min);
    }
    if let Some(salary_max) = query.salary_max {
        builder.push(" AND salary_max <= ").push_bind(salary_max);
    }
    if let Some(text) = &query.query {
        let pattern = format!("%{}%", text);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR company_name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
