use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "job_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "experience_level", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Entry,
    Mid,
    Senior,
    Executive,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct JobPosting {
    pub id: Uuid,
    pub recruiter_uid: String,
    pub title: String,
    pub description: String,
    pub company_name: String,
    pub location: String,
    pub job_type: JobType,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    pub experience_level: Option<ExperienceLevel>,
    pub industry: Option<String>,
    pub requirements: Option<String>,
    pub benefits: Option<String>,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Slim projection used by the application pipeline when only ownership and
/// the title are needed.
#[derive(Debug, Clone, FromRow)]
pub struct JobSummary {
    pub id: Uuid,
    pub recruiter_uid: String,
    pub title: String,
}
