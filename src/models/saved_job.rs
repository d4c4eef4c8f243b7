use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::job::JobType;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SavedJob {
    pub id: Uuid,
    pub user_uid: String,
    pub job_id: Uuid,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SavedJobWithPosting {
    pub id: Uuid,
    pub job_id: Uuid,
    pub created_at: Option<DateTime<Utc>>,
    pub job_title: String,
    pub company_name: String,
    pub job_location: String,
    pub job_type: JobType,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    pub job_created_at: Option<DateTime<Utc>>,
}
