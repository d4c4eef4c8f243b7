use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::dto::Pagination;
use crate::models::job::{ExperienceLevel, JobPosting, JobType};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateJobPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(length(min = 1, max = 200))]
    pub company_name: String,
    #[validate(length(min = 1, max = 200))]
    pub location: String,
    pub job_type: JobType,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    pub experience_level: Option<ExperienceLevel>,
    pub industry: Option<String>,
    pub requirements: Option<String>,
    pub benefits: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateJobPayload {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub company_name: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    pub experience_level: Option<ExperienceLevel>,
    pub industry: Option<String>,
    pub requirements: Option<String>,
    pub benefits: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct JobSearchQuery {
    pub query: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<JobType>,
    pub experience_level: Option<ExperienceLevel>,
    pub industry: Option<String>,
    pub salary_min: Option<Decimal>,
    pub salary_max: Option<Decimal>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobListResponse {
    pub jobs: Vec<JobPosting>,
    pub pagination: Pagination,
}

impl From<crate::services::job_service::JobSearchResult> for JobListResponse {
    fn from(value: crate::services::job_service::JobSearchResult) -> Self {
        Self {
            jobs: value.items,
            pagination: Pagination {
                page: value.page,
                limit: value.limit,
                total: value.total,
                total_pages: value.total_pages,
            },
        }
    }
}
