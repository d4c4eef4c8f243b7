pub mod application_dto;
pub mod cv_dto;
pub mod job_dto;
pub mod notification_dto;
pub mod profile_dto;
pub mod saved_job_dto;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}
