use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCvPayload {
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(url)]
    pub file_url: String,
    pub file_size: Option<i64>,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateCvPayload {
    #[validate(length(min = 1, max = 255))]
    pub file_name: Option<String>,
    pub is_primary: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvDownloadResponse {
    pub download_url: String,
    pub expires_at: DateTime<Utc>,
    pub file_name: String,
    pub file_size: i64,
}
