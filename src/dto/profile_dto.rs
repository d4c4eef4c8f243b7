use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::profile::UserRole;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProfilePayload {
    pub role: UserRole,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub company_name: Option<String>,
    pub bio: Option<String>,
    #[validate(url)]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateProfilePayload {
    pub role: Option<UserRole>,
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub company_name: Option<String>,
    pub bio: Option<String>,
    #[validate(url)]
    pub profile_image_url: Option<String>,
}
