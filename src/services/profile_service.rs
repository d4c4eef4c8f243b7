use sqlx::PgPool;

use crate::dto::profile_dto::{CreateProfilePayload, UpdateProfilePayload};
use crate::error::{Error, Result};
use crate::models::profile::{UserProfile, UserRole};

const PROFILE_COLUMNS: &str = "id, user_uid, role, first_name, last_name, email, phone, location, company_name, bio, profile_image_url, created_at, updated_at";

#[derive(Clone)]
pub struct ProfileService {
    pool: PgPool,
}

impl ProfileService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_uid(&self, user_uid: &str) -> Result<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {} FROM user_profiles WHERE user_uid = $1",
            PROFILE_COLUMNS
        ))
        .bind(user_uid)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    pub async fn require_by_uid(&self, user_uid: &str) -> Result<UserProfile> {
        self.get_by_uid(user_uid)
            .await?
            .ok_or_else(|| Error::NotFound("User profile not found".to_string()))
    }

    /// Role lookup for the access-control middlewares. A missing profile is
    /// a NOT_FOUND, never a deny.
    pub async fn role_of(&self, user_uid: &str) -> Result<UserRole> {
        let role = sqlx::query_scalar::<_, UserRole>(
            "SELECT role FROM user_profiles WHERE user_uid = $1",
        )
        .bind(user_uid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("User profile not found".to_string()))?;
        Ok(role)
    }

    pub async fn create(
        &self,
        user_uid: &str,
        token_email: Option<&str>,
        payload: CreateProfilePayload,
    ) -> Result<UserProfile> {
        let email = token_email.unwrap_or(&payload.email);
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            r#"
            INSERT INTO user_profiles (user_uid, role, first_name, last_name, email, phone, location, company_name, bio, profile_image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user_uid)
        .bind(payload.role)
        .bind(&payload.first_name)
        .bind(&payload.last_name)
        .bind(email)
        .bind(payload.phone.as_deref())
        .bind(payload.location.as_deref())
        .bind(payload.company_name.as_deref())
        .bind(payload.bio.as_deref())
        .bind(payload.profile_image_url.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| match err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                Error::Conflict("Profile already exists".to_string())
            }
            other => other.into(),
        })?;
        Ok(profile)
    }

    pub async fn update(
        &self,
        user_uid: &str,
        payload: UpdateProfilePayload,
    ) -> Result<UserProfile> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            r#"
            UPDATE user_profiles
            SET role = COALESCE($2, role),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                location = COALESCE($7, location),
                company_name = COALESCE($8, company_name),
                bio = COALESCE($9, bio),
                profile_image_url = COALESCE($10, profile_image_url),
                updated_at = NOW()
            WHERE user_uid = $1
            RETURNING {}
            "#,
            PROFILE_COLUMNS
        ))
        .bind(user_uid)
        .bind(payload.role)
        .bind(payload.first_name.as_deref())
        .bind(payload.last_name.as_deref())
        .bind(payload.email.as_deref())
        .bind(payload.phone.as_deref())
        .bind(payload.location.as_deref())
        .bind(payload.company_name.as_deref())
        .bind(payload.bio.as_deref())
        .bind(payload.profile_image_url.as_deref())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Profile not found".to_string()))?;
        Ok(profile)
    }
}
