pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::services::{
    application_service::ApplicationService, cv_service::CvService, job_service::JobService,
    notification_service::NotificationService, profile_service::ProfileService,
    push_service::PushService, saved_jobs_service::SavedJobsService,
};
use sqlx::PgPool;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub profile_service: ProfileService,
    pub job_service: JobService,
    pub cv_service: CvService,
    pub saved_jobs_service: SavedJobsService,
    pub application_service: ApplicationService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();

        let push = PushService::from_config(pool.clone(), config);
        let notification_service = NotificationService::new(
            pool.clone(),
            push,
            Duration::from_secs(config.push_timeout_secs),
        );
        let application_service =
            ApplicationService::new(pool.clone(), notification_service.clone());

        Self {
            profile_service: ProfileService::new(pool.clone()),
            job_service: JobService::new(pool.clone()),
            cv_service: CvService::new(pool.clone()),
            saved_jobs_service: SavedJobsService::new(pool.clone()),
            application_service,
            notification_service,
            pool,
        }
    }
}
