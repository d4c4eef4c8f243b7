pub mod access_control;
pub mod application_service;
pub mod cv_service;
pub mod job_service;
pub mod notification_service;
pub mod profile_service;
pub mod push_service;
pub mod saved_jobs_service;
