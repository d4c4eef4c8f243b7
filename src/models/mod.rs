pub mod application;
pub mod cv;
pub mod device_token;
pub mod job;
pub mod notification;
pub mod profile;
pub mod saved_job;
