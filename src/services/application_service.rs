use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::dto::application_dto::CreateApplicationPayload;
use crate::error::{Error, Result};
use crate::models::application::{
    Application, ApplicationContext, ApplicationForApplicant, ApplicationForRecruiter,
    ApplicationStatus,
};
use crate::models::job::JobSummary;
use crate::models::notification::NotificationKind;
use crate::services::access_control::{self, Action, Caller, Decision, Resource};
use crate::services::notification_service::{NewNotification, NotificationService};

#[derive(Clone)]
pub struct ApplicationService {
    pool: PgPool,
    notifications: NotificationService,
}

impl ApplicationService {
    pub fn new(pool: PgPool, notifications: NotificationService) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    pub async fn submit(
        &self,
        applicant_uid: &str,
        payload: CreateApplicationPayload,
    ) -> Result<Application> {
        let job = sqlx::query_as::<_, JobSummary>(
            "SELECT id, recruiter_uid, title FROM job_postings WHERE id = $1 AND is_active = TRUE",
        )
        .bind(payload.job_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Job not found or not active".to_string()))?;

        let cv_exists = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM cvs WHERE id = $1 AND user_uid = $2",
        )
        .bind(payload.cv_id)
        .bind(applicant_uid)
        .fetch_optional(&self.pool)
        .await?;
        if cv_exists.is_none() {
            return Err(Error::NotFound(
                "CV not found or does not belong to you".to_string(),
            ));
        }

        let existing = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM applications WHERE job_id = $1 AND applicant_uid = $2",
        )
        .bind(payload.job_id)
        .bind(applicant_uid)
        .fetch_optional(&self.pool)
        .await?;
        if existing.is_some() {
            return Err(Error::Conflict(
                "You have already applied to this job".to_string(),
            ));
        }

        // The unique constraint on (job_id, applicant_uid) backstops the
        // check above under concurrent submissions.
        let application = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (job_id, applicant_uid, cv_id, cover_letter)
            VALUES ($1, $2, $3, $4)
            RETURNING id, job_id, applicant_uid, cv_id, cover_letter, status, applied_at, reviewed_at
            "#,
        )
        .bind(payload.job_id)
        .bind(applicant_uid)
        .bind(payload.cv_id)
        .bind(payload.cover_letter.as_deref())
        .fetch_one(&self.pool)
        .await?;

        self.notifications
            .dispatch(
                NewNotification {
                    user_uid: job.recruiter_uid.clone(),
                    title: "New Job Application".to_string(),
                    message: format!(
                        "A new application has been submitted for the position: {}",
                        job.title
                    ),
                    kind: NotificationKind::NewApplication,
                    related_job_id: Some(job.id),
                    related_application_id: Some(application.id),
                },
                vec![("job_title".to_string(), job.title.clone())],
            )
            .await?;

        Ok(application)
    }

    pub async fn list_for_applicant(
        &self,
        applicant_uid: &str,
    ) -> Result<Vec<ApplicationForApplicant>> {
        let items = sqlx::query_as::<_, ApplicationForApplicant>(
            r#"
            SELECT a.id, a.job_id, a.cv_id, a.cover_letter, a.status, a.applied_at, a.reviewed_at,
                   j.title AS job_title, j.company_name, j.location AS job_location,
                   j.is_active AS job_is_active,
                   c.file_name AS cv_file_name, c.file_url AS cv_file_url
            FROM applications a
            JOIN job_postings j ON j.id = a.job_id
            JOIN cvs c ON c.id = a.cv_id
            WHERE a.applicant_uid = $1
            ORDER BY a.applied_at DESC
            "#,
        )
        .bind(applicant_uid)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn list_for_recruiter(
        &self,
        recruiter_uid: &str,
        job_id: Option<Uuid>,
    ) -> Result<Vec<ApplicationForRecruiter>> {
        let job_filter = if job_id.is_some() {
            " AND a.job_id = $2"
        } else {
            ""
        };
        let sql = format!(
            r#"
            SELECT a.id, a.job_id, a.applicant_uid, a.cv_id, a.cover_letter, a.status,
                   a.applied_at, a.reviewed_at,
                   j.title AS job_title,
                   p.first_name AS applicant_first_name, p.last_name AS applicant_last_name,
                   p.email AS applicant_email, p.phone AS applicant_phone,
                   c.file_name AS cv_file_name, c.file_url AS cv_file_url, c.file_size AS cv_file_size
            FROM applications a
            JOIN job_postings j ON j.id = a.job_id
            LEFT JOIN user_profiles p ON p.user_uid = a.applicant_uid
            JOIN cvs c ON c.id = a.cv_id
            WHERE j.recruiter_uid = $1{}
            ORDER BY a.applied_at DESC
            "#,
            job_filter
        );

        let mut query = sqlx::query_as::<_, ApplicationForRecruiter>(&sql).bind(recruiter_uid);
        if let Some(job_id) = job_id {
            query = query.bind(job_id);
        }
        let items = query.fetch_all(&self.pool).await?;
        Ok(items)
    }

    /// Recruiter-driven status transition. Persists the new status and
    /// `reviewed_at`, then feeds the notification pipeline exactly once.
    pub async fn update_status(
        &self,
        application_id: Uuid,
        caller: &Caller,
        new_status: ApplicationStatus,
    ) -> Result<Application> {
        let ctx = self.fetch_context(application_id).await?;

        let decision = access_control::authorize(
            caller,
            Resource::Application {
                applicant_uid: &ctx.applicant_uid,
                job_recruiter_uid: &ctx.recruiter_uid,
            },
            Action::Update,
        );
        if decision != Decision::Allow || ctx.recruiter_uid != caller.uid {
            return Err(Error::Forbidden(
                "Access denied. You can only update applications for your jobs.".to_string(),
            ));
        }

        self.apply_transition(ctx, new_status).await
    }

    /// Applicant-owned exit from the pipeline; runs the same transition and
    /// notification path as a recruiter-driven change.
    pub async fn withdraw(&self, application_id: Uuid, applicant_uid: &str) -> Result<Application> {
        let ctx = self.fetch_context(application_id).await?;
        if ctx.applicant_uid != applicant_uid {
            return Err(Error::Forbidden(
                "You can only withdraw your own applications".to_string(),
            ));
        }
        self.apply_transition(ctx, ApplicationStatus::Withdrawn).await
    }

    async fn fetch_context(&self, application_id: Uuid) -> Result<ApplicationContext> {
        sqlx::query_as::<_, ApplicationContext>(
            r#"
            SELECT a.id, a.status, a.applicant_uid, a.job_id, j.title AS job_title, j.recruiter_uid
            FROM applications a
            JOIN job_postings j ON j.id = a.job_id
            WHERE a.id = $1
            "#,
        )
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".to_string()))
    }

    async fn apply_transition(
        &self,
        ctx: ApplicationContext,
        new_status: ApplicationStatus,
    ) -> Result<Application> {
        if ctx.status.is_terminal() {
            warn!(
                application = %ctx.id,
                previous = ctx.status.as_str(),
                next = new_status.as_str(),
                "overwriting a terminal application status"
            );
        }

        let application = sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications
            SET status = $2, reviewed_at = NOW()
            WHERE id = $1
            RETURNING id, job_id, applicant_uid, cv_id, cover_letter, status, applied_at, reviewed_at
            "#,
        )
        .bind(ctx.id)
        .bind(new_status)
        .fetch_one(&self.pool)
        .await?;

        let (title, message) = status_notification(new_status, &ctx.job_title);
        self.notifications
            .dispatch(
                NewNotification {
                    user_uid: ctx.applicant_uid.clone(),
                    title,
                    message,
                    kind: NotificationKind::ApplicationUpdate,
                    related_job_id: Some(ctx.job_id),
                    related_application_id: Some(ctx.id),
                },
                vec![
                    ("job_title".to_string(), ctx.job_title.clone()),
                    ("status".to_string(), new_status.as_str().to_string()),
                ],
            )
            .await?;

        Ok(application)
    }
}

/// Total mapping from the target status to the applicant-facing wording.
/// Statuses the product copy leaves unnamed share the generic update line.
pub fn status_notification(status: ApplicationStatus, job_title: &str) -> (String, String) {
    match status {
        ApplicationStatus::UnderReview | ApplicationStatus::Reviewed => (
            "Application Under Review".to_string(),
            format!("Your application for {} is now under review.", job_title),
        ),
        ApplicationStatus::Shortlisted => (
            "Application Shortlisted!".to_string(),
            format!(
                "Great news! Your application for {} has been shortlisted.",
                job_title
            ),
        ),
        ApplicationStatus::InterviewScheduled => (
            "Interview Scheduled".to_string(),
            format!(
                "Congratulations! An interview has been scheduled for {}.",
                job_title
            ),
        ),
        ApplicationStatus::Accepted => (
            "Application Accepted!".to_string(),
            format!(
                "Congratulations! Your application for {} has been accepted.",
                job_title
            ),
        ),
        ApplicationStatus::Rejected => (
            "Application Update".to_string(),
            format!(
                "Your application for {} was not selected this time.",
                job_title
            ),
        ),
        ApplicationStatus::Withdrawn => (
            "Application Withdrawn".to_string(),
            format!("Your application for {} has been withdrawn.", job_title),
        ),
        ApplicationStatus::Pending => (
            "Application Update".to_string(),
            format!("Your application for {} has been updated.", job_title),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_maps_to_exactly_one_notification() {
        let cases = [
            (ApplicationStatus::UnderReview, "Application Under Review"),
            (ApplicationStatus::Reviewed, "Application Under Review"),
            (ApplicationStatus::Shortlisted, "Application Shortlisted!"),
            (ApplicationStatus::InterviewScheduled, "Interview Scheduled"),
            (ApplicationStatus::Accepted, "Application Accepted!"),
            (ApplicationStatus::Rejected, "Application Update"),
            (ApplicationStatus::Withdrawn, "Application Withdrawn"),
            (ApplicationStatus::Pending, "Application Update"),
        ];
        for (status, expected_title) in cases {
            let (title, message) = status_notification(status, "Backend Engineer");
            assert_eq!(title, expected_title, "title for {:?}", status);
            assert!(
                message.contains("Backend Engineer"),
                "message for {:?} should name the job",
                status
            );
        }
    }

    #[test]
    fn unnamed_status_falls_back_to_the_generic_update_line() {
        let (title, message) = status_notification(ApplicationStatus::Pending, "Backend Engineer");
        assert_eq!(title, "Application Update");
        assert_eq!(
            message,
            "Your application for Backend Engineer has been updated."
        );
    }

    #[test]
    fn terminal_statuses_are_the_three_exits() {
        assert!(ApplicationStatus::Accepted.is_terminal());
        assert!(ApplicationStatus::Rejected.is_terminal());
        assert!(ApplicationStatus::Withdrawn.is_terminal());
        assert!(!ApplicationStatus::Pending.is_terminal());
        assert!(!ApplicationStatus::Shortlisted.is_terminal());
    }
}
