use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::job_dto::{ApplyPayload, Decision, DecisionPayload};
use crate::error::{Error, Result};
use crate::models::job::{ApplicationStatus, ApplicationWithJob, JobApplication, JobStatus};
use crate::models::user::Role;
use crate::services::job_service::JobService;
use crate::services::notification_service::NotificationService;

const APPLICATION_COLUMNS: &str = "id, job_id, applicant_id, cover_letter, expected_pay, status, \
    decision_reason, reviewed_by_id, reviewed_at, created_at, updated_at";

#[derive(Clone)]
pub struct ApplicationService {
    pool: PgPool,
    jobs: JobService,
    notifications: NotificationService,
}

impl ApplicationService {
    pub fn new(pool: PgPool, jobs: JobService, notifications: NotificationService) -> Self {
        Self {
            pool,
            jobs,
            notifications,
        }
    }

    pub async fn apply(&self, applicant_id: Uuid, payload: ApplyPayload) -> Result<JobApplication> {
        let job = match self.jobs.get(payload.job_id).await {
            Ok(job) if job.status == JobStatus::Open.as_str() => job,
            Ok(_) | Err(Error::NotFound(_)) => {
                return Err(Error::NotFound("Job is no longer open".to_string()))
            }
            Err(e) => return Err(e),
        };

        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM job_applications WHERE job_id = $1 AND applicant_id = $2)",
        )
        .bind(job.id)
        .bind(applicant_id)
        .fetch_one(&self.pool)
        .await?;
        if already {
            return Err(Error::Conflict("You already applied for this job".to_string()));
        }

        let sql = format!(
            r#"
            INSERT INTO job_applications (job_id, applicant_id, cover_letter, expected_pay)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (job_id, applicant_id) DO NOTHING
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        // a concurrent duplicate loses the race on the unique index and gets no row back
        let application = sqlx::query_as::<_, JobApplication>(&sql)
            .bind(job.id)
            .bind(applicant_id)
            .bind(payload.cover_letter)
            .bind(payload.expected_pay)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::Conflict("You already applied for this job".to_string()))?;

        self.notifications
            .notify_quietly(
                job.posted_by_id,
                "New job application",
                "A worker has applied to your job. Review their profile now.",
                Some(json!({"jobId": job.id, "applicationId": application.id})),
            )
            .await;

        Ok(application)
    }

    pub async fn decide(
        &self,
        application_id: Uuid,
        reviewer_id: Uuid,
        reviewer_role: Option<Role>,
        payload: DecisionPayload,
    ) -> Result<JobApplication> {
        let sql = format!("SELECT {} FROM job_applications WHERE id = $1", APPLICATION_COLUMNS);
        let application = sqlx::query_as::<_, JobApplication>(&sql)
            .bind(application_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;
        let job = self.jobs.get(application.job_id).await?;

        if job.posted_by_id != reviewer_id && reviewer_role != Some(Role::Admin) {
            return Err(Error::Forbidden(
                "You can only act on your own job applications".to_string(),
            ));
        }
        if application.status != ApplicationStatus::Pending.as_str() {
            return Err(Error::Conflict("Application already decided".to_string()));
        }

        let status = payload.decision.resulting_status();
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            r#"
            UPDATE job_applications
            SET status = $2, decision_reason = $3, reviewed_by_id = $4, reviewed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        );
        let updated = sqlx::query_as::<_, JobApplication>(&sql)
            .bind(application.id)
            .bind(status.as_str())
            .bind(payload.reason.as_deref())
            .bind(reviewer_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::Conflict("Application already decided".to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO hire_actions (job_id, application_id, employer_id, artisan_id, status, note)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(job.id)
        .bind(application.id)
        .bind(reviewer_id)
        .bind(application.applicant_id)
        .bind(status.as_str())
        .bind(payload.reason.as_deref())
        .execute(&mut *tx)
        .await?;

        if payload.decision == Decision::Accept {
            sqlx::query(
                "UPDATE artisan_profiles SET hire_count = hire_count + 1, updated_at = NOW() WHERE user_id = $1",
            )
            .bind(application.applicant_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        let (title, message) = match payload.decision {
            Decision::Accept => (
                "Congratulations! Your application was accepted",
                format!("You were accepted for the role {}.", job.title),
            ),
            Decision::Reject => (
                "Update on your application",
                format!("Your application for {} was declined.", job.title),
            ),
        };
        self.notifications
            .notify_quietly(application.applicant_id, title, &message, Some(json!({"jobId": job.id})))
            .await;

        Ok(updated)
    }

    pub async fn list_for_applicant(&self, applicant_id: Uuid, limit: i64) -> Result<Vec<ApplicationWithJob>> {
        let rows = sqlx::query_as::<_, ApplicationWithJob>(
            r#"
            SELECT a.id, a.job_id, j.title AS job_title, j.status AS job_status, a.cover_letter,
                   a.expected_pay, a.status, a.decision_reason, a.created_at
            FROM job_applications a
            JOIN jobs j ON j.id = a.job_id
            WHERE a.applicant_id = $1
            ORDER BY a.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(applicant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
