use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::job_dto::{CreateJobPayload, JobDetailResponse, JobListQuery};
use crate::error::{Error, Result};
use crate::models::job::{ApplicationWithApplicant, Job, JobListing, JobStatus, ServiceCategory};
use crate::models::user::Role;
use crate::services::notification_service::NotificationService;
use crate::utils::validation::contains_pattern;

const JOB_COLUMNS: &str = "id, title, description, budget, location, city, state, remote_friendly, \
    status, service_category_id, posted_by_id, created_at, updated_at";

const LISTING_SELECT: &str = r#"
    SELECT j.id, j.title, j.description, j.budget, j.location, j.city, j.state, j.remote_friendly,
           j.status, j.service_category_id, c.label AS category_label, j.posted_by_id,
           u.first_name AS poster_first_name, u.last_name AS poster_last_name,
           (SELECT COUNT(*) FROM job_applications a WHERE a.job_id = j.id) AS application_count,
           j.created_at
    FROM jobs j
    JOIN service_categories c ON c.id = j.service_category_id
    JOIN users u ON u.id = j.posted_by_id
"#;

#[derive(Clone)]
pub struct JobService {
    pool: PgPool,
    notifications: NotificationService,
}

impl JobService {
    pub fn new(pool: PgPool, notifications: NotificationService) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    pub async fn list(&self, query: JobListQuery) -> Result<Vec<JobListing>> {
        let mut filters = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(category_id) = query.category_id {
            args.push(category_id.to_string());
            filters.push(format!("j.service_category_id = ${}::uuid", args.len()));
        }
        if let Some(location) = query.location.filter(|l| !l.trim().is_empty()) {
            args.push(contains_pattern(location.trim()));
            filters.push(format!("j.location ILIKE ${}", args.len()));
        }
        if let Some(search) = query.search.filter(|s| !s.trim().is_empty()) {
            args.push(contains_pattern(search.trim()));
            let n = args.len();
            filters.push(format!("(j.title ILIKE ${} OR j.description ILIKE ${})", n, n));
        }
        if let Some(status) = query.status {
            args.push(status.as_str().to_string());
            filters.push(format!("j.status = ${}", args.len()));
        }

        let where_clause = if filters.is_empty() {
            "".to_string()
        } else {
            format!("WHERE {}", filters.join(" AND "))
        };
        let sql = format!(
            "{} {} ORDER BY j.created_at DESC LIMIT 100",
            LISTING_SELECT, where_clause
        );

        let mut statement = sqlx::query_as::<_, JobListing>(&sql);
        for value in &args {
            statement = statement.bind(value);
        }
        let jobs = statement.fetch_all(&self.pool).await?;
        Ok(jobs)
    }

    pub async fn create(&self, poster_id: Uuid, payload: CreateJobPayload) -> Result<Job> {
        let category: Option<ServiceCategory> = sqlx::query_as(
            "SELECT id, slug, label, description, created_at FROM service_categories WHERE id = $1",
        )
        .bind(payload.service_category_id)
        .fetch_optional(&self.pool)
        .await?;
        if category.is_none() {
            return Err(Error::BadRequest("Unknown service category".to_string()));
        }

        let sql = format!(
            r#"
            INSERT INTO jobs (title, description, budget, location, city, state, remote_friendly,
                              service_category_id, posted_by_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            JOB_COLUMNS
        );
        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(payload.title.trim())
            .bind(payload.description.trim())
            .bind(payload.budget)
            .bind(payload.location.trim())
            .bind(payload.city)
            .bind(payload.state)
            .bind(payload.remote_friendly)
            .bind(payload.service_category_id)
            .bind(poster_id)
            .fetch_one(&self.pool)
            .await?;

        let subscribers: Vec<Uuid> = sqlx::query_scalar(
            r#"
            SELECT user_id FROM alert_subscriptions
            WHERE service_category_id = $1 AND is_active = TRUE AND user_id <> $2
            "#,
        )
        .bind(job.service_category_id)
        .bind(poster_id)
        .fetch_all(&self.pool)
        .await?;

        tracing::info!(job_id = %job.id, subscribers = subscribers.len(), "job posted");
        let message = format!("A new {} job was posted in your category.", job.title);
        for user_id in subscribers {
            self.notifications
                .notify_quietly(user_id, "New job opportunity", &message, Some(json!({"jobId": job.id})))
                .await;
        }

        Ok(job)
    }

    pub async fn get(&self, id: Uuid) -> Result<Job> {
        let sql = format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS);
        sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))
    }

    pub async fn detail(&self, id: Uuid) -> Result<JobDetailResponse> {
        let sql = format!("{} WHERE j.id = $1", LISTING_SELECT);
        let job = sqlx::query_as::<_, JobListing>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Job not found".to_string()))?;

        let category = sqlx::query_as::<_, ServiceCategory>(
            "SELECT id, slug, label, description, created_at FROM service_categories WHERE id = $1",
        )
        .bind(job.service_category_id)
        .fetch_optional(&self.pool)
        .await?;

        let applications = sqlx::query_as::<_, ApplicationWithApplicant>(
            r#"
            SELECT a.id, a.job_id, a.applicant_id, a.cover_letter, a.expected_pay, a.status,
                   a.decision_reason, a.created_at,
                   u.first_name AS applicant_first_name, u.last_name AS applicant_last_name,
                   u.email AS applicant_email, u.is_verified AS applicant_verified
            FROM job_applications a
            JOIN users u ON u.id = a.applicant_id
            WHERE a.job_id = $1
            ORDER BY a.created_at DESC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(JobDetailResponse {
            job,
            category,
            applications,
        })
    }

    pub async fn close(&self, id: Uuid, caller_id: Uuid, caller_role: Option<Role>) -> Result<Job> {
        let job = self.get(id).await?;
        if job.posted_by_id != caller_id && caller_role != Some(Role::Admin) {
            return Err(Error::Forbidden("You can only close your own jobs".to_string()));
        }
        let sql = format!(
            "UPDATE jobs SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            JOB_COLUMNS
        );
        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(id)
            .bind(JobStatus::Closed.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(job)
    }

    pub async fn recent_for_poster(&self, poster_id: Uuid) -> Result<Vec<JobListing>> {
        let sql = format!(
            "{} WHERE j.posted_by_id = $1 ORDER BY j.created_at DESC LIMIT 20",
            LISTING_SELECT
        );
        let jobs = sqlx::query_as::<_, JobListing>(&sql)
            .bind(poster_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(jobs)
    }
}
