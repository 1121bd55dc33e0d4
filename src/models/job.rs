use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Open,
    Closed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Open => "OPEN",
            JobStatus::Closed => "CLOSED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "PENDING",
            ApplicationStatus::Accepted => "ACCEPTED",
            ApplicationStatus::Rejected => "REJECTED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCategory {
    pub id: Uuid,
    pub slug: String,
    pub label: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub budget: Option<i32>,
    pub location: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub remote_friendly: bool,
    pub status: String,
    pub service_category_id: Uuid,
    pub posted_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Job row joined with its category label, poster name and application count.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub budget: Option<i32>,
    pub location: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub remote_friendly: bool,
    pub status: String,
    pub service_category_id: Uuid,
    pub category_label: String,
    pub posted_by_id: Uuid,
    pub poster_first_name: String,
    pub poster_last_name: String,
    pub application_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub cover_letter: Option<String>,
    pub expected_pay: Option<i32>,
    pub status: String,
    pub decision_reason: Option<String>,
    pub reviewed_by_id: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Application joined with the applicant's public details.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationWithApplicant {
    pub id: Uuid,
    pub job_id: Uuid,
    pub applicant_id: Uuid,
    pub cover_letter: Option<String>,
    pub expected_pay: Option<i32>,
    pub status: String,
    pub decision_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub applicant_first_name: String,
    pub applicant_last_name: String,
    pub applicant_email: String,
    pub applicant_verified: bool,
}

/// Application joined with the job it targets.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationWithJob {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub job_status: String,
    pub cover_letter: Option<String>,
    pub expected_pay: Option<i32>,
    pub status: String,
    pub decision_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HireAction {
    pub id: Uuid,
    pub job_id: Option<Uuid>,
    pub application_id: Option<Uuid>,
    pub employer_id: Uuid,
    pub artisan_id: Uuid,
    pub status: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
