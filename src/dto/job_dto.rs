use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::job::{
    ApplicationStatus, ApplicationWithApplicant, JobListing, JobStatus, ServiceCategory,
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListQuery {
    pub category_id: Option<Uuid>,
    pub location: Option<String>,
    pub search: Option<String>,
    pub status: Option<JobStatus>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobPayload {
    #[validate(length(min = 4, max = 160))]
    pub title: String,
    #[validate(length(min = 20, max = 5000))]
    pub description: String,
    #[validate(range(min = 1))]
    pub budget: Option<i32>,
    #[validate(length(min = 2, max = 160))]
    pub location: String,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub remote_friendly: bool,
    pub service_category_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetailResponse {
    #[serde(flatten)]
    pub job: JobListing,
    pub category: Option<ServiceCategory>,
    pub applications: Vec<ApplicationWithApplicant>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApplyPayload {
    pub job_id: Uuid,
    #[validate(length(min = 20, max = 5000))]
    pub cover_letter: Option<String>,
    #[validate(range(min = 1))]
    pub expected_pay: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn resulting_status(&self) -> ApplicationStatus {
        match self {
            Decision::Accept => ApplicationStatus::Accepted,
            Decision::Reject => ApplicationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DecisionPayload {
    pub decision: Decision,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}
