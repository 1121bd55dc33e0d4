use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Inactive,
    Trial,
    Active,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Inactive => "INACTIVE",
            SubscriptionStatus::Trial => "TRIAL",
            SubscriptionStatus::Active => "ACTIVE",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmployerProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company_name: Option<String>,
    pub verified_badge: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ArtisanProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_category_id: Option<Uuid>,
    pub subscription_status: String,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub verified_badge: bool,
    pub hire_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Artisan profile joined with the owner's name for provider listings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProviderListing {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub service_category_id: Option<Uuid>,
    pub subscription_status: String,
    pub verified_badge: bool,
    pub hire_count: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub profession: String,
    pub license_number: Option<String>,
    pub regulatory_body: Option<String>,
    #[serde(skip_serializing)]
    pub license_document: Option<String>,
    pub license_verified: bool,
    pub license_last_checked_at: Option<DateTime<Utc>>,
    pub license_check_status: Option<String>,
    pub profile_image_url: Option<String>,
    pub profile_completion: i32,
    pub completion_audited_at: Option<DateTime<Utc>>,
    pub subscription_status: String,
    pub verified_badge: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
