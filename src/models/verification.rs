use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationType {
    Nin,
    DriversLicense,
    InternationalPassport,
}

impl VerificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationType::Nin => "NIN",
            VerificationType::DriversLicense => "DRIVERS_LICENSE",
            VerificationType::InternationalPassport => "INTERNATIONAL_PASSPORT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseCheckStatus {
    Verified,
    Failed,
}

impl LicenseCheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LicenseCheckStatus::Verified => "VERIFIED",
            LicenseCheckStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSubmission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub verification_type: String,
    pub identifier: String,
    pub metadata: Option<JsonValue>,
    pub status: String,
    pub external_ref: Option<String>,
    pub provider_response: Option<JsonValue>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LicenseAudit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub license_number: String,
    pub regulatory_body: String,
    pub status: String,
    pub notes: Option<String>,
    pub checked_by: String,
    pub created_at: DateTime<Utc>,
}
