use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

use crate::models::verification::{LicenseCheckStatus, VerificationType};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitVerificationPayload {
    #[serde(rename = "type")]
    pub verification_type: VerificationType,
    #[validate(length(min = 4, max = 64))]
    pub identifier: String,
    pub metadata: Option<JsonValue>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionAccepted {
    pub submission_id: Uuid,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LicensePayload {
    #[validate(length(min = 4, max = 64))]
    pub license_number: String,
    #[validate(length(min = 2, max = 120))]
    pub regulatory_body: String,
    #[validate(length(min = 10))]
    pub license_document: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LicenseCheckPayload {
    #[validate(length(min = 4, max = 64))]
    pub license_number: String,
    #[validate(length(min = 2, max = 120))]
    pub regulatory_body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LicenseCheckResponse {
    pub status: LicenseCheckStatus,
    pub notes: String,
}
