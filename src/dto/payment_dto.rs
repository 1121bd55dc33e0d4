use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use validator::Validate;

use crate::models::user::Profession;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApplyListingPayload {
    pub profession: Profession,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePublicPayload {
    pub profession: Profession,
    #[validate(email)]
    pub email: String,
    #[validate(url)]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyPaymentPayload {
    #[validate(length(min = 5))]
    pub reference: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VerifyPublicPayload {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 5))]
    pub reference: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitResponse {
    pub authorization_url: String,
    pub access_code: Option<String>,
    pub reference: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub reference: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub metadata: Option<JsonValue>,
}
