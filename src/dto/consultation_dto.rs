use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::consultation::{
    ConsultationReview, ConsultationSession, ProfessionalPublic, SessionMessage, SessionReview,
    VerificationMethod, WithdrawalStatus,
};
use crate::models::user::Profession;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeConsultationPayload {
    pub professional_id: Option<Uuid>,
    pub client_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationPaymentResponse {
    pub payment_url: String,
    pub reference: String,
    pub amount: i64,
    pub professional_name: String,
    pub profession: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferenceQuery {
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAccessResponse {
    pub session: ConsultationSession,
    pub client_token: String,
    pub professional: ProfessionalPublic,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessagePayload {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<i64>,
    pub before: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<SessionMessage>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SessionReviewPayload {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(min = 1, max = 500))]
    pub review_text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionWithReview {
    #[serde(flatten)]
    pub session: ConsultationSession,
    pub review: Option<SessionReview>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatistics {
    pub total_sessions: i64,
    pub active_sessions: i64,
    pub completed_sessions: i64,
    pub total_earnings: i64,
    pub average_rating: rust_decimal::Decimal,
    pub total_reviews: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalDashboard {
    pub sessions: Vec<SessionWithReview>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
    pub statistics: SessionStatistics,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfessionalListQuery {
    pub profession: Option<Profession>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateConsultationProfilePayload {
    #[validate(length(min = 3, max = 100))]
    pub specialization: Option<String>,
    #[validate(range(min = 0, max = 99))]
    pub years_of_experience: Option<i32>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyBankPayload {
    #[validate(length(min = 3, max = 10))]
    pub bank_code: String,
    pub account_number: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountPayload {
    #[validate(length(min = 2, max = 120))]
    pub bank_name: String,
    #[validate(length(min = 3, max = 10))]
    pub bank_code: String,
    pub account_number: String,
    #[validate(length(min = 2, max = 120))]
    pub account_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsSummary {
    pub total_earnings: i64,
    pub pending_earnings: i64,
    pub total_withdrawn: i64,
    pub available_to_withdraw: i64,
    pub withdrawal_count: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawPayload {
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalView {
    pub id: Uuid,
    pub amount: i64,
    pub status: String,
    pub bank_name: String,
    pub account_number: String,
    pub reference: String,
    pub failure_reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWithdrawalPayload {
    pub status: WithdrawalStatus,
    #[validate(length(max = 500))]
    pub failure_reason: Option<String>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LicenseUpload {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    #[validate(range(max = 5242880))]
    pub size: u64,
    #[validate(length(min = 20))]
    pub data: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterConsultationProfessionalPayload {
    pub profession: Profession,
    #[validate(length(min = 3, max = 100))]
    pub specialization: String,
    #[validate(length(min = 5, max = 50))]
    pub license_number: String,
    #[validate(length(min = 2, max = 120))]
    pub regulatory_body: String,
    #[validate(range(min = 0, max = 60))]
    pub years_of_experience: i32,
    pub verification_method: VerificationMethod,
    #[validate(url)]
    pub license_document_link: Option<String>,
    #[validate(nested)]
    pub license_document_upload: Option<LicenseUpload>,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ConsultationReviewPayload {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(max = 1000))]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CrossBookPayload {
    #[validate(email)]
    pub professional_email: String,
    pub target_profession: Profession,
    #[validate(length(min = 10, max = 500))]
    pub reason: String,
    pub preferred_date: Option<DateTime<Utc>>,
    #[validate(length(max = 40))]
    pub mode: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalDetail {
    pub professional: ProfessionalPublic,
    pub reviews: Vec<SessionReview>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAccountResponse {
    pub account_name: String,
    pub account_number: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Bank {
    pub name: &'static str,
    pub code: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStatus {
    pub registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub professional: Option<ProfessionalPublic>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalReviews {
    pub average_rating: Option<f64>,
    pub reviews: Vec<ConsultationReview>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedProfessional {
    pub id: Uuid,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossBookResponse {
    pub message: String,
    pub consultation_id: Uuid,
    pub scheduled_for: DateTime<Utc>,
    pub assigned_professional: AssignedProfessional,
}
