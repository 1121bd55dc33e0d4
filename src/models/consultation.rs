use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Active,
    Ended,
    Expired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
            SessionStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(SessionStatus::Pending),
            "active" => Some(SessionStatus::Active),
            "ended" => Some(SessionStatus::Ended),
            "expired" => Some(SessionStatus::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    Client,
    Professional,
    System,
}

impl SenderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::Client => "client",
            SenderType::Professional => "professional",
            SenderType::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Failed => "failed",
        }
    }

    /// Statuses a withdrawal may be in before moving to `self`.
    /// Completed and failed payouts are final.
    pub fn allowed_from(&self) -> &'static [&'static str] {
        match self {
            WithdrawalStatus::Pending => &[],
            WithdrawalStatus::Processing => &["pending", "processing"],
            WithdrawalStatus::Completed | WithdrawalStatus::Failed => &["pending", "processing"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationMethod {
    Link,
    Upload,
}

impl VerificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMethod::Link => "LINK",
            VerificationMethod::Upload => "UPLOAD",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationProfessional {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub profession: String,
    pub specialization: String,
    pub license_number: String,
    pub regulatory_body: String,
    pub years_of_experience: i32,
    pub bio: Option<String>,
    pub verification_method: String,
    pub license_document_link: Option<String>,
    #[serde(skip_serializing)]
    pub license_document_upload: Option<JsonValue>,
    pub verification_status: String,
    pub is_verified: bool,
    pub is_active: bool,
    pub rating: Decimal,
    pub total_reviews: i32,
    pub total_sessions: i32,
    pub total_earnings: i64,
    pub bank_name: Option<String>,
    pub bank_code: Option<String>,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub bank_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a professional that are safe to show to anonymous clients.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalPublic {
    pub id: Uuid,
    pub name: String,
    pub profession: String,
    pub specialization: String,
    pub years_of_experience: i32,
    pub bio: Option<String>,
    pub is_verified: bool,
    pub rating: Decimal,
    pub total_reviews: i32,
    pub total_sessions: i32,
}

impl From<&ConsultationProfessional> for ProfessionalPublic {
    fn from(p: &ConsultationProfessional) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            profession: p.profession.clone(),
            specialization: p.specialization.clone(),
            years_of_experience: p.years_of_experience,
            bio: p.bio.clone(),
            is_verified: p.is_verified,
            rating: p.rating,
            total_reviews: p.total_reviews,
            total_sessions: p.total_sessions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationSession {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub client_anonymous_id: String,
    pub client_email: Option<String>,
    pub payment_reference: String,
    pub amount: i64,
    pub platform_fee: i64,
    pub professional_earning: i64,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub ended_by: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub has_unread_messages: bool,
    pub earnings_credited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConsultationSession {
    pub fn status(&self) -> Option<SessionStatus> {
        SessionStatus::parse(&self.status)
    }

    pub fn is_active(&self) -> bool {
        self.status() == Some(SessionStatus::Active)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && now > self.ends_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SessionMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub sender_type: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SessionReview {
    pub id: Uuid,
    pub session_id: Uuid,
    pub professional_id: Uuid,
    pub rating: i32,
    pub review_text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub amount: i64,
    pub status: String,
    pub bank_name: String,
    pub bank_code: String,
    pub account_number: String,
    pub account_name: String,
    pub paystack_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Withdrawal {
    pub fn display_reference(&self) -> String {
        match &self.paystack_reference {
            Some(reference) => reference.clone(),
            None => {
                let id = self.id.simple().to_string();
                format!("WD-{}", id[id.len() - 8..].to_uppercase())
            }
        }
    }
}

/// Scheduled consultation between two platform users (cross-booking).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: Uuid,
    pub client_id: Uuid,
    pub professional_id: Uuid,
    pub topic: String,
    pub mode: Option<String>,
    pub scheduled_for: DateTime<Utc>,
    pub fee: i32,
    pub status: String,
    pub payout_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationReview {
    pub id: Uuid,
    pub consultation_id: Uuid,
    pub professional_id: Uuid,
    pub client_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(status: &str, ends_in_minutes: i64) -> ConsultationSession {
        let now = Utc::now();
        ConsultationSession {
            id: Uuid::new_v4(),
            professional_id: Uuid::new_v4(),
            client_anonymous_id: "anon_abc".into(),
            client_email: None,
            payment_reference: "CONSULT-1".into(),
            amount: 300_000,
            platform_fee: 50_000,
            professional_earning: 250_000,
            status: status.into(),
            started_at: now,
            ends_at: now + Duration::minutes(ends_in_minutes),
            ended_at: None,
            ended_by: None,
            last_message_at: None,
            has_unread_messages: false,
            earnings_credited: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn finished_withdrawals_cannot_be_reopened() {
        for next in [
            WithdrawalStatus::Pending,
            WithdrawalStatus::Processing,
            WithdrawalStatus::Completed,
            WithdrawalStatus::Failed,
        ] {
            assert!(!next.allowed_from().contains(&"completed"));
            assert!(!next.allowed_from().contains(&"failed"));
        }
        assert!(WithdrawalStatus::Completed.allowed_from().contains(&"processing"));
        assert!(WithdrawalStatus::Pending.allowed_from().is_empty());
    }

    #[test]
    fn only_active_sessions_can_be_overdue() {
        let now = Utc::now();
        assert!(session("active", -1).is_overdue(now));
        assert!(!session("active", 10).is_overdue(now));
        assert!(!session("ended", -1).is_overdue(now));
    }

    #[test]
    fn withdrawal_reference_falls_back_to_id_suffix() {
        let now = Utc::now();
        let id = Uuid::parse_str("0f8fad5b-d9cb-469f-a165-70867728950e").unwrap();
        let withdrawal = Withdrawal {
            id,
            professional_id: Uuid::new_v4(),
            amount: 500_000,
            status: "pending".into(),
            bank_name: "Access Bank".into(),
            bank_code: "044".into(),
            account_number: "0123456789".into(),
            account_name: "Ada Obi".into(),
            paystack_reference: None,
            failure_reason: None,
            processed_at: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(withdrawal.display_reference(), "WD-7728950E");
    }
}
