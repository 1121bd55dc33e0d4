use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::dto::consultation_dto::{
    ConsultationPaymentResponse, InitializeConsultationPayload, SessionAccessResponse,
};
use crate::error::{Error, Result};
use crate::models::consultation::{ConsultationProfessional, ConsultationSession, SenderType};
use crate::services::escrow::{EscrowSplit, CONSULTATION_FEE};
use crate::services::payment_gateway::{InitializeTransaction, PaymentGateway, VerifiedTransaction};
use crate::services::professional_service::PROFESSIONAL_COLUMNS;
use crate::services::session_service::{
    access_response, insert_message, SessionService, SESSION_COLUMNS,
};
use crate::utils::token::{anonymous_client_id, consultation_reference};
use crate::utils::validation::normalize_email;

const SESSION_HOURS: i64 = 24;
const PAYMENT_TYPE: &str = "consultation_payment";

/// Result of verifying a consultation payment.
#[derive(Debug)]
pub enum VerifiedSession {
    /// The reference was already turned into a session.
    Existing(SessionAccessResponse),
    Created(SessionAccessResponse),
}

/// Checks a gateway transaction against the consultation fee and returns the
/// professional it was paid for.
pub fn check_consultation_payment(transaction: &VerifiedTransaction) -> Result<Uuid> {
    if !transaction.is_success() {
        return Err(Error::BadRequest(format!(
            "Payment verification failed: {}",
            transaction.status
        )));
    }
    if transaction.amount != CONSULTATION_FEE {
        return Err(Error::BadRequest("Invalid payment amount".to_string()));
    }
    transaction
        .metadata_str("professionalId")
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| Error::BadRequest("Invalid payment metadata".to_string()))
}

fn welcome_message(professional_name: &str) -> String {
    format!(
        "Consultation session started with {}. This session will end automatically in {} hours.",
        professional_name, SESSION_HOURS
    )
}

#[derive(Clone)]
pub struct ConsultationPaymentService {
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
    sessions: SessionService,
}

impl ConsultationPaymentService {
    pub fn new(pool: PgPool, gateway: Arc<dyn PaymentGateway>, sessions: SessionService) -> Self {
        Self {
            pool,
            gateway,
            sessions,
        }
    }

    async fn professional(&self, id: Uuid) -> Result<ConsultationProfessional> {
        let sql = format!("SELECT {} FROM consultation_professionals WHERE id = $1", PROFESSIONAL_COLUMNS);
        sqlx::query_as::<_, ConsultationProfessional>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Professional not found".to_string()))
    }

    pub async fn initialize(
        &self,
        payload: InitializeConsultationPayload,
    ) -> Result<ConsultationPaymentResponse> {
        let professional_id = payload
            .professional_id
            .ok_or_else(|| Error::BadRequest("Professional ID is required".to_string()))?;
        let email = payload
            .client_email
            .as_deref()
            .map(normalize_email)
            .filter(|email| email.validate_email())
            .ok_or_else(|| Error::BadRequest("Valid client email is required".to_string()))?;

        let professional = self.professional(professional_id).await?;
        if !professional.is_active {
            return Err(Error::BadRequest(
                "Professional is not currently accepting consultations".to_string(),
            ));
        }

        let reference = consultation_reference(Utc::now());
        let callback_url = format!(
            "{}/consultation/verify?reference={}",
            crate::config::get_config().frontend_url.trim_end_matches('/'),
            reference
        );
        let initialized = self
            .gateway
            .initialize(InitializeTransaction {
                email: email.clone(),
                amount: CONSULTATION_FEE,
                reference: reference.clone(),
                callback_url: Some(callback_url),
                metadata: Some(json!({
                    "professionalId": professional.id,
                    "professionalName": professional.name,
                    "profession": professional.profession,
                    "clientEmail": email,
                    "type": PAYMENT_TYPE,
                })),
            })
            .await?;

        tracing::info!(%reference, professional_id = %professional.id, "consultation payment initialized");
        Ok(ConsultationPaymentResponse {
            payment_url: initialized.authorization_url,
            reference,
            amount: CONSULTATION_FEE,
            professional_name: professional.name,
            profession: professional.profession,
        })
    }

    pub async fn verify(&self, reference: Option<&str>) -> Result<VerifiedSession> {
        let reference = reference
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| Error::BadRequest("Payment reference is required".to_string()))?;

        if let Some(existing) = self.sessions.find_by_reference(reference).await? {
            let professional = self.professional(existing.professional_id).await?;
            return Ok(VerifiedSession::Existing(access_response(existing, &professional)?));
        }

        let transaction = self.gateway.verify(reference).await?;
        let professional_id = check_consultation_payment(&transaction)?;
        let professional = self.professional(professional_id).await?;
        if !professional.is_active {
            return Err(Error::BadRequest(
                "Professional is no longer accepting consultations".to_string(),
            ));
        }

        let client_email = transaction.metadata_str("clientEmail").map(normalize_email);
        match self
            .open_session(reference, &professional, client_email)
            .await?
        {
            Some(session) => {
                tracing::info!(
                    session_id = %session.id,
                    %reference,
                    professional_id = %professional.id,
                    "consultation session created"
                );
                Ok(VerifiedSession::Created(access_response(session, &professional)?))
            }
            None => {
                let existing = self
                    .sessions
                    .find_by_reference(reference)
                    .await?
                    .ok_or_else(|| Error::Internal("Session vanished after conflict".to_string()))?;
                Ok(VerifiedSession::Existing(access_response(existing, &professional)?))
            }
        }
    }

    /// Creates the session for a paid reference. Returns `None` when a concurrent
    /// verify already created it.
    async fn open_session(
        &self,
        reference: &str,
        professional: &ConsultationProfessional,
        client_email: Option<String>,
    ) -> Result<Option<ConsultationSession>> {
        let split = EscrowSplit::consultation();
        let started_at = Utc::now();
        let ends_at = started_at + Duration::hours(SESSION_HOURS);

        let mut tx = self.pool.begin().await?;
        let sql = format!(
            r#"
            INSERT INTO consultation_sessions
                (professional_id, client_anonymous_id, client_email, payment_reference,
                 amount, platform_fee, professional_earning, status, started_at, ends_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'active', $8, $9)
            ON CONFLICT (payment_reference) DO NOTHING
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );
        let Some(session) = sqlx::query_as::<_, ConsultationSession>(&sql)
            .bind(professional.id)
            .bind(anonymous_client_id())
            .bind(client_email)
            .bind(reference)
            .bind(split.gross)
            .bind(split.platform_fee)
            .bind(split.professional_share)
            .bind(started_at)
            .bind(ends_at)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        insert_message(&mut tx, session.id, SenderType::System, &welcome_message(&professional.name))
            .await?;
        sqlx::query(
            "UPDATE consultation_professionals SET total_sessions = total_sessions + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(professional.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::payment_gateway::MockPaymentGateway;
    use sqlx::postgres::PgPoolOptions;

    fn transaction(status: &str, amount: i64, metadata: serde_json::Value) -> VerifiedTransaction {
        VerifiedTransaction {
            status: status.into(),
            amount,
            reference: "CONSULT-1700000000000-ABCDEFGH".into(),
            metadata: Some(metadata),
            gateway_response: None,
            paid_at: None,
        }
    }

    #[test]
    fn accepts_a_successful_full_fee_payment() {
        let id = Uuid::new_v4();
        let tx = transaction("success", CONSULTATION_FEE, json!({"professionalId": id.to_string()}));
        assert_eq!(check_consultation_payment(&tx).unwrap(), id);
    }

    #[test]
    fn rejects_unsuccessful_payments_with_the_gateway_status() {
        let tx = transaction("abandoned", CONSULTATION_FEE, json!({}));
        match check_consultation_payment(&tx) {
            Err(Error::BadRequest(msg)) => assert!(msg.contains("abandoned")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_wrong_amounts_and_bad_metadata() {
        let id = Uuid::new_v4().to_string();
        let short = transaction("success", CONSULTATION_FEE - 100, json!({"professionalId": id}));
        assert!(matches!(check_consultation_payment(&short), Err(Error::BadRequest(_))));
        let garbled = transaction("success", CONSULTATION_FEE, json!({"professionalId": "nope"}));
        assert!(matches!(check_consultation_payment(&garbled), Err(Error::BadRequest(_))));
    }

    #[test]
    fn welcome_message_names_the_professional() {
        assert_eq!(
            welcome_message("Dr. Ada Obi"),
            "Consultation session started with Dr. Ada Obi. This session will end automatically in 24 hours."
        );
    }

    #[tokio::test]
    async fn initialize_validates_before_touching_the_gateway() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/sirius_test")
            .unwrap();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_initialize().never();
        let service = ConsultationPaymentService::new(
            pool.clone(),
            Arc::new(gateway),
            SessionService::new(pool),
        );

        let missing_id = service
            .initialize(InitializeConsultationPayload {
                professional_id: None,
                client_email: Some("client@example.com".into()),
            })
            .await;
        assert!(matches!(missing_id, Err(Error::BadRequest(_))));

        let bad_email = service
            .initialize(InitializeConsultationPayload {
                professional_id: Some(Uuid::new_v4()),
                client_email: Some("not-an-email".into()),
            })
            .await;
        assert!(matches!(bad_email, Err(Error::BadRequest(_))));
    }

    #[tokio::test]
    async fn verify_requires_a_reference() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/sirius_test")
            .unwrap();
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_verify().never();
        let service = ConsultationPaymentService::new(
            pool.clone(),
            Arc::new(gateway),
            SessionService::new(pool),
        );
        assert!(matches!(service.verify(Some("  ")).await, Err(Error::BadRequest(_))));
        assert!(matches!(service.verify(None).await, Err(Error::BadRequest(_))));
    }
}
