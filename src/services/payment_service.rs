use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::dto::payment_dto::{
    ApplyListingPayload, InitiatePublicPayload, PaymentInitResponse, VerifyPublicPayload,
    WebhookEvent,
};
use crate::error::{Error, Result};
use crate::models::payment::PayoutRequest;
use crate::models::user::Profession;
use crate::services::payment_gateway::{InitializeTransaction, InitializedTransaction, PaymentGateway};
use crate::services::notification_service::NotificationService;
use crate::utils::signature::verify_paystack_signature;
use crate::utils::token::listing_reference;
use crate::utils::validation::normalize_email;

/// Professional listing fee in kobo.
pub const LISTING_FEE: i64 = 100_000;
/// Wallet credit granted once a listing payment settles, in kobo.
pub const LISTING_WALLET_CREDIT: i64 = 250_000;
const COMPANY_SHARE: i64 = 500;
const PROVIDER_SHARE: i64 = 2500;
const LISTING_REFERENCE_PREFIX: &str = "PRO-";

const PAYOUT_COLUMNS: &str =
    "id, user_id, reference, amount, profession, status, metadata, created_at, updated_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Credited { balance: i64 },
    AlreadySettled,
}

#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
    notifications: NotificationService,
}

impl PaymentService {
    pub fn new(
        pool: PgPool,
        gateway: Arc<dyn PaymentGateway>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            pool,
            gateway,
            notifications,
        }
    }

    async fn start_listing_payment(
        &self,
        user_id: Uuid,
        profession: Profession,
        email: &str,
        callback_url: Option<String>,
    ) -> Result<(String, InitializedTransaction)> {
        let reference = listing_reference(profession.as_str(), Utc::now());
        let initialized = self
            .gateway
            .initialize(InitializeTransaction {
                email: email.to_string(),
                amount: LISTING_FEE,
                reference: reference.clone(),
                callback_url,
                metadata: Some(listing_metadata(user_id, profession)),
            })
            .await?;
        Ok((reference, initialized))
    }

    pub async fn apply(
        &self,
        user_id: Uuid,
        token_email: Option<&str>,
        payload: ApplyListingPayload,
    ) -> Result<PaymentInitResponse> {
        let email = payload
            .email
            .as_deref()
            .or(token_email)
            .map(normalize_email)
            .ok_or_else(|| Error::BadRequest("An email address is required".to_string()))?;

        let (reference, initialized) = self
            .start_listing_payment(user_id, payload.profession, &email, None)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO payout_requests (user_id, reference, amount, profession, status, metadata)
            VALUES ($1, $2, $3, $4, 'PROCESSING', $5)
            "#,
        )
        .bind(user_id)
        .bind(&reference)
        .bind(LISTING_FEE)
        .bind(payload.profession.as_str())
        .bind(listing_metadata(user_id, payload.profession))
        .execute(&self.pool)
        .await?;

        tracing::info!(%user_id, %reference, "listing payment started");
        Ok(into_response(initialized, reference))
    }

    pub async fn initiate_public(&self, payload: InitiatePublicPayload) -> Result<PaymentInitResponse> {
        let email = normalize_email(&payload.email);
        let user_id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE email = $1 AND role = $2")
                .bind(&email)
                .bind(payload.profession.as_str())
                .fetch_optional(&self.pool)
                .await?;
        let user_id = user_id.ok_or_else(|| {
            Error::NotFound("Professional account not found. Complete registration first.".to_string())
        })?;

        let (reference, initialized) = self
            .start_listing_payment(user_id, payload.profession, &email, payload.callback_url)
            .await?;

        let reused = sqlx::query(
            r#"
            UPDATE payout_requests
            SET reference = $2, amount = $3, updated_at = NOW()
            WHERE id = (
                SELECT id FROM payout_requests
                WHERE user_id = $1 AND status = 'PROCESSING'
                ORDER BY created_at DESC
                LIMIT 1
            )
            "#,
        )
        .bind(user_id)
        .bind(&reference)
        .bind(LISTING_FEE)
        .execute(&self.pool)
        .await?;

        if reused.rows_affected() == 0 {
            sqlx::query(
                r#"
                INSERT INTO payout_requests (user_id, reference, amount, profession, status, metadata)
                VALUES ($1, $2, $3, $4, 'PROCESSING', $5)
                "#,
            )
            .bind(user_id)
            .bind(&reference)
            .bind(LISTING_FEE)
            .bind(payload.profession.as_str())
            .bind(listing_metadata(user_id, payload.profession))
            .execute(&self.pool)
            .await?;
        }

        Ok(into_response(initialized, reference))
    }

    async fn find_request(&self, user_id: Uuid, reference: &str) -> Result<PayoutRequest> {
        let sql = format!(
            "SELECT {} FROM payout_requests WHERE user_id = $1 AND reference = $2",
            PAYOUT_COLUMNS
        );
        sqlx::query_as::<_, PayoutRequest>(&sql)
            .bind(user_id)
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Payment reference not recognized.".to_string()))
    }

    async fn confirm_with_gateway(&self, reference: &str) -> Result<()> {
        let transaction = self.gateway.verify(reference).await?;
        if !transaction.is_success() {
            return Err(Error::Conflict("Payment not successful yet".to_string()));
        }
        Ok(())
    }

    pub async fn verify(&self, user_id: Uuid, reference: &str) -> Result<Settlement> {
        let request = self.find_request(user_id, reference.trim()).await?;
        self.confirm_with_gateway(&request.reference).await?;
        self.settle(&request, false).await
    }

    pub async fn verify_public(&self, payload: VerifyPublicPayload) -> Result<Settlement> {
        let email = normalize_email(&payload.email);
        let user_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;
        let user_id =
            user_id.ok_or_else(|| Error::NotFound("Professional account not found.".to_string()))?;
        let request = self.find_request(user_id, payload.reference.trim()).await?;
        self.confirm_with_gateway(&request.reference).await?;
        self.settle(&request, true).await
    }

    /// Handles a signed gateway callback. Only successful listing charges are settled.
    pub async fn handle_webhook(&self, body: &[u8], signature: &str) -> Result<Option<Settlement>> {
        let secret = &crate::config::get_config().paystack_secret_key;
        if !verify_paystack_signature(body, signature, secret) {
            return Err(Error::Unauthorized("Invalid webhook signature".to_string()));
        }
        let event: WebhookEvent = serde_json::from_slice(body)?;
        if event.event != "charge.success" || !event.data.reference.starts_with(LISTING_REFERENCE_PREFIX) {
            tracing::debug!(event = %event.event, reference = %event.data.reference, "webhook ignored");
            return Ok(None);
        }

        let sql = format!("SELECT {} FROM payout_requests WHERE reference = $1", PAYOUT_COLUMNS);
        let Some(request) = sqlx::query_as::<_, PayoutRequest>(&sql)
            .bind(&event.data.reference)
            .fetch_optional(&self.pool)
            .await?
        else {
            tracing::warn!(reference = %event.data.reference, "webhook for unknown listing reference");
            return Ok(None);
        };
        self.settle(&request, true).await.map(Some)
    }

    /// Marks the request PAID and credits the wallet, once per reference.
    async fn settle(&self, request: &PayoutRequest, activate_listing: bool) -> Result<Settlement> {
        let mut tx = self.pool.begin().await?;
        let transitioned: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE payout_requests
            SET status = 'PAID', updated_at = NOW()
            WHERE id = $1 AND status <> 'PAID'
            RETURNING id
            "#,
        )
        .bind(request.id)
        .fetch_optional(&mut *tx)
        .await?;

        if transitioned.is_none() {
            tx.rollback().await?;
            tracing::info!(reference = %request.reference, "listing payment already settled");
            return Ok(Settlement::AlreadySettled);
        }

        let balance = credit_wallet(
            &mut tx,
            request.user_id,
            LISTING_WALLET_CREDIT,
            &request.reference,
            "Professional listing payment",
        )
        .await?;

        if activate_listing {
            sqlx::query(
                "UPDATE professional_profiles SET subscription_status = 'ACTIVE', updated_at = NOW() WHERE user_id = $1",
            )
            .bind(request.user_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        tracing::info!(user_id = %request.user_id, reference = %request.reference, balance, "listing payment settled");
        self.notifications
            .notify_quietly(
                request.user_id,
                "Professional listing activated",
                "Your professional listing payment was received. Complete your profile to appear in searches.",
                Some(json!({"reference": request.reference})),
            )
            .await;
        Ok(Settlement::Credited { balance })
    }
}

async fn credit_wallet(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: i64,
    reference: &str,
    description: &str,
) -> Result<i64> {
    let (wallet_id, balance): (Uuid, i64) = sqlx::query_as(
        r#"
        INSERT INTO wallets (user_id, balance)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET balance = wallets.balance + EXCLUDED.balance, updated_at = NOW()
        RETURNING id, balance
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .fetch_one(&mut **tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO wallet_transactions (wallet_id, amount, kind, reference, description)
        VALUES ($1, $2, 'CREDIT', $3, $4)
        "#,
    )
    .bind(wallet_id)
    .bind(amount)
    .bind(reference)
    .bind(description)
    .execute(&mut **tx)
    .await?;
    Ok(balance)
}

fn listing_metadata(user_id: Uuid, profession: Profession) -> serde_json::Value {
    json!({
        "userId": user_id,
        "profession": profession.as_str(),
        "companyShare": COMPANY_SHARE,
        "providerShare": PROVIDER_SHARE,
    })
}

fn into_response(initialized: InitializedTransaction, reference: String) -> PaymentInitResponse {
    PaymentInitResponse {
        authorization_url: initialized.authorization_url,
        access_code: initialized.access_code,
        reference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::payment_gateway::{MockPaymentGateway, VerifiedTransaction};

    fn service(gateway: MockPaymentGateway) -> PaymentService {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/sirius_test")
            .expect("lazy pool");
        let notifications = NotificationService::new(pool.clone(), Default::default());
        PaymentService::new(pool, Arc::new(gateway), notifications)
    }

    #[test]
    fn listing_metadata_carries_shares() {
        let user = Uuid::new_v4();
        let metadata = listing_metadata(user, Profession::Lawyer);
        assert_eq!(metadata["profession"], "LAWYER");
        assert_eq!(metadata["companyShare"], 500);
        assert_eq!(metadata["providerShare"], 2500);
    }

    #[tokio::test]
    async fn unsuccessful_gateway_status_is_a_conflict() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_verify().returning(|reference| {
            Ok(VerifiedTransaction {
                status: "abandoned".into(),
                amount: LISTING_FEE,
                reference: reference.to_string(),
                metadata: None,
                gateway_response: None,
                paid_at: None,
            })
        });
        let err = service(gateway)
            .confirm_with_gateway("PRO-DOCTOR-1")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn successful_gateway_status_confirms() {
        let mut gateway = MockPaymentGateway::new();
        gateway.expect_verify().returning(|reference| {
            Ok(VerifiedTransaction {
                status: "success".into(),
                amount: LISTING_FEE,
                reference: reference.to_string(),
                metadata: None,
                gateway_response: Some("Approved".into()),
                paid_at: None,
            })
        });
        assert!(service(gateway).confirm_with_gateway("PRO-DOCTOR-1").await.is_ok());
    }
}
