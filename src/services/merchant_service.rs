use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::auth_dto::{LoginPayload, MerchantAuthResponse, RegisterMerchantPayload};
use crate::error::{Error, Result};
use crate::middleware::auth::issue_merchant_token;
use crate::models::merchant::Merchant;
use crate::services::audit_service::{AuditService, AuthEvent, RequestMeta};
use crate::services::auth_service::LoginOutcome;
use crate::services::lockout::LockoutPolicy;
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::validation::normalize_email;

const MERCHANT_COLUMNS: &str = "id, email, password_hash, business_name, contact_name, phone, \
    instagram, whatsapp, plan, status, failed_login_attempts, locked_until, last_login_at, \
    created_at, updated_at";

pub enum MerchantLogin {
    Success(MerchantAuthResponse),
    Rejected(LoginOutcome),
}

#[derive(Clone)]
pub struct MerchantService {
    pool: PgPool,
    audit: AuditService,
}

impl MerchantService {
    pub fn new(pool: PgPool, audit: AuditService) -> Self {
        Self { pool, audit }
    }

    pub async fn register(
        &self,
        payload: RegisterMerchantPayload,
        meta: &RequestMeta,
    ) -> Result<MerchantAuthResponse> {
        let email = normalize_email(&payload.email);
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM merchants WHERE email = $1)")
                .bind(&email)
                .fetch_one(&self.pool)
                .await?;
        if taken {
            return Err(Error::Conflict("Merchant already registered".to_string()));
        }

        let password_hash = hash_password(&payload.password)?;
        let plan = payload
            .plan
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| "3-month".to_string());
        let sql = format!(
            r#"
            INSERT INTO merchants (email, password_hash, business_name, contact_name, phone, instagram, whatsapp, plan)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            MERCHANT_COLUMNS
        );
        let merchant = sqlx::query_as::<_, Merchant>(&sql)
            .bind(&email)
            .bind(&password_hash)
            .bind(payload.business_name.trim())
            .bind(payload.contact_name)
            .bind(payload.phone)
            .bind(payload.instagram)
            .bind(payload.whatsapp)
            .bind(plan)
            .fetch_one(&self.pool)
            .await?;

        self.audit
            .record(AuthEvent::Registration, None, Some(&email), true, meta, Some(serde_json::json!({"kind": "merchant"})))
            .await;
        let token = issue_merchant_token(merchant.id, &merchant.email)?;
        Ok(MerchantAuthResponse { token, merchant })
    }

    pub async fn login(&self, payload: LoginPayload, meta: &RequestMeta) -> Result<MerchantLogin> {
        let email = normalize_email(&payload.email);
        let policy = LockoutPolicy::from_config();
        let now = Utc::now();

        let sql = format!("SELECT {} FROM merchants WHERE email = $1", MERCHANT_COLUMNS);
        let Some(merchant) = sqlx::query_as::<_, Merchant>(&sql)
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(MerchantLogin::Rejected(LoginOutcome::InvalidCredentials {
                attempts_remaining: None,
            }));
        };

        if let Some(until) = merchant.locked_until.filter(|u| policy.is_locked(Some(*u), now)) {
            return Ok(MerchantLogin::Rejected(LoginOutcome::Locked {
                locked_until: until,
                minutes: policy.minutes_remaining(until, now),
            }));
        }

        if !verify_password(&payload.password, &merchant.password_hash)? {
            let failure = policy.register_failure(merchant.failed_login_attempts, now);
            sqlx::query(
                r#"
                UPDATE merchants
                SET failed_login_attempts = $2, locked_until = COALESCE($3, locked_until), updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(merchant.id)
            .bind(failure.attempts)
            .bind(failure.locked_until)
            .execute(&self.pool)
            .await?;
            self.audit
                .record(AuthEvent::LoginFailed, None, Some(&email), false, meta, Some(serde_json::json!({"kind": "merchant"})))
                .await;
            return Ok(MerchantLogin::Rejected(LoginOutcome::InvalidCredentials {
                attempts_remaining: Some(failure.attempts_remaining),
            }));
        }

        let sql = format!(
            r#"
            UPDATE merchants
            SET failed_login_attempts = 0, locked_until = NULL, last_login_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            MERCHANT_COLUMNS
        );
        let merchant = sqlx::query_as::<_, Merchant>(&sql)
            .bind(merchant.id)
            .fetch_one(&self.pool)
            .await?;
        self.audit
            .record(AuthEvent::LoginSuccess, None, Some(&email), true, meta, Some(serde_json::json!({"kind": "merchant"})))
            .await;

        let token = issue_merchant_token(merchant.id, &merchant.email)?;
        Ok(MerchantLogin::Success(MerchantAuthResponse { token, merchant }))
    }

    pub async fn get(&self, id: Uuid) -> Result<Merchant> {
        let sql = format!("SELECT {} FROM merchants WHERE id = $1", MERCHANT_COLUMNS);
        sqlx::query_as::<_, Merchant>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Merchant not found".to_string()))
    }
}
