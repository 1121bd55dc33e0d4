use serde_json::Value as JsonValue;
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    LoginSuccess,
    LoginFailed,
    AccountLocked,
    Registration,
    PasswordResetRequested,
    PasswordResetCompleted,
    EmailVerified,
}

impl AuthEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEvent::LoginSuccess => "login_success",
            AuthEvent::LoginFailed => "login_failed",
            AuthEvent::AccountLocked => "account_locked",
            AuthEvent::Registration => "registration",
            AuthEvent::PasswordResetRequested => "password_reset_requested",
            AuthEvent::PasswordResetCompleted => "password_reset_completed",
            AuthEvent::EmailVerified => "email_verified",
        }
    }
}

/// Request metadata recorded alongside auth events.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip: Option<IpNetwork>,
    pub user_agent: Option<String>,
}

#[derive(Clone)]
pub struct AuditService {
    pool: PgPool,
}

impl AuditService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn log(
        &self,
        event: AuthEvent,
        user_id: Option<Uuid>,
        email: Option<&str>,
        success: bool,
        meta: &RequestMeta,
        details: Option<JsonValue>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO auth_audit_logs (user_id, email, event, success, ip_address, user_agent, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user_id)
        .bind(email)
        .bind(event.as_str())
        .bind(success)
        .bind(meta.ip)
        .bind(meta.user_agent.as_deref())
        .bind(details)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Logs the event and persists it without failing the caller.
    pub async fn record(
        &self,
        event: AuthEvent,
        user_id: Option<Uuid>,
        email: Option<&str>,
        success: bool,
        meta: &RequestMeta,
        details: Option<JsonValue>,
    ) {
        tracing::info!(
            target: "audit",
            event = event.as_str(),
            user_id = ?user_id,
            email = email.unwrap_or_default(),
            success,
            ip = ?meta.ip.map(|ip| ip.ip()),
        );
        if let Err(e) = self.log(event, user_id, email, success, meta, details).await {
            tracing::warn!(error = ?e, event = event.as_str(), "failed to persist audit event");
        }
    }
}
