use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::auth_dto::{
    AuthResponse, LoginPayload, RegisterClientPayload, RegisterEmployerPayload,
    RegisterProfessionalPayload, RegisterWorkerPayload, RegistrationResponse,
};
use crate::error::{Error, Result};
use crate::middleware::auth::issue_user_token;
use crate::models::user::{Role, User};
use crate::services::audit_service::{AuditService, AuthEvent, RequestMeta};
use crate::services::lockout::LockoutPolicy;
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::token::generate_hex_token;
use crate::utils::validation::normalize_email;

pub(crate) const USER_COLUMNS: &str = "id, email, phone, password_hash, first_name, last_name, role, roles, \
    email_verified, email_verification_token, email_verification_expires, password_reset_token, \
    password_reset_expires, failed_login_attempts, locked_until, last_login_at, last_login_ip, \
    is_verified, verification_status, created_at, updated_at";

const EMAIL_TOKEN_TTL_HOURS: i64 = 24;
const RESET_TOKEN_TTL_MINUTES: i64 = 30;

pub enum LoginOutcome {
    Success(AuthResponse),
    InvalidCredentials { attempts_remaining: Option<i32> },
    Locked { locked_until: DateTime<Utc>, minutes: i64 },
    EmailUnverified,
}

pub enum WorkerRegistration {
    Created(AuthResponse),
    Upgraded(AuthResponse),
}

pub struct PasswordResetTicket {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Union of the primary role and any additional granted roles, primary first.
pub fn collect_roles(user: &User) -> Vec<String> {
    let mut roles = vec![user.role.clone()];
    for role in &user.roles {
        if !roles.iter().any(|r| r.eq_ignore_ascii_case(role)) {
            roles.push(role.clone());
        }
    }
    roles
}

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    audit: AuditService,
}

impl AuthService {
    pub fn new(pool: PgPool, audit: AuditService) -> Self {
        Self { pool, audit }
    }

    fn auth_response(user: User) -> Result<AuthResponse> {
        let roles = collect_roles(&user);
        let token = issue_user_token(user.id, &user.role, &roles, &user.email)?;
        Ok(AuthResponse { token, roles, user })
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    async fn ensure_email_free(&self, email: &str) -> Result<()> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        if taken {
            return Err(Error::Conflict("Email already registered".to_string()));
        }
        Ok(())
    }

    async fn ensure_phone_free(&self, phone: &str, except: Option<Uuid>) -> Result<()> {
        let owner: Option<Uuid> = sqlx::query_scalar("SELECT id FROM users WHERE phone = $1")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await?;
        match owner {
            Some(id) if Some(id) != except => {
                Err(Error::Conflict("Phone number already registered".to_string()))
            }
            _ => Ok(()),
        }
    }

    pub async fn register_client(
        &self,
        payload: RegisterClientPayload,
        meta: &RequestMeta,
    ) -> Result<RegistrationResponse> {
        let email = normalize_email(&payload.email);
        self.ensure_email_free(&email).await?;

        let password_hash = hash_password(&payload.password)?;
        let token = generate_hex_token(32);
        let expires = Utc::now() + Duration::hours(EMAIL_TOKEN_TTL_HOURS);

        let user_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role, roles,
                               email_verification_token, email_verification_expires)
            VALUES ($1, $2, $3, $4, 'CLIENT', ARRAY['CLIENT'], $5, $6)
            RETURNING id
            "#,
        )
        .bind(&email)
        .bind(&password_hash)
        .bind(payload.first_name.trim())
        .bind(payload.last_name.trim())
        .bind(&token)
        .bind(expires)
        .fetch_one(&self.pool)
        .await?;

        self.audit
            .record(AuthEvent::Registration, Some(user_id), Some(&email), true, meta, Some(json!({"role": "CLIENT"})))
            .await;

        Ok(RegistrationResponse {
            message: "Account created. Check your email to verify your address.".to_string(),
            user_id,
            verification_token: token,
        })
    }

    pub async fn register_professional(
        &self,
        payload: RegisterProfessionalPayload,
        meta: &RequestMeta,
    ) -> Result<RegistrationResponse> {
        let email = normalize_email(&payload.email);
        self.ensure_email_free(&email).await?;

        let password_hash = hash_password(&payload.password)?;
        let token = generate_hex_token(32);
        let expires = Utc::now() + Duration::hours(EMAIL_TOKEN_TTL_HOURS);
        let role = payload.profession.as_str();

        let mut tx = self.pool.begin().await?;
        let user_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role, roles,
                               email_verification_token, email_verification_expires)
            VALUES ($1, $2, $3, $4, $5, ARRAY[$5], $6, $7)
            RETURNING id
            "#,
        )
        .bind(&email)
        .bind(&password_hash)
        .bind(payload.first_name.trim())
        .bind(payload.last_name.trim())
        .bind(role)
        .bind(&token)
        .bind(expires)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO professional_profiles (user_id, profession, license_number, regulatory_body, license_document)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(role)
        .bind(payload.license_number.trim())
        .bind(payload.regulatory_body.trim())
        .bind(&payload.license_document)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.audit
            .record(AuthEvent::Registration, Some(user_id), Some(&email), true, meta, Some(json!({"role": role})))
            .await;

        Ok(RegistrationResponse {
            message: "Professional account created. Verify your email, then complete licence checks."
                .to_string(),
            user_id,
            verification_token: token,
        })
    }

    pub async fn register_worker(
        &self,
        payload: RegisterWorkerPayload,
        meta: &RequestMeta,
    ) -> Result<WorkerRegistration> {
        let email = normalize_email(&payload.email);
        let phone = payload.phone.trim().to_string();

        if let Some(existing) = self.find_by_email(&email).await? {
            let has_artisan_profile: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM artisan_profiles WHERE user_id = $1)",
            )
            .bind(existing.id)
            .fetch_one(&self.pool)
            .await?;
            if existing.has_role(Role::Artisan) || has_artisan_profile {
                return Err(Error::Conflict(
                    "This account already has worker access.".to_string(),
                ));
            }
            self.ensure_phone_free(&phone, Some(existing.id)).await?;

            let primary = if existing.role.eq_ignore_ascii_case(Role::Employer.as_str()) {
                existing.role.clone()
            } else {
                Role::Artisan.as_str().to_string()
            };
            let sql = format!(
                r#"
                UPDATE users
                SET phone = COALESCE(phone, $2),
                    roles = CASE WHEN 'ARTISAN' = ANY(roles) THEN roles ELSE array_append(roles, 'ARTISAN') END,
                    role = $3,
                    is_verified = TRUE,
                    email_verified = TRUE,
                    updated_at = NOW()
                WHERE id = $1
                RETURNING {}
                "#,
                USER_COLUMNS
            );
            let user = sqlx::query_as::<_, User>(&sql)
                .bind(existing.id)
                .bind(&phone)
                .bind(&primary)
                .fetch_one(&self.pool)
                .await?;

            self.audit
                .record(AuthEvent::Registration, Some(user.id), Some(&email), true, meta, Some(json!({"role": "ARTISAN (added)"})))
                .await;
            return Ok(WorkerRegistration::Upgraded(Self::auth_response(user)?));
        }

        self.ensure_phone_free(&phone, None).await?;
        let password_hash = hash_password(&payload.password)?;
        let sql = format!(
            r#"
            INSERT INTO users (email, phone, password_hash, first_name, last_name, role, roles,
                               email_verified, is_verified, last_login_ip)
            VALUES ($1, $2, $3, $4, $5, 'ARTISAN', ARRAY['ARTISAN'], TRUE, TRUE, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&email)
            .bind(&phone)
            .bind(&password_hash)
            .bind(payload.first_name.trim())
            .bind(payload.last_name.trim())
            .bind(meta.ip.map(|ip| ip.ip().to_string()))
            .fetch_one(&self.pool)
            .await?;

        self.audit
            .record(AuthEvent::Registration, Some(user.id), Some(&email), true, meta, Some(json!({"role": "ARTISAN"})))
            .await;
        Ok(WorkerRegistration::Created(Self::auth_response(user)?))
    }

    pub async fn register_employer(
        &self,
        payload: RegisterEmployerPayload,
        meta: &RequestMeta,
    ) -> Result<AuthResponse> {
        let email = normalize_email(&payload.email);
        let phone = payload.phone.trim().to_string();
        self.ensure_email_free(&email).await?;
        self.ensure_phone_free(&phone, None).await?;

        let password_hash = hash_password(&payload.password)?;
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            r#"
            INSERT INTO users (email, phone, password_hash, first_name, last_name, role, roles,
                               email_verified, is_verified, last_login_ip)
            VALUES ($1, $2, $3, $4, $5, 'EMPLOYER', ARRAY['EMPLOYER'], TRUE, TRUE, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&email)
            .bind(&phone)
            .bind(&password_hash)
            .bind(payload.first_name.trim())
            .bind(payload.last_name.trim())
            .bind(meta.ip.map(|ip| ip.ip().to_string()))
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO employer_profiles (user_id, company_name) VALUES ($1, $2)")
            .bind(user.id)
            .bind(payload.company_name.as_deref().map(str::trim))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.audit
            .record(AuthEvent::Registration, Some(user.id), Some(&email), true, meta, Some(json!({"role": "EMPLOYER"})))
            .await;
        Self::auth_response(user)
    }

    pub async fn login(&self, payload: LoginPayload, meta: &RequestMeta) -> Result<LoginOutcome> {
        let email = normalize_email(&payload.email);
        let policy = LockoutPolicy::from_config();
        let now = Utc::now();

        let Some(user) = self.find_by_email(&email).await? else {
            self.audit
                .record(AuthEvent::LoginFailed, None, Some(&email), false, meta, Some(json!({"reason": "unknown_user"})))
                .await;
            return Ok(LoginOutcome::InvalidCredentials {
                attempts_remaining: None,
            });
        };

        if let Some(until) = user.locked_until.filter(|u| policy.is_locked(Some(*u), now)) {
            self.audit
                .record(AuthEvent::LoginFailed, Some(user.id), Some(&email), false, meta, Some(json!({"reason": "locked"})))
                .await;
            return Ok(LoginOutcome::Locked {
                locked_until: until,
                minutes: policy.minutes_remaining(until, now),
            });
        }

        if !verify_password(&payload.password, &user.password_hash)? {
            let failure = policy.register_failure(user.failed_login_attempts, now);
            sqlx::query(
                r#"
                UPDATE users
                SET failed_login_attempts = $2,
                    locked_until = COALESCE($3, locked_until),
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(user.id)
            .bind(failure.attempts)
            .bind(failure.locked_until)
            .execute(&self.pool)
            .await?;

            self.audit
                .record(AuthEvent::LoginFailed, Some(user.id), Some(&email), false, meta, Some(json!({"reason": "bad_password"})))
                .await;
            if failure.locked_until.is_some() {
                tracing::warn!(user_id = %user.id, "account locked after repeated failed logins");
                self.audit
                    .record(AuthEvent::AccountLocked, Some(user.id), Some(&email), false, meta, None)
                    .await;
            }
            return Ok(LoginOutcome::InvalidCredentials {
                attempts_remaining: Some(failure.attempts_remaining),
            });
        }

        if !user.email_verified {
            self.audit
                .record(AuthEvent::LoginFailed, Some(user.id), Some(&email), false, meta, Some(json!({"reason": "email_unverified"})))
                .await;
            return Ok(LoginOutcome::EmailUnverified);
        }

        let sql = format!(
            r#"
            UPDATE users
            SET failed_login_attempts = 0,
                locked_until = NULL,
                last_login_at = NOW(),
                last_login_ip = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(meta.ip.map(|ip| ip.ip().to_string()))
            .fetch_one(&self.pool)
            .await?;

        self.audit
            .record(AuthEvent::LoginSuccess, Some(user.id), Some(&email), true, meta, None)
            .await;
        Ok(LoginOutcome::Success(Self::auth_response(user)?))
    }

    pub async fn verify_email(&self, token: &str, meta: &RequestMeta) -> Result<()> {
        let verified: Option<(Uuid, String)> = sqlx::query_as(
            r#"
            UPDATE users
            SET email_verified = TRUE,
                email_verification_token = NULL,
                email_verification_expires = NULL,
                updated_at = NOW()
            WHERE email_verification_token = $1
              AND email_verification_expires > NOW()
            RETURNING id, email
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let Some((user_id, email)) = verified else {
            return Err(Error::NotFound(
                "Verification link is invalid or has expired.".to_string(),
            ));
        };
        self.audit
            .record(AuthEvent::EmailVerified, Some(user_id), Some(&email), true, meta, None)
            .await;
        Ok(())
    }

    pub async fn forgot_password(
        &self,
        email: &str,
        meta: &RequestMeta,
    ) -> Result<Option<PasswordResetTicket>> {
        let email = normalize_email(email);
        let token = generate_hex_token(32);
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

        let user_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET password_reset_token = $2, password_reset_expires = $3, updated_at = NOW()
            WHERE email = $1
            RETURNING id
            "#,
        )
        .bind(&email)
        .bind(&token)
        .bind(expires_at)
        .fetch_optional(&self.pool)
        .await?;

        let Some(user_id) = user_id else {
            return Ok(None);
        };
        self.audit
            .record(AuthEvent::PasswordResetRequested, Some(user_id), Some(&email), true, meta, None)
            .await;
        Ok(Some(PasswordResetTicket { token, expires_at }))
    }

    pub async fn reset_password(&self, token: &str, password: &str, meta: &RequestMeta) -> Result<()> {
        let password_hash = hash_password(password)?;
        let updated: Option<(Uuid, String)> = sqlx::query_as(
            r#"
            UPDATE users
            SET password_hash = $2,
                password_reset_token = NULL,
                password_reset_expires = NULL,
                failed_login_attempts = 0,
                locked_until = NULL,
                updated_at = NOW()
            WHERE password_reset_token = $1
              AND password_reset_expires > NOW()
            RETURNING id, email
            "#,
        )
        .bind(token)
        .bind(&password_hash)
        .fetch_optional(&self.pool)
        .await?;

        let Some((user_id, email)) = updated else {
            return Err(Error::BadRequest(
                "Reset token is invalid or expired.".to_string(),
            ));
        };
        self.audit
            .record(AuthEvent::PasswordResetCompleted, Some(user_id), Some(&email), true, meta, None)
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str, roles: &[&str]) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".into(),
            phone: None,
            password_hash: String::new(),
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            role: role.into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            email_verified: true,
            email_verification_token: None,
            email_verification_expires: None,
            password_reset_token: None,
            password_reset_expires: None,
            failed_login_attempts: 0,
            locked_until: None,
            last_login_at: None,
            last_login_ip: None,
            is_verified: false,
            verification_status: "UNVERIFIED".into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn collects_roles_without_duplicates() {
        let u = user("EMPLOYER", &["EMPLOYER", "ARTISAN"]);
        assert_eq!(collect_roles(&u), vec!["EMPLOYER".to_string(), "ARTISAN".to_string()]);
    }

    #[test]
    fn primary_role_comes_first() {
        let u = user("CLIENT", &[]);
        assert_eq!(collect_roles(&u), vec!["CLIENT".to_string()]);
    }
}
