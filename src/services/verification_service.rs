use std::time::Duration as StdDuration;

use anyhow::Context as _;
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::verification_dto::{
    LicenseCheckPayload, LicenseCheckResponse, LicensePayload, SubmissionAccepted,
    SubmitVerificationPayload,
};
use crate::error::{Error, Result};
use crate::models::verification::{VerificationSubmission, VerificationType};
use crate::services::license_check::{check_license, record_license_check};
use crate::services::license_queue::{LicenseRecheckQueue, RecheckJob, RecheckTiming};
use crate::services::notification_service::NotificationService;

const SUBMISSION_COLUMNS: &str = "id, user_id, verification_type, identifier, metadata, status, \
    external_ref, provider_response, reviewed_at, created_at";
const FAILED_RECHECK_DAYS: i64 = 7;

/// Provider reply; only `VERIFIED` counts as a pass.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderVerdict {
    pub status: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub details: Option<JsonValue>,
}

impl ProviderVerdict {
    pub fn is_verified(&self) -> bool {
        self.status.eq_ignore_ascii_case("VERIFIED")
    }
}

/// Posts identity numbers to the configured government ID endpoints.
#[derive(Clone)]
pub struct GovernmentIdVerifier {
    client: Client,
    nin_url: Option<String>,
    dl_url: Option<String>,
    passport_url: Option<String>,
    api_key: Option<String>,
}

impl GovernmentIdVerifier {
    pub fn from_config() -> Result<Self> {
        let config = crate::config::get_config();
        let client = Client::builder()
            .timeout(StdDuration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            nin_url: config.nin_verification_url.clone(),
            dl_url: config.dl_verification_url.clone(),
            passport_url: config.passport_verification_url.clone(),
            api_key: config.verification_api_key.clone(),
        })
    }

    fn endpoint(&self, kind: VerificationType) -> Option<&str> {
        match kind {
            VerificationType::Nin => self.nin_url.as_deref(),
            VerificationType::DriversLicense => self.dl_url.as_deref(),
            VerificationType::InternationalPassport => self.passport_url.as_deref(),
        }
    }

    pub async fn verify(
        &self,
        kind: VerificationType,
        user_id: Uuid,
        identifier: &str,
        metadata: Option<&JsonValue>,
    ) -> Result<ProviderVerdict> {
        let endpoint = self.endpoint(kind).ok_or_else(|| {
            Error::Gateway(format!("Missing verification endpoint for {}", kind.as_str()))
        })?;

        let mut request = self.client.post(endpoint).json(&json!({
            "user": user_id,
            "identifier": identifier,
            "metadata": metadata.cloned().unwrap_or_else(|| json!({})),
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .context("verification provider request failed")?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Gateway(format!(
                "verification provider returned {}",
                status.as_u16()
            )));
        }
        let verdict = response
            .json::<ProviderVerdict>()
            .await
            .context("verification provider returned an unreadable body")?;
        Ok(verdict)
    }
}

#[derive(Clone)]
pub struct VerificationService {
    pool: PgPool,
    verifier: GovernmentIdVerifier,
    queue: LicenseRecheckQueue,
    notifications: NotificationService,
}

impl VerificationService {
    pub fn new(
        pool: PgPool,
        verifier: GovernmentIdVerifier,
        queue: LicenseRecheckQueue,
        notifications: NotificationService,
    ) -> Self {
        Self {
            pool,
            verifier,
            queue,
            notifications,
        }
    }

    /// Stores a PENDING submission and resolves it off the request path.
    pub async fn submit(
        &self,
        user_id: Uuid,
        payload: SubmitVerificationPayload,
    ) -> Result<SubmissionAccepted> {
        let sql = format!(
            r#"
            INSERT INTO verification_submissions (user_id, verification_type, identifier, metadata)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            SUBMISSION_COLUMNS
        );
        let submission = sqlx::query_as::<_, VerificationSubmission>(&sql)
            .bind(user_id)
            .bind(payload.verification_type.as_str())
            .bind(payload.identifier.trim())
            .bind(&payload.metadata)
            .fetch_one(&self.pool)
            .await?;

        let service = self.clone();
        let submission_id = submission.id;
        tokio::spawn(async move {
            service
                .resolve_submission(
                    submission_id,
                    user_id,
                    payload.verification_type,
                    payload.identifier.trim().to_string(),
                    payload.metadata,
                )
                .await;
        });

        Ok(SubmissionAccepted {
            submission_id: submission.id,
            status: submission.status,
        })
    }

    async fn resolve_submission(
        &self,
        submission_id: Uuid,
        user_id: Uuid,
        kind: VerificationType,
        identifier: String,
        metadata: Option<JsonValue>,
    ) {
        let verdict = self
            .verifier
            .verify(kind, user_id, &identifier, metadata.as_ref())
            .await;

        let outcome = match verdict {
            Ok(verdict) => {
                let verified = verdict.is_verified();
                if let Err(e) = self.mark_result(submission_id, user_id, verified, Some(&verdict)).await {
                    tracing::error!(error = ?e, %submission_id, "failed to store verification result");
                    return;
                }
                verified
            }
            Err(e) => {
                tracing::warn!(error = ?e, %submission_id, kind = kind.as_str(), "identity verification failed");
                if let Err(e) = self.mark_result(submission_id, user_id, false, None).await {
                    tracing::error!(error = ?e, %submission_id, "failed to reject verification");
                }
                false
            }
        };

        let (title, message) = if outcome {
            ("Verification complete", "Your identity documents were verified successfully.")
        } else {
            ("Verification failed", "We could not verify your identity documents. Please try again.")
        };
        self.notifications
            .notify_quietly(user_id, title, message, Some(json!({"submissionId": submission_id})))
            .await;
    }

    async fn mark_result(
        &self,
        submission_id: Uuid,
        user_id: Uuid,
        verified: bool,
        verdict: Option<&ProviderVerdict>,
    ) -> Result<()> {
        let status = if verified { "VERIFIED" } else { "REJECTED" };
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE verification_submissions
            SET status = $2, reviewed_at = NOW(), external_ref = $3, provider_response = $4
            WHERE id = $1
            "#,
        )
        .bind(submission_id)
        .bind(status)
        .bind(verdict.and_then(|v| v.reference.clone()))
        .bind(verdict.and_then(|v| v.details.clone()))
        .execute(&mut *tx)
        .await?;

        if verified {
            sqlx::query(
                "UPDATE users SET verification_status = 'VERIFIED', is_verified = TRUE, updated_at = NOW() WHERE id = $1",
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
            for table in ["artisan_profiles", "professional_profiles", "employer_profiles"] {
                let sql = format!(
                    "UPDATE {} SET verified_badge = TRUE, updated_at = NOW() WHERE user_id = $1",
                    table
                );
                sqlx::query(&sql).bind(user_id).execute(&mut *tx).await?;
            }
        }
        tx.commit().await?;
        tracing::info!(%submission_id, %user_id, status, "verification resolved");
        Ok(())
    }

    pub async fn status(&self, user_id: Uuid) -> Result<Vec<VerificationSubmission>> {
        let sql = format!(
            "SELECT {} FROM verification_submissions WHERE user_id = $1 ORDER BY created_at DESC",
            SUBMISSION_COLUMNS
        );
        let rows = sqlx::query_as::<_, VerificationSubmission>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn submit_license(&self, user_id: Uuid, payload: LicensePayload) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE professional_profiles
            SET license_number = $2, regulatory_body = $3, license_document = $4,
                license_verified = FALSE, updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(payload.license_number.trim())
        .bind(payload.regulatory_body.trim())
        .bind(&payload.license_document)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(Error::NotFound("Professional profile not found".to_string()));
        }
        Ok(())
    }

    pub async fn check_license(
        &self,
        user_id: Uuid,
        checked_by: &str,
        payload: LicenseCheckPayload,
    ) -> Result<LicenseCheckResponse> {
        let result = check_license(&payload.license_number, &payload.regulatory_body);
        record_license_check(
            &self.pool,
            user_id,
            &payload.license_number,
            &payload.regulatory_body,
            &result,
            checked_by,
            true,
        )
        .await?;

        let timing = if result.is_verified() {
            RecheckTiming::Default
        } else {
            RecheckTiming::After(Duration::days(FAILED_RECHECK_DAYS))
        };
        self.queue.schedule(
            user_id,
            &payload.license_number,
            &payload.regulatory_body,
            timing,
            Utc::now(),
        );

        Ok(LicenseCheckResponse {
            status: result.status,
            notes: result.notes,
        })
    }

    pub fn scheduled_rechecks(&self) -> Vec<RecheckJob> {
        self.queue.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_verified_status_passes() {
        let verdict: ProviderVerdict =
            serde_json::from_value(json!({"status": "VERIFIED", "reference": "NIMC-1"})).unwrap();
        assert!(verdict.is_verified());
        let verdict: ProviderVerdict = serde_json::from_value(json!({"status": "FAILED"})).unwrap();
        assert!(!verdict.is_verified());
    }

    #[test]
    fn missing_endpoint_is_reported() {
        let verifier = GovernmentIdVerifier {
            client: Client::new(),
            nin_url: Some("https://id.example.test/nin".into()),
            dl_url: None,
            passport_url: None,
            api_key: None,
        };
        assert!(verifier.endpoint(VerificationType::Nin).is_some());
        assert!(verifier.endpoint(VerificationType::DriversLicense).is_none());
    }
}
