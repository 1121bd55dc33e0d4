use std::sync::Arc;

use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::consultation_dto::{
    Bank, BankAccountPayload, EarningsSummary, ProfessionalDetail, ProfessionalListQuery,
    RegisterConsultationProfessionalPayload, RegistrationStatus, ResolvedAccountResponse,
    UpdateConsultationProfilePayload, UpdateWithdrawalPayload, VerifyBankPayload, WithdrawalView,
};
use crate::error::{Error, Result};
use crate::models::consultation::{
    ConsultationProfessional, ProfessionalPublic, SessionReview, VerificationMethod, Withdrawal,
    WithdrawalStatus,
};
use crate::models::user::{Profession, Role};
use crate::services::payment_gateway::PaymentGateway;
use crate::utils::validation::{decoded_base64_len, is_valid_account_number};

pub(crate) const PROFESSIONAL_COLUMNS: &str = "id, user_id, name, email, profession, specialization, \
    license_number, regulatory_body, years_of_experience, bio, verification_method, license_document_link, \
    license_document_upload, verification_status, is_verified, is_active, rating, total_reviews, \
    total_sessions, total_earnings, bank_name, bank_code, account_number, account_name, bank_verified, \
    created_at, updated_at";
const PUBLIC_COLUMNS: &str = "id, name, profession, specialization, years_of_experience, bio, \
    is_verified, rating, total_reviews, total_sessions";
const WITHDRAWAL_COLUMNS: &str = "id, professional_id, amount, status, bank_name, bank_code, \
    account_number, account_name, paystack_reference, failure_reason, processed_at, created_at, updated_at";

/// Smallest withdrawal in kobo (NGN 5,000).
pub const MIN_WITHDRAWAL: i64 = 500_000;
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

pub const NIGERIAN_BANKS: &[Bank] = &[
    Bank { name: "Access Bank", code: "044" },
    Bank { name: "Citibank", code: "023" },
    Bank { name: "Diamond Bank", code: "063" },
    Bank { name: "Ecobank Nigeria", code: "050" },
    Bank { name: "Fidelity Bank Nigeria", code: "070" },
    Bank { name: "First Bank of Nigeria", code: "011" },
    Bank { name: "First City Monument Bank", code: "214" },
    Bank { name: "Guaranty Trust Bank", code: "058" },
    Bank { name: "Heritage Bank Plc", code: "030" },
    Bank { name: "Jaiz Bank", code: "301" },
    Bank { name: "Keystone Bank Limited", code: "082" },
    Bank { name: "Polaris Bank", code: "076" },
    Bank { name: "Providus Bank Plc", code: "101" },
    Bank { name: "Stanbic IBTC Bank Nigeria Limited", code: "221" },
    Bank { name: "Standard Chartered Bank", code: "068" },
    Bank { name: "Sterling Bank", code: "232" },
    Bank { name: "Suntrust Bank Nigeria Limited", code: "100" },
    Bank { name: "Union Bank of Nigeria", code: "032" },
    Bank { name: "United Bank for Africa", code: "033" },
    Bank { name: "Unity Bank Plc", code: "215" },
    Bank { name: "Wema Bank", code: "035" },
    Bank { name: "Zenith Bank", code: "057" },
];

/// Balance a professional may still withdraw. Withdrawals that are pending or
/// processing are reserved so they cannot be requested twice.
pub fn available_balance(total_earnings: i64, withdrawn: i64, reserved: i64) -> i64 {
    (total_earnings - withdrawn - reserved).max(0)
}

/// Rejects registrations whose licence evidence does not match the chosen method.
pub fn check_license_evidence(payload: &RegisterConsultationProfessionalPayload) -> Result<()> {
    match payload.verification_method {
        VerificationMethod::Link => {
            if payload
                .license_document_link
                .as_deref()
                .map_or(true, |link| link.trim().is_empty())
            {
                return Err(Error::BadRequest(
                    "Provide a secure link to your licence document.".to_string(),
                ));
            }
        }
        VerificationMethod::Upload => {
            let upload = payload.license_document_upload.as_ref().ok_or_else(|| {
                Error::BadRequest(
                    "Upload your licence document when choosing the upload option.".to_string(),
                )
            })?;
            match decoded_base64_len(&upload.data) {
                Some(len) if len <= MAX_UPLOAD_BYTES => {}
                Some(_) => return Err(Error::BadRequest("Upload must be 5MB or less".to_string())),
                None => {
                    return Err(Error::BadRequest(
                        "Licence upload is not valid base64 data".to_string(),
                    ))
                }
            }
        }
    }
    Ok(())
}

#[derive(sqlx::FromRow)]
struct WithdrawalTotals {
    withdrawn: i64,
    reserved: i64,
    count: i64,
}

#[derive(Clone)]
pub struct ProfessionalService {
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
}

impl ProfessionalService {
    pub fn new(pool: PgPool, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { pool, gateway }
    }

    pub async fn list(&self, query: ProfessionalListQuery) -> Result<Vec<ProfessionalPublic>> {
        let sql = format!(
            r#"
            SELECT {} FROM consultation_professionals
            WHERE is_active = TRUE AND is_verified = TRUE AND ($1::text IS NULL OR profession = $1)
            ORDER BY rating DESC, total_sessions DESC
            "#,
            PUBLIC_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProfessionalPublic>(&sql)
            .bind(query.profession.map(|p| p.as_str()))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn detail(&self, id: Uuid) -> Result<ProfessionalDetail> {
        let sql = format!("SELECT {} FROM consultation_professionals WHERE id = $1", PUBLIC_COLUMNS);
        let professional = sqlx::query_as::<_, ProfessionalPublic>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Professional not found".to_string()))?;

        let reviews = sqlx::query_as::<_, SessionReview>(
            r#"
            SELECT id, session_id, professional_id, rating, review_text, created_at
            FROM session_reviews
            WHERE professional_id = $1
            ORDER BY created_at DESC
            LIMIT 50
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ProfessionalDetail {
            professional,
            reviews,
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ConsultationProfessional>> {
        let sql = format!("SELECT {} FROM consultation_professionals WHERE id = $1", PROFESSIONAL_COLUMNS);
        let row = sqlx::query_as::<_, ConsultationProfessional>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_for_user(&self, user_id: Uuid) -> Result<Option<ConsultationProfessional>> {
        let sql = format!(
            "SELECT {} FROM consultation_professionals WHERE user_id = $1",
            PROFESSIONAL_COLUMNS
        );
        let row = sqlx::query_as::<_, ConsultationProfessional>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn profile(&self, user_id: Uuid) -> Result<ConsultationProfessional> {
        self.find_for_user(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Professional profile not found".to_string()))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        payload: UpdateConsultationProfilePayload,
    ) -> Result<ConsultationProfessional> {
        let sql = format!(
            r#"
            UPDATE consultation_professionals
            SET specialization = COALESCE($2, specialization),
                years_of_experience = COALESCE($3, years_of_experience),
                bio = COALESCE($4, bio),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING {}
            "#,
            PROFESSIONAL_COLUMNS
        );
        sqlx::query_as::<_, ConsultationProfessional>(&sql)
            .bind(user_id)
            .bind(payload.specialization.map(|s| s.trim().to_string()))
            .bind(payload.years_of_experience)
            .bind(payload.bio)
            .bind(payload.is_active)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Professional profile not found".to_string()))
    }

    pub async fn verify_bank(&self, payload: VerifyBankPayload) -> Result<ResolvedAccountResponse> {
        if !is_valid_account_number(&payload.account_number) {
            return Err(Error::BadRequest("Account number must be 10 digits".to_string()));
        }
        let resolved = self
            .gateway
            .resolve_account(&payload.account_number, payload.bank_code.trim())
            .await
            .map_err(|e| match e {
                Error::Gateway(message) => Error::BadRequest(message),
                other => {
                    tracing::warn!(error = ?other, "bank account resolution failed");
                    Error::BadRequest("Failed to verify bank account".to_string())
                }
            })?;
        Ok(ResolvedAccountResponse {
            account_name: resolved.account_name,
            account_number: resolved.account_number,
        })
    }

    pub async fn save_bank_account(
        &self,
        user_id: Uuid,
        payload: BankAccountPayload,
    ) -> Result<ConsultationProfessional> {
        if !is_valid_account_number(&payload.account_number) {
            return Err(Error::BadRequest("Account number must be 10 digits".to_string()));
        }
        let sql = format!(
            r#"
            UPDATE consultation_professionals
            SET bank_name = $2, bank_code = $3, account_number = $4, account_name = $5,
                bank_verified = TRUE, updated_at = NOW()
            WHERE user_id = $1
            RETURNING {}
            "#,
            PROFESSIONAL_COLUMNS
        );
        sqlx::query_as::<_, ConsultationProfessional>(&sql)
            .bind(user_id)
            .bind(payload.bank_name.trim())
            .bind(payload.bank_code.trim())
            .bind(&payload.account_number)
            .bind(payload.account_name.trim())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Professional profile not found".to_string()))
    }

    pub fn banks(&self) -> &'static [Bank] {
        NIGERIAN_BANKS
    }

    async fn withdrawal_totals(&self, professional_id: Uuid) -> Result<WithdrawalTotals> {
        let totals = sqlx::query_as::<_, WithdrawalTotals>(
            r#"
            SELECT COALESCE(SUM(amount) FILTER (WHERE status = 'completed'), 0)::BIGINT AS withdrawn,
                   COALESCE(SUM(amount) FILTER (WHERE status IN ('pending', 'processing')), 0)::BIGINT AS reserved,
                   COUNT(*) AS count
            FROM withdrawals
            WHERE professional_id = $1
            "#,
        )
        .bind(professional_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    pub async fn earnings(&self, user_id: Uuid) -> Result<EarningsSummary> {
        let professional = self.profile(user_id).await?;
        let pending: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(professional_earning), 0)::BIGINT
            FROM consultation_sessions
            WHERE professional_id = $1 AND status = 'active'
            "#,
        )
        .bind(professional.id)
        .fetch_one(&self.pool)
        .await?;
        let totals = self.withdrawal_totals(professional.id).await?;

        Ok(EarningsSummary {
            total_earnings: professional.total_earnings,
            pending_earnings: pending,
            total_withdrawn: totals.withdrawn,
            available_to_withdraw: available_balance(
                professional.total_earnings,
                totals.withdrawn,
                totals.reserved,
            ),
            withdrawal_count: totals.count,
        })
    }

    pub async fn withdraw(&self, user_id: Uuid, amount: i64) -> Result<WithdrawalView> {
        if amount < MIN_WITHDRAWAL {
            return Err(Error::BadRequest("Minimum withdrawal amount is ₦5,000".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "SELECT {} FROM consultation_professionals WHERE user_id = $1 FOR UPDATE",
            PROFESSIONAL_COLUMNS
        );
        let professional = sqlx::query_as::<_, ConsultationProfessional>(&sql)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound("Professional profile not found".to_string()))?;

        let (Some(bank_name), Some(bank_code), Some(account_number), Some(account_name), true) = (
            professional.bank_name.clone(),
            professional.bank_code.clone(),
            professional.account_number.clone(),
            professional.account_name.clone(),
            professional.bank_verified,
        ) else {
            return Err(Error::BadRequest(
                "Please add and verify your bank account first".to_string(),
            ));
        };

        let (withdrawn, reserved): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount) FILTER (WHERE status = 'completed'), 0)::BIGINT,
                   COALESCE(SUM(amount) FILTER (WHERE status IN ('pending', 'processing')), 0)::BIGINT
            FROM withdrawals
            WHERE professional_id = $1
            "#,
        )
        .bind(professional.id)
        .fetch_one(&mut *tx)
        .await?;
        let available = available_balance(professional.total_earnings, withdrawn, reserved);
        if amount > available {
            return Err(Error::BadRequest(format!(
                "Insufficient balance. Available: ₦{}",
                available / 100
            )));
        }

        let sql = format!(
            r#"
            INSERT INTO withdrawals (professional_id, amount, bank_name, bank_code, account_number, account_name)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            WITHDRAWAL_COLUMNS
        );
        let withdrawal = sqlx::query_as::<_, Withdrawal>(&sql)
            .bind(professional.id)
            .bind(amount)
            .bind(bank_name)
            .bind(bank_code)
            .bind(account_number)
            .bind(account_name)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(professional_id = %professional.id, amount, withdrawal_id = %withdrawal.id, "withdrawal requested");
        Ok(view(withdrawal))
    }

    pub async fn withdrawals(&self, user_id: Uuid) -> Result<Vec<WithdrawalView>> {
        let professional = self.profile(user_id).await?;
        let sql = format!(
            "SELECT {} FROM withdrawals WHERE professional_id = $1 ORDER BY created_at DESC LIMIT 50",
            WITHDRAWAL_COLUMNS
        );
        let rows = sqlx::query_as::<_, Withdrawal>(&sql)
            .bind(professional.id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(view).collect())
    }

    pub async fn update_withdrawal(
        &self,
        id: Uuid,
        payload: UpdateWithdrawalPayload,
    ) -> Result<WithdrawalView> {
        let finished = matches!(
            payload.status,
            WithdrawalStatus::Completed | WithdrawalStatus::Failed
        );
        let sql = format!(
            r#"
            UPDATE withdrawals
            SET status = $2,
                failure_reason = COALESCE($3, failure_reason),
                paystack_reference = COALESCE($4, paystack_reference),
                processed_at = CASE WHEN $5 THEN NOW() ELSE processed_at END,
                updated_at = NOW()
            WHERE id = $1 AND status = ANY($6)
            RETURNING {}
            "#,
            WITHDRAWAL_COLUMNS
        );
        let updated = sqlx::query_as::<_, Withdrawal>(&sql)
            .bind(id)
            .bind(payload.status.as_str())
            .bind(payload.failure_reason)
            .bind(payload.reference)
            .bind(finished)
            .bind(payload.status.allowed_from())
            .fetch_optional(&self.pool)
            .await?;
        let withdrawal = match updated {
            Some(withdrawal) => withdrawal,
            None => {
                let current: Option<String> =
                    sqlx::query_scalar("SELECT status FROM withdrawals WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;
                return Err(match current {
                    Some(current) => Error::Conflict(format!(
                        "Withdrawal cannot move from {} to {}",
                        current,
                        payload.status.as_str()
                    )),
                    None => Error::NotFound("Withdrawal not found".to_string()),
                });
            }
        };
        tracing::info!(withdrawal_id = %id, status = payload.status.as_str(), "withdrawal updated");
        Ok(view(withdrawal))
    }

    pub async fn register(
        &self,
        user_id: Uuid,
        token_roles: &[Role],
        payload: RegisterConsultationProfessionalPayload,
    ) -> Result<ConsultationProfessional> {
        if !token_roles
            .iter()
            .any(|role| Profession::from_role(*role).is_some())
        {
            return Err(Error::Forbidden(
                "Only doctors and lawyers can register as consultation professionals".to_string(),
            ));
        }
        check_license_evidence(&payload)?;

        if self.find_for_user(user_id).await?.is_some() {
            return Err(Error::Conflict("Professional profile already exists".to_string()));
        }
        let (first_name, last_name, email): (String, String, String) =
            sqlx::query_as("SELECT first_name, last_name, email FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        let (link, upload) = match payload.verification_method {
            VerificationMethod::Link => (payload.license_document_link, None),
            VerificationMethod::Upload => (
                None,
                payload.license_document_upload.map(|u| {
                    json!({"name": u.name, "type": u.mime_type, "size": u.size, "data": u.data})
                }),
            ),
        };

        let sql = format!(
            r#"
            INSERT INTO consultation_professionals
                (user_id, name, email, profession, specialization, license_number, regulatory_body,
                 years_of_experience, bio, verification_method, license_document_link, license_document_upload)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            PROFESSIONAL_COLUMNS
        );
        let professional = sqlx::query_as::<_, ConsultationProfessional>(&sql)
            .bind(user_id)
            .bind(format!("{} {}", first_name, last_name))
            .bind(email)
            .bind(payload.profession.as_str())
            .bind(payload.specialization.trim())
            .bind(payload.license_number.trim())
            .bind(payload.regulatory_body.trim())
            .bind(payload.years_of_experience)
            .bind(payload.bio.unwrap_or_default())
            .bind(payload.verification_method.as_str())
            .bind(link)
            .bind(upload)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!(%user_id, professional_id = %professional.id, "consultation professional registered");
        Ok(professional)
    }

    pub async fn registration_status(&self, user_id: Uuid) -> Result<RegistrationStatus> {
        let professional = self.find_for_user(user_id).await?;
        Ok(RegistrationStatus {
            registered: professional.is_some(),
            professional: professional.as_ref().map(ProfessionalPublic::from),
        })
    }
}

fn view(withdrawal: Withdrawal) -> WithdrawalView {
    WithdrawalView {
        reference: withdrawal.display_reference(),
        id: withdrawal.id,
        amount: withdrawal.amount,
        status: withdrawal.status,
        bank_name: withdrawal.bank_name,
        account_number: withdrawal.account_number,
        failure_reason: withdrawal.failure_reason,
        processed_at: withdrawal.processed_at,
        created_at: withdrawal.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::consultation_dto::LicenseUpload;

    fn registration(method: VerificationMethod) -> RegisterConsultationProfessionalPayload {
        RegisterConsultationProfessionalPayload {
            profession: Profession::Doctor,
            specialization: "Paediatrics".into(),
            license_number: "MDCN-12345".into(),
            regulatory_body: "MDCN".into(),
            years_of_experience: 6,
            verification_method: method,
            license_document_link: None,
            license_document_upload: None,
            bio: None,
        }
    }

    #[test]
    fn available_balance_subtracts_withdrawn_and_reserved() {
        assert_eq!(available_balance(1_000_000, 250_000, 250_000), 500_000);
        assert_eq!(available_balance(100_000, 500_000, 0), 0);
    }

    #[test]
    fn link_method_requires_a_link() {
        let mut payload = registration(VerificationMethod::Link);
        assert!(check_license_evidence(&payload).is_err());
        payload.license_document_link = Some("https://docs.example.org/licence.pdf".into());
        assert!(check_license_evidence(&payload).is_ok());
    }

    #[test]
    fn upload_method_requires_decodable_data() {
        let mut payload = registration(VerificationMethod::Upload);
        assert!(check_license_evidence(&payload).is_err());
        payload.license_document_upload = Some(LicenseUpload {
            name: "licence.pdf".into(),
            mime_type: Some("application/pdf".into()),
            size: 24,
            data: "data:application/pdf;base64,JVBERi0xLjQKJcfsj6IKNSAwIG9iago=".into(),
        });
        assert!(check_license_evidence(&payload).is_ok());
    }

    #[test]
    fn bank_list_has_unique_codes() {
        let mut codes: Vec<&str> = NIGERIAN_BANKS.iter().map(|b| b.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), NIGERIAN_BANKS.len());
    }
}
