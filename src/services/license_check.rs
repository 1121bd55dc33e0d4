use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::verification::LicenseCheckStatus;

const VERIFIED_NOTE: &str =
    "Verified via placeholder registry logic. Replace with real registry integration.";
const FAILED_NOTE: &str = "The provided licence details did not match the expected format.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseCheckResult {
    pub status: LicenseCheckStatus,
    pub notes: String,
}

impl LicenseCheckResult {
    pub fn is_verified(&self) -> bool {
        self.status == LicenseCheckStatus::Verified
    }
}

/// Format-only registry check. No external registry is consulted.
pub fn check_license(license_number: &str, regulatory_body: &str) -> LicenseCheckResult {
    let number = license_number.trim().to_uppercase();
    let body = regulatory_body.trim().to_uppercase();

    let looks_valid = number.chars().count() >= 6
        && number
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '/')
        && body.chars().count() >= 3;

    if looks_valid {
        LicenseCheckResult {
            status: LicenseCheckStatus::Verified,
            notes: VERIFIED_NOTE.to_string(),
        }
    } else {
        LicenseCheckResult {
            status: LicenseCheckStatus::Failed,
            notes: FAILED_NOTE.to_string(),
        }
    }
}

/// Writes the audit row and mirrors the outcome onto the professional profile.
/// `store_fields` also overwrites the licence number and body on the profile.
pub async fn record_license_check(
    pool: &PgPool,
    user_id: Uuid,
    license_number: &str,
    regulatory_body: &str,
    result: &LicenseCheckResult,
    checked_by: &str,
    store_fields: bool,
) -> Result<()> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO professional_license_audits (user_id, license_number, regulatory_body, status, notes, checked_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(user_id)
    .bind(license_number)
    .bind(regulatory_body)
    .bind(result.status.as_str())
    .bind(&result.notes)
    .bind(checked_by)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE professional_profiles
        SET license_verified = $2,
            license_last_checked_at = NOW(),
            license_check_status = $3,
            license_number = CASE WHEN $4 THEN $5 ELSE license_number END,
            regulatory_body = CASE WHEN $4 THEN $6 ELSE regulatory_body END,
            updated_at = NOW()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(result.is_verified())
    .bind(result.status.as_str())
    .bind(store_fields)
    .bind(license_number)
    .bind(regulatory_body)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_licence_is_verified() {
        let result = check_license(" mdcn/12345 ", "mdcn");
        assert_eq!(result.status, LicenseCheckStatus::Verified);
        assert!(result.is_verified());
    }

    #[test]
    fn short_number_fails() {
        assert_eq!(check_license("AB12", "MDCN").status, LicenseCheckStatus::Failed);
    }

    #[test]
    fn illegal_characters_fail() {
        let result = check_license("ABC 1234", "Nigerian Bar");
        assert_eq!(result.status, LicenseCheckStatus::Failed);
        assert_eq!(result.notes, FAILED_NOTE);
    }

    #[test]
    fn short_body_fails() {
        assert_eq!(check_license("NBA-998877", "NB").status, LicenseCheckStatus::Failed);
    }

    #[test]
    fn lowercase_input_is_normalised_before_checking() {
        assert!(check_license("sc-0042-lg", "nba").is_verified());
    }
}
