use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::profile_dto::{HirePayload, PublicProfileResponse, UpdateProfessionalPayload};
use crate::error::{Error, Result};
use crate::models::job::HireAction;
use crate::models::profile::{ArtisanProfile, EmployerProfile, ProfessionalProfile};
use crate::models::user::{Role, UserSummary};
use crate::services::catalog_service::ARTISAN_COLUMNS;
use crate::services::notification_service::NotificationService;

pub(crate) const PROFESSIONAL_PROFILE_COLUMNS: &str = "id, user_id, profession, license_number, \
    regulatory_body, license_document, license_verified, license_last_checked_at, license_check_status, \
    profile_image_url, profile_completion, completion_audited_at, subscription_status, verified_badge, \
    created_at, updated_at";

#[derive(Clone)]
pub struct ProfileService {
    pool: PgPool,
    notifications: NotificationService,
}

impl ProfileService {
    pub fn new(pool: PgPool, notifications: NotificationService) -> Self {
        Self {
            pool,
            notifications,
        }
    }

    pub async fn user_summary(&self, user_id: Uuid) -> Result<Option<UserSummary>> {
        let row = sqlx::query_as::<_, UserSummary>(
            "SELECT id, first_name, last_name, email, role, is_verified FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn artisan_profile(&self, user_id: Uuid) -> Result<Option<ArtisanProfile>> {
        let sql = format!("SELECT {} FROM artisan_profiles WHERE user_id = $1", ARTISAN_COLUMNS);
        let row = sqlx::query_as::<_, ArtisanProfile>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn professional_profile(&self, user_id: Uuid) -> Result<Option<ProfessionalProfile>> {
        let sql = format!(
            "SELECT {} FROM professional_profiles WHERE user_id = $1",
            PROFESSIONAL_PROFILE_COLUMNS
        );
        let row = sqlx::query_as::<_, ProfessionalProfile>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn employer_profile(&self, user_id: Uuid) -> Result<Option<EmployerProfile>> {
        let row = sqlx::query_as::<_, EmployerProfile>(
            "SELECT id, user_id, company_name, verified_badge, created_at, updated_at FROM employer_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn public_profile(&self, user_id: Uuid) -> Result<PublicProfileResponse> {
        let user = self
            .user_summary(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("Profile not found".to_string()))?;
        Ok(PublicProfileResponse {
            user,
            artisan_profile: self.artisan_profile(user_id).await?,
            professional_profile: self.professional_profile(user_id).await?,
            employer_profile: self.employer_profile(user_id).await?,
        })
    }

    pub async fn hire(&self, employer_id: Uuid, payload: HirePayload) -> Result<HireAction> {
        let target = self
            .user_summary(payload.artisan_id)
            .await?
            .filter(|u| !u.role.eq_ignore_ascii_case(Role::Employer.as_str()))
            .ok_or_else(|| Error::NotFound("Artisan not found".to_string()))?;

        let mut tx = self.pool.begin().await?;
        let action = sqlx::query_as::<_, HireAction>(
            r#"
            INSERT INTO hire_actions (job_id, employer_id, artisan_id, status, note)
            VALUES ($1, $2, $3, 'ACCEPTED', $4)
            RETURNING id, job_id, application_id, employer_id, artisan_id, status, note, created_at
            "#,
        )
        .bind(payload.job_id)
        .bind(employer_id)
        .bind(target.id)
        .bind(payload.note.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE artisan_profiles SET hire_count = hire_count + 1, updated_at = NOW() WHERE user_id = $1",
        )
        .bind(target.id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        self.notifications
            .notify_quietly(
                target.id,
                "You have a new hire request",
                "An employer chose you directly from your profile.",
                Some(json!({"hireActionId": action.id, "jobId": payload.job_id})),
            )
            .await;
        Ok(action)
    }

    pub async fn update_professional(
        &self,
        user_id: Uuid,
        payload: UpdateProfessionalPayload,
    ) -> Result<ProfessionalProfile> {
        let sql = format!(
            r#"
            UPDATE professional_profiles
            SET profile_image_url = COALESCE($2, profile_image_url),
                regulatory_body = COALESCE($3, regulatory_body),
                profession = COALESCE($4, profession),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING {}
            "#,
            PROFESSIONAL_PROFILE_COLUMNS
        );
        sqlx::query_as::<_, ProfessionalProfile>(&sql)
            .bind(user_id)
            .bind(payload.profile_image_url)
            .bind(payload.regulatory_body.map(|s| s.trim().to_string()))
            .bind(payload.profession.map(|s| s.trim().to_string()))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Professional profile not found".to_string()))
    }

    pub async fn set_completion(&self, user_id: Uuid, completion: i32) -> Result<i32> {
        let value: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE professional_profiles
            SET profile_completion = $2, completion_audited_at = NOW(), updated_at = NOW()
            WHERE user_id = $1
            RETURNING profile_completion
            "#,
        )
        .bind(user_id)
        .bind(completion)
        .fetch_optional(&self.pool)
        .await?;
        value.ok_or_else(|| Error::NotFound("Professional profile not found".to_string()))
    }
}
