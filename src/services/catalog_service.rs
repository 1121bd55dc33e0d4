use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::catalog_dto::{CategoryWithCounts, ProvidersQuery, SubscribePayload};
use crate::error::{Error, Result};
use crate::models::profile::{ArtisanProfile, ProviderListing, SubscriptionStatus};

pub(crate) const ARTISAN_COLUMNS: &str = "id, user_id, service_category_id, subscription_status, \
    subscription_expires_at, verified_badge, hire_count, created_at, updated_at";

#[derive(Clone)]
pub struct CatalogService {
    pool: PgPool,
}

impl CatalogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn categories(&self) -> Result<Vec<CategoryWithCounts>> {
        let rows = sqlx::query_as::<_, CategoryWithCounts>(
            r#"
            SELECT c.id, c.slug, c.label, c.description,
                   (SELECT COUNT(*) FROM artisan_profiles a WHERE a.service_category_id = c.id) AS artisan_count,
                   (SELECT COUNT(*) FROM jobs j WHERE j.service_category_id = c.id) AS job_count
            FROM service_categories c
            ORDER BY c.label ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn providers(&self, query: ProvidersQuery) -> Result<Vec<ProviderListing>> {
        let category_id = query
            .category_id
            .ok_or_else(|| Error::BadRequest("categoryId is required".to_string()))?;

        let rows = sqlx::query_as::<_, ProviderListing>(
            r#"
            SELECT a.id, a.user_id, u.first_name, u.last_name, a.service_category_id,
                   a.subscription_status, a.verified_badge, a.hire_count
            FROM artisan_profiles a
            JOIN users u ON u.id = a.user_id
            WHERE a.service_category_id = $1
              AND a.subscription_status IN ('ACTIVE', 'TRIAL')
              AND ($2 OR a.verified_badge = TRUE)
            ORDER BY a.verified_badge DESC, a.hire_count DESC
            "#,
        )
        .bind(category_id)
        .bind(query.include_unverified)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn subscribe(&self, user_id: Uuid, payload: SubscribePayload) -> Result<ArtisanProfile> {
        let plan = match payload.plan.unwrap_or(SubscriptionStatus::Active) {
            SubscriptionStatus::Inactive => {
                return Err(Error::BadRequest("plan must be TRIAL or ACTIVE".to_string()))
            }
            plan => plan,
        };

        let sql = format!(
            r#"
            INSERT INTO artisan_profiles (user_id, service_category_id, subscription_status, subscription_expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET service_category_id = EXCLUDED.service_category_id,
                subscription_status = EXCLUDED.subscription_status,
                subscription_expires_at = COALESCE(EXCLUDED.subscription_expires_at, artisan_profiles.subscription_expires_at),
                updated_at = NOW()
            RETURNING {}
            "#,
            ARTISAN_COLUMNS
        );
        let profile = sqlx::query_as::<_, ArtisanProfile>(&sql)
            .bind(user_id)
            .bind(payload.category_id)
            .bind(plan.as_str())
            .bind(payload.expires_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(profile)
    }
}
