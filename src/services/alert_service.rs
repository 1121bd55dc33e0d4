use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::notification::{AlertSubscription, AlertSubscriptionWithCategory};

#[derive(Clone)]
pub struct AlertService {
    pool: PgPool,
}

impl AlertService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn subscribe(&self, user_id: Uuid, category_id: Uuid) -> Result<AlertSubscription> {
        let row = sqlx::query_as::<_, AlertSubscription>(
            r#"
            INSERT INTO alert_subscriptions (user_id, service_category_id, is_active)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (user_id, service_category_id) DO UPDATE
            SET is_active = TRUE, updated_at = NOW()
            RETURNING id, user_id, service_category_id, is_active, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn active_for_user(&self, user_id: Uuid) -> Result<Vec<AlertSubscriptionWithCategory>> {
        let rows = sqlx::query_as::<_, AlertSubscriptionWithCategory>(
            r#"
            SELECT s.id, s.service_category_id, c.label AS category_label, c.slug AS category_slug,
                   s.is_active, s.created_at
            FROM alert_subscriptions s
            JOIN service_categories c ON c.id = s.service_category_id
            WHERE s.user_id = $1 AND s.is_active = TRUE
            ORDER BY s.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn deactivate(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let res = sqlx::query(
            "UPDATE alert_subscriptions SET is_active = FALSE, updated_at = NOW() WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Alert subscription not found".to_string()));
        }
        Ok(())
    }
}
