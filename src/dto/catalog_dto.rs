use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::profile::SubscriptionStatus;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCounts {
    pub id: Uuid,
    pub slug: String,
    pub label: String,
    pub description: Option<String>,
    pub artisan_count: i64,
    pub job_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersQuery {
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub include_unverified: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubscribePayload {
    pub category_id: Uuid,
    pub plan: Option<SubscriptionStatus>,
    pub expires_at: Option<DateTime<Utc>>,
}
