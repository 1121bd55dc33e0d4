use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::notification::Notification;

const HUB_CAPACITY: usize = 512;

/// Event pushed to connected WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub user_id: Uuid,
    pub notification: Notification,
}

/// In-process fan-out of new notifications. Subscribers filter by user.
#[derive(Clone)]
pub struct NotificationHub {
    sender: broadcast::Sender<NotificationEvent>,
}

impl NotificationHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(HUB_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: NotificationEvent) {
        // no receivers is fine, the row is already persisted
        let _ = self.sender.send(event);
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    hub: NotificationHub,
}

impl NotificationService {
    pub fn new(pool: PgPool, hub: NotificationHub) -> Self {
        Self { pool, hub }
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    pub async fn notify(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        metadata: Option<JsonValue>,
    ) -> Result<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, title, message, metadata)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, message, metadata, read_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(message)
        .bind(metadata)
        .fetch_one(&self.pool)
        .await?;

        self.hub.publish(NotificationEvent {
            user_id,
            notification: notification.clone(),
        });
        Ok(notification)
    }

    /// Best-effort variant for side effects of an already committed change.
    pub async fn notify_quietly(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        metadata: Option<JsonValue>,
    ) {
        if let Err(e) = self.notify(user_id, title, message, metadata).await {
            tracing::warn!(error = ?e, %user_id, title, "failed to deliver notification");
        }
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, title, message, metadata, read_at, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT 50
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<Notification> {
        let row = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, message, metadata, read_at, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or_else(|| Error::NotFound("Notification not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn hub_delivers_to_every_subscriber() {
        let hub = NotificationHub::new();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();
        let user_id = Uuid::new_v4();
        hub.publish(NotificationEvent {
            user_id,
            notification: Notification {
                id: Uuid::new_v4(),
                user_id,
                title: "New job".into(),
                message: "A plumbing job was posted".into(),
                metadata: None,
                read_at: None,
                created_at: Utc::now(),
            },
        });
        assert_eq!(first.recv().await.unwrap().user_id, user_id);
        assert_eq!(second.recv().await.unwrap().notification.title, "New job");
    }

    #[test]
    fn publishing_without_subscribers_does_not_panic() {
        let hub = NotificationHub::new();
        hub.publish(NotificationEvent {
            user_id: Uuid::new_v4(),
            notification: Notification {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                title: "t".into(),
                message: "m".into(),
                metadata: None,
                read_at: None,
                created_at: Utc::now(),
            },
        });
    }
}
