use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
    Extension,
};
use serde::Deserialize;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    middleware::auth::{decode_token, Claims},
    services::notification_service::NotificationEvent,
    utils::extract::{Json, Path, Query},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct SocketQuery {
    pub token: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "Latest notifications, newest first")
    )
)]
#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let notifications = state
        .notification_service
        .list_for_user(claims.user_id()?)
        .await?;
    Ok(Json(notifications))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification marked read"),
        (status = 404, description = "Notification not found")
    )
)]
#[axum::debug_handler]
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let notification = state
        .notification_service
        .mark_read(claims.user_id()?, id)
        .await?;
    Ok(Json(notification))
}

/// Upgrades to a socket that receives the caller's new notifications. Browsers
/// cannot set headers on the handshake, so the token travels in the query.
pub async fn notifications_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<SocketQuery>,
) -> Result<Response> {
    let token = query
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| Error::Unauthorized("missing_token".to_string()))?;
    let claims =
        decode_token(token.trim()).map_err(|_| Error::Unauthorized("invalid_token".to_string()))?;
    let user_id = claims.user_id()?;
    let events = state.notification_service.hub().subscribe();

    Ok(ws.on_upgrade(move |socket| forward_notifications(socket, user_id, events)))
}

async fn forward_notifications(
    mut socket: WebSocket,
    user_id: Uuid,
    mut events: broadcast::Receiver<NotificationEvent>,
) {
    tracing::debug!(%user_id, "notification socket connected");
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) if event.user_id == user_id => {
                    let text = match serde_json::to_string(&event.notification) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(error = ?e, "failed to serialize notification");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%user_id, skipped, "notification socket lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!(%user_id, "notification socket closed");
}
