use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::consultation_dto::{
        DashboardQuery, MessagesQuery, SendMessagePayload, SessionReviewPayload,
    },
    error::Result,
    middleware::auth::Claims,
    services::session_service::Viewer,
    utils::extract::{Json, Path, Query},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/consultation/sessions/{session_id}",
    params(
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Session with professional summary"),
        (status = 403, description = "Token is not bound to this session"),
        (status = 404, description = "Session not found")
    )
)]
#[axum::debug_handler]
pub async fn get_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let viewer = Viewer::client_only(&claims, session_id)?;
    let access = state
        .session_service
        .get_for_client(viewer, session_id)
        .await?;
    Ok(Json(access))
}

#[utoipa::path(
    post,
    path = "/api/consultation/sessions/{session_id}/messages",
    params(
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    request_body = SendMessagePayload,
    responses(
        (status = 201, description = "Message stored"),
        (status = 400, description = "Empty, too long, or session not active"),
        (status = 403, description = "No access to this session")
    )
)]
#[axum::debug_handler]
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<impl IntoResponse> {
    let viewer = Viewer::from_claims(&claims, session_id)?;
    let message = state
        .session_service
        .send_message(viewer, session_id, &payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

#[utoipa::path(
    get,
    path = "/api/consultation/sessions/{session_id}/messages",
    params(
        ("session_id" = Uuid, Path, description = "Session ID"),
        ("limit" = Option<i64>, Query, description = "Page size, default 50"),
        ("before" = Option<Uuid>, Query, description = "Return messages older than this one")
    ),
    responses(
        (status = 200, description = "Oldest-first page of messages")
    )
)]
#[axum::debug_handler]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<impl IntoResponse> {
    let viewer = Viewer::from_claims(&claims, session_id)?;
    let page = state
        .session_service
        .messages(viewer, session_id, query)
        .await?;
    Ok(Json(page))
}

#[utoipa::path(
    post,
    path = "/api/consultation/sessions/{session_id}/end",
    params(
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Session ended"),
        (status = 400, description = "Session is not active")
    )
)]
#[axum::debug_handler]
pub async fn end_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let viewer = Viewer::from_claims(&claims, session_id)?;
    let session = state.session_service.end(viewer, session_id).await?;
    Ok(Json(json!({ "message": "Session ended", "session": session })))
}

#[utoipa::path(
    post,
    path = "/api/consultation/sessions/{session_id}/review",
    params(
        ("session_id" = Uuid, Path, description = "Session ID")
    ),
    request_body = SessionReviewPayload,
    responses(
        (status = 201, description = "Review stored"),
        (status = 400, description = "Session has not ended"),
        (status = 409, description = "Already reviewed")
    )
)]
#[axum::debug_handler]
pub async fn review_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SessionReviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let viewer = Viewer::client_only(&claims, session_id)?;
    let review = state
        .session_service
        .review(viewer, session_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

#[utoipa::path(
    get,
    path = "/api/consultation/dashboard/professional",
    params(
        ("status" = Option<String>, Query, description = "active, ended or expired"),
        ("limit" = Option<i64>, Query, description = "Page size, default 20"),
        ("offset" = Option<i64>, Query, description = "Offset")
    ),
    responses(
        (status = 200, description = "Sessions with reviews and statistics"),
        (status = 400, description = "Unknown status filter"),
        (status = 404, description = "Professional profile not found")
    )
)]
#[axum::debug_handler]
pub async fn professional_dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<DashboardQuery>,
) -> Result<impl IntoResponse> {
    let dashboard = state
        .session_service
        .professional_dashboard(claims.user_id()?, query)
        .await?;
    Ok(Json(dashboard))
}
