use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::profile_dto::CreateAlertPayload,
    error::Result,
    middleware::auth::Claims,
    utils::extract::{Json, Path},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/alerts",
    request_body = CreateAlertPayload,
    responses(
        (status = 201, description = "Alert subscription active")
    )
)]
#[axum::debug_handler]
pub async fn create_alert(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAlertPayload>,
) -> Result<impl IntoResponse> {
    let alert = state
        .alert_service
        .subscribe(claims.user_id()?, payload.service_category_id)
        .await?;
    Ok((StatusCode::CREATED, Json(alert)))
}

#[utoipa::path(
    get,
    path = "/api/alerts",
    responses(
        (status = 200, description = "Active alert subscriptions")
    )
)]
#[axum::debug_handler]
pub async fn list_alerts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let alerts = state
        .alert_service
        .active_for_user(claims.user_id()?)
        .await?;
    Ok(Json(alerts))
}

#[utoipa::path(
    delete,
    path = "/api/alerts/{id}",
    params(
        ("id" = Uuid, Path, description = "Alert subscription ID")
    ),
    responses(
        (status = 204, description = "Alert deactivated"),
        (status = 404, description = "Alert not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_alert(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.alert_service.deactivate(claims.user_id()?, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
