use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::verification_dto::{LicenseCheckPayload, LicensePayload, SubmitVerificationPayload},
    error::Result,
    middleware::auth::Claims,
    models::user::Role,
    utils::extract::Json,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/verification",
    request_body = SubmitVerificationPayload,
    responses(
        (status = 202, description = "Submission accepted for background verification"),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn submit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitVerificationPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let accepted = state
        .verification_service
        .submit(claims.user_id()?, payload)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

#[utoipa::path(
    get,
    path = "/api/verification/status",
    responses(
        (status = 200, description = "Caller's submissions, newest first")
    )
)]
#[axum::debug_handler]
pub async fn status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let submissions = state
        .verification_service
        .status(claims.user_id()?)
        .await?;
    Ok(Json(submissions))
}

#[utoipa::path(
    post,
    path = "/api/verification/license",
    request_body = LicensePayload,
    responses(
        (status = 200, description = "Licence stored for review"),
        (status = 404, description = "Professional profile not found")
    )
)]
#[axum::debug_handler]
pub async fn submit_license(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<LicensePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state
        .verification_service
        .submit_license(claims.user_id()?, payload)
        .await?;
    Ok(Json(json!({ "message": "License submitted for review" })))
}

#[utoipa::path(
    post,
    path = "/api/verification/license/check",
    request_body = LicenseCheckPayload,
    responses(
        (status = 200, description = "Check result"),
        (status = 404, description = "Professional profile not found")
    )
)]
#[axum::debug_handler]
pub async fn check_license(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<LicenseCheckPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user_id = claims.user_id()?;
    let checked_by = if claims.has_role(Role::Admin) {
        "admin".to_string()
    } else {
        user_id.to_string()
    };
    let result = state
        .verification_service
        .check_license(user_id, &checked_by, payload)
        .await?;
    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/api/verification/license/queue",
    responses(
        (status = 200, description = "Scheduled licence rechecks, soonest first")
    )
)]
#[axum::debug_handler]
pub async fn license_queue(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let jobs = state.verification_service.scheduled_rechecks();
    Ok(Json(json!({ "count": jobs.len(), "jobs": jobs })))
}
