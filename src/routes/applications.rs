use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::job_dto::{ApplyPayload, DecisionPayload},
    error::Result,
    middleware::auth::Claims,
    utils::extract::{Json, Path},
    AppState,
};

const MY_APPLICATIONS_LIMIT: i64 = 100;

#[utoipa::path(
    post,
    path = "/api/applications",
    request_body = ApplyPayload,
    responses(
        (status = 201, description = "Application submitted"),
        (status = 404, description = "Job missing or closed"),
        (status = 409, description = "Already applied")
    )
)]
#[axum::debug_handler]
pub async fn apply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ApplyPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let application = state
        .application_service
        .apply(claims.user_id()?, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(application)))
}

#[utoipa::path(
    post,
    path = "/api/applications/{id}/decision",
    params(
        ("id" = Uuid, Path, description = "Application ID")
    ),
    request_body = DecisionPayload,
    responses(
        (status = 200, description = "Decision recorded"),
        (status = 403, description = "Caller does not own the job"),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application already decided")
    )
)]
#[axum::debug_handler]
pub async fn decide(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecisionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let application = state
        .application_service
        .decide(id, claims.user_id()?, claims.primary_role(), payload)
        .await?;
    Ok(Json(application))
}

#[utoipa::path(
    get,
    path = "/api/applications/mine",
    responses(
        (status = 200, description = "Caller's applications")
    )
)]
#[axum::debug_handler]
pub async fn my_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let applications = state
        .application_service
        .list_for_applicant(claims.user_id()?, MY_APPLICATIONS_LIMIT)
        .await?;
    Ok(Json(applications))
}
