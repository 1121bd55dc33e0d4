use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::job_dto::{CreateJobPayload, JobListQuery},
    error::Result,
    middleware::auth::Claims,
    utils::extract::{Json, Path, Query},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/jobs",
    params(
        ("categoryId" = Option<Uuid>, Query, description = "Service category"),
        ("location" = Option<String>, Query, description = "Case-insensitive location match"),
        ("search" = Option<String>, Query, description = "Title or description search"),
        ("status" = Option<String>, Query, description = "OPEN or CLOSED")
    ),
    responses(
        (status = 200, description = "Jobs, newest first")
    )
)]
#[axum::debug_handler]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<impl IntoResponse> {
    let jobs = state.job_service.list(query).await?;
    Ok(Json(jobs))
}

#[utoipa::path(
    post,
    path = "/api/jobs",
    request_body = CreateJobPayload,
    responses(
        (status = 201, description = "Job posted"),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Employers only")
    )
)]
#[axum::debug_handler]
pub async fn create_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateJobPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let job = state.job_service.create(claims.user_id()?, payload).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

#[utoipa::path(
    get,
    path = "/api/jobs/{id}",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job with applications"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state.job_service.detail(id).await?;
    Ok(Json(job))
}

#[utoipa::path(
    post,
    path = "/api/jobs/{id}/close",
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job closed"),
        (status = 403, description = "Not the job owner"),
        (status = 404, description = "Job not found")
    )
)]
#[axum::debug_handler]
pub async fn close_job(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let job = state
        .job_service
        .close(id, claims.user_id()?, claims.primary_role())
        .await?;
    Ok(Json(job))
}
