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
    dto::profile_dto::{CompletionPayload, HirePayload, UpdateProfessionalPayload},
    error::Result,
    middleware::auth::Claims,
    utils::extract::{Json, Path},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/profiles/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Public profile"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let profile = state.profile_service.public_profile(id).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    post,
    path = "/api/profiles/hire",
    request_body = HirePayload,
    responses(
        (status = 201, description = "Hire recorded"),
        (status = 404, description = "Artisan not found")
    )
)]
#[axum::debug_handler]
pub async fn hire(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<HirePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let action = state
        .profile_service
        .hire(claims.user_id()?, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(action)))
}

#[utoipa::path(
    put,
    path = "/api/profiles/professional/me",
    request_body = UpdateProfessionalPayload,
    responses(
        (status = 200, description = "Updated professional profile"),
        (status = 404, description = "Professional profile not found")
    )
)]
#[axum::debug_handler]
pub async fn update_professional(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfessionalPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let profile = state
        .profile_service
        .update_professional(claims.user_id()?, payload)
        .await?;
    Ok(Json(profile))
}

#[utoipa::path(
    post,
    path = "/api/profiles/professional/completion",
    request_body = CompletionPayload,
    responses(
        (status = 200, description = "Completion stored")
    )
)]
#[axum::debug_handler]
pub async fn set_completion(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CompletionPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let completion = state
        .profile_service
        .set_completion(claims.user_id()?, payload.completion)
        .await?;
    Ok(Json(json!({ "completion": completion })))
}
