use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::consultation_dto::{ConsultationReviewPayload, CrossBookPayload},
    error::Result,
    middleware::auth::Claims,
    utils::extract::{Json, Path},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/consultations/{id}/reviews",
    params(
        ("id" = Uuid, Path, description = "Consultation ID")
    ),
    request_body = ConsultationReviewPayload,
    responses(
        (status = 201, description = "Review saved"),
        (status = 403, description = "Caller is not the client"),
        (status = 404, description = "Consultation not found")
    )
)]
#[axum::debug_handler]
pub async fn review_consultation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConsultationReviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let review = state
        .consultation_service
        .review(claims.user_id()?, id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

#[utoipa::path(
    get,
    path = "/api/consultations/professionals/{professional_id}/reviews",
    params(
        ("professional_id" = Uuid, Path, description = "Professional user ID")
    ),
    responses(
        (status = 200, description = "Average rating and latest reviews")
    )
)]
#[axum::debug_handler]
pub async fn professional_reviews(
    State(state): State<AppState>,
    Path(professional_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let reviews = state
        .consultation_service
        .reviews_for(professional_id)
        .await?;
    Ok(Json(reviews))
}

#[utoipa::path(
    post,
    path = "/api/consultations/cross-book",
    request_body = CrossBookPayload,
    responses(
        (status = 201, description = "Consultation booked"),
        (status = 400, description = "Same profession as the requester"),
        (status = 403, description = "Requester is not a doctor or lawyer"),
        (status = 404, description = "No professional available")
    )
)]
#[axum::debug_handler]
pub async fn cross_book(
    State(state): State<AppState>,
    Json(payload): Json<CrossBookPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let booking = state.consultation_service.cross_book(payload).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}
