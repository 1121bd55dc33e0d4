use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    dto::consultation_dto::{InitializeConsultationPayload, ReferenceQuery},
    error::Result,
    services::consultation_payment_service::VerifiedSession,
    utils::extract::{Json, Query},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/consultation/payment/initialize",
    request_body = InitializeConsultationPayload,
    responses(
        (status = 200, description = "Payment page created"),
        (status = 400, description = "Missing professional or invalid email"),
        (status = 404, description = "Professional not found")
    )
)]
#[axum::debug_handler]
pub async fn initialize(
    State(state): State<AppState>,
    Json(payload): Json<InitializeConsultationPayload>,
) -> Result<impl IntoResponse> {
    let response = state.consultation_payment_service.initialize(payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/consultation/payment/verify",
    params(
        ("reference" = String, Query, description = "Gateway reference")
    ),
    responses(
        (status = 200, description = "Session already opened for this payment"),
        (status = 201, description = "Session opened"),
        (status = 400, description = "Payment not successful or amount mismatch")
    )
)]
#[axum::debug_handler]
pub async fn verify(
    State(state): State<AppState>,
    Query(query): Query<ReferenceQuery>,
) -> Result<impl IntoResponse> {
    let verified = state
        .consultation_payment_service
        .verify(query.reference.as_deref())
        .await?;
    Ok(match verified {
        VerifiedSession::Existing(access) => (StatusCode::OK, Json(access)),
        VerifiedSession::Created(access) => (StatusCode::CREATED, Json(access)),
    })
}
