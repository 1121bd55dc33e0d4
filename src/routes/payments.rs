use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension,
};
use serde_json::{json, Value as JsonValue};
use validator::Validate;

use crate::{
    dto::payment_dto::{
        ApplyListingPayload, InitiatePublicPayload, VerifyPaymentPayload, VerifyPublicPayload,
    },
    error::{Error, Result},
    middleware::auth::Claims,
    services::payment_service::Settlement,
    utils::extract::Json,
    AppState,
};

const SIGNATURE_HEADER: &str = "x-paystack-signature";

fn settlement_body(settlement: Settlement) -> JsonValue {
    match settlement {
        Settlement::Credited { balance } => json!({
            "message": "Payment verified and wallet credited",
            "walletBalance": balance,
        }),
        Settlement::AlreadySettled => json!({
            "message": "Payment already verified",
        }),
    }
}

#[utoipa::path(
    post,
    path = "/api/payments/professional/apply",
    request_body = ApplyListingPayload,
    responses(
        (status = 200, description = "Gateway transaction initialised"),
        (status = 502, description = "Gateway unavailable")
    )
)]
#[axum::debug_handler]
pub async fn apply(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ApplyListingPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let response = state
        .payment_service
        .apply(claims.user_id()?, claims.email.as_deref(), payload)
        .await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/payments/professional/initiate-public",
    request_body = InitiatePublicPayload,
    responses(
        (status = 200, description = "Gateway transaction initialised"),
        (status = 404, description = "No professional with that email and profession")
    )
)]
#[axum::debug_handler]
pub async fn initiate_public(
    State(state): State<AppState>,
    Json(payload): Json<InitiatePublicPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let response = state.payment_service.initiate_public(payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/payments/verify",
    request_body = VerifyPaymentPayload,
    responses(
        (status = 200, description = "Payment settled"),
        (status = 404, description = "Unknown reference"),
        (status = 409, description = "Payment not successful")
    )
)]
#[axum::debug_handler]
pub async fn verify(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<VerifyPaymentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let settlement = state
        .payment_service
        .verify(claims.user_id()?, &payload.reference)
        .await?;
    Ok(Json(settlement_body(settlement)))
}

#[utoipa::path(
    post,
    path = "/api/payments/professional/verify-public",
    request_body = VerifyPublicPayload,
    responses(
        (status = 200, description = "Payment settled and listing activated"),
        (status = 404, description = "Unknown user or reference"),
        (status = 409, description = "Payment not successful")
    )
)]
#[axum::debug_handler]
pub async fn verify_public(
    State(state): State<AppState>,
    Json(payload): Json<VerifyPublicPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let settlement = state.payment_service.verify_public(payload).await?;
    Ok(Json(settlement_body(settlement)))
}

#[utoipa::path(
    post,
    path = "/api/payments/webhook",
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 401, description = "Invalid signature")
    )
)]
#[axum::debug_handler]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::Unauthorized("Missing webhook signature".to_string()))?;
    let settled = state.payment_service.handle_webhook(&body, signature).await?;
    let body = match settled {
        Some(settlement) => settlement_body(settlement),
        None => json!({ "message": "Event ignored" }),
    };
    Ok((StatusCode::OK, Json(body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_bodies_report_the_balance_once() {
        let credited = settlement_body(Settlement::Credited { balance: 250_000 });
        assert_eq!(credited["walletBalance"], 250_000);
        let repeat = settlement_body(Settlement::AlreadySettled);
        assert!(repeat.get("walletBalance").is_none());
    }
}
