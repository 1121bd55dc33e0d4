use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::auth_dto::{LoginPayload, RegisterMerchantPayload},
    error::{Error, Result},
    middleware::auth::{Claims, TokenKind},
    routes::{auth::login_response, request_meta},
    services::merchant_service::MerchantLogin,
    utils::extract::Json,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/merchants/register",
    request_body = RegisterMerchantPayload,
    responses(
        (status = 201, description = "Merchant registered"),
        (status = 409, description = "Email already registered")
    )
)]
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterMerchantPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let response = state
        .merchant_service
        .register(payload, &request_meta(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/merchants/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Signed in"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account locked")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginPayload>,
) -> Result<Response> {
    payload.validate()?;
    let outcome = state
        .merchant_service
        .login(payload, &request_meta(&headers))
        .await?;
    Ok(match outcome {
        MerchantLogin::Success(auth) => Json(auth).into_response(),
        MerchantLogin::Rejected(rejection) => login_response(rejection),
    })
}

#[utoipa::path(
    get,
    path = "/api/merchants/me",
    responses(
        (status = 200, description = "Current merchant"),
        (status = 403, description = "Not a merchant token")
    )
)]
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    if claims.kind != TokenKind::Merchant {
        return Err(Error::Forbidden("Merchant access required".to_string()));
    }
    let merchant = state.merchant_service.get(claims.subject_id()?).await?;
    Ok(Json(json!({ "merchant": merchant })))
}
