use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::auth_dto::{
        ForgotPasswordPayload, LoginPayload, RegisterClientPayload, RegisterEmployerPayload,
        RegisterProfessionalPayload, RegisterWorkerPayload, ResetPasswordPayload,
        VerifyEmailPayload,
    },
    error::Result,
    middleware::auth::Claims,
    routes::request_meta,
    services::auth_service::{collect_roles, LoginOutcome, WorkerRegistration},
    utils::extract::Json,
    AppState,
};

/// Maps a login outcome onto its status code and body.
pub(crate) fn login_response(outcome: LoginOutcome) -> Response {
    match outcome {
        LoginOutcome::Success(auth) => Json(auth).into_response(),
        LoginOutcome::InvalidCredentials { attempts_remaining } => {
            let mut body = json!({ "error": "Invalid email or password" });
            if let Some(remaining) = attempts_remaining {
                body["attemptsRemaining"] = json!(remaining);
            }
            (StatusCode::UNAUTHORIZED, Json(body)).into_response()
        }
        LoginOutcome::Locked {
            locked_until,
            minutes,
        } => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": format!("Account locked. Try again in {} minutes.", minutes),
                "lockedUntil": locked_until,
            })),
        )
            .into_response(),
        LoginOutcome::EmailUnverified => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Please verify your email before logging in" })),
        )
            .into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/register-client",
    request_body = RegisterClientPayload,
    responses(
        (status = 201, description = "Client registered, email verification pending"),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    )
)]
#[axum::debug_handler]
pub async fn register_client(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterClientPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let response = state
        .auth_service
        .register_client(payload, &request_meta(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/auth/register-professional",
    request_body = RegisterProfessionalPayload,
    responses(
        (status = 201, description = "Doctor or lawyer registered with an unverified licence"),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    )
)]
#[axum::debug_handler]
pub async fn register_professional(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterProfessionalPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let response = state
        .auth_service
        .register_professional(payload, &request_meta(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/auth/register-worker",
    request_body = RegisterWorkerPayload,
    responses(
        (status = 201, description = "Worker account created"),
        (status = 200, description = "Existing account granted worker access"),
        (status = 409, description = "Already a worker or phone in use")
    )
)]
#[axum::debug_handler]
pub async fn register_worker(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterWorkerPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let outcome = state
        .auth_service
        .register_worker(payload, &request_meta(&headers))
        .await?;
    Ok(match outcome {
        WorkerRegistration::Created(auth) => (StatusCode::CREATED, Json(auth)),
        WorkerRegistration::Upgraded(auth) => (StatusCode::OK, Json(auth)),
    })
}

#[utoipa::path(
    post,
    path = "/api/auth/register-employer",
    request_body = RegisterEmployerPayload,
    responses(
        (status = 201, description = "Employer account created"),
        (status = 409, description = "Email or phone already registered")
    )
)]
#[axum::debug_handler]
pub async fn register_employer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RegisterEmployerPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let auth = state
        .auth_service
        .register_employer(payload, &request_meta(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(auth)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Signed in"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account locked or email unverified")
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
        .auth_service
        .login(payload, &request_meta(&headers))
        .await?;
    Ok(login_response(outcome))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-email",
    request_body = VerifyEmailPayload,
    responses(
        (status = 200, description = "Email verified"),
        (status = 404, description = "Invalid or expired token")
    )
)]
#[axum::debug_handler]
pub async fn verify_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<VerifyEmailPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state
        .auth_service
        .verify_email(payload.token.trim(), &request_meta(&headers))
        .await?;
    Ok(Json(json!({ "message": "Email verified successfully" })))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordPayload,
    responses(
        (status = 200, description = "Reset instructions issued when the account exists")
    )
)]
#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let ticket = state
        .auth_service
        .forgot_password(&payload.email, &request_meta(&headers))
        .await?;
    let mut body = json!({
        "message": "If an account exists for that email, a reset link has been generated."
    });
    if let Some(ticket) = ticket {
        body["resetToken"] = json!(ticket.token);
        body["expiresAt"] = json!(ticket.expires_at);
    }
    Ok(Json(body))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordPayload,
    responses(
        (status = 200, description = "Password reset"),
        (status = 400, description = "Invalid or expired token")
    )
)]
#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state
        .auth_service
        .reset_password(payload.token.trim(), &payload.password, &request_meta(&headers))
        .await?;
    Ok(Json(json!({ "message": "Password reset successfully" })))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user with roles"),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user = state.auth_service.get_user(claims.user_id()?).await?;
    let roles = collect_roles(&user);
    Ok(Json(json!({ "user": user, "roles": roles })))
}
