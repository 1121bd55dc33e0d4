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
    dto::consultation_dto::{
        BankAccountPayload, ProfessionalListQuery, RegisterConsultationProfessionalPayload,
        UpdateConsultationProfilePayload, UpdateWithdrawalPayload, VerifyBankPayload,
        WithdrawPayload,
    },
    error::Result,
    middleware::auth::Claims,
    models::user::Role,
    utils::extract::{Json, Path, Query},
    AppState,
};

/// Roles carried by the token, primary role first.
fn token_roles(claims: &Claims) -> Vec<Role> {
    let mut roles: Vec<Role> = claims.primary_role().into_iter().collect();
    for role in claims.roles.iter().filter_map(|r| r.parse::<Role>().ok()) {
        if !roles.contains(&role) {
            roles.push(role);
        }
    }
    roles
}

#[utoipa::path(
    get,
    path = "/api/consultation/professionals",
    params(
        ("profession" = Option<String>, Query, description = "DOCTOR or LAWYER")
    ),
    responses(
        (status = 200, description = "Active verified professionals")
    )
)]
#[axum::debug_handler]
pub async fn list_professionals(
    State(state): State<AppState>,
    Query(query): Query<ProfessionalListQuery>,
) -> Result<impl IntoResponse> {
    let professionals = state.professional_service.list(query).await?;
    Ok(Json(professionals))
}

#[utoipa::path(
    get,
    path = "/api/consultation/professionals/{id}",
    params(
        ("id" = Uuid, Path, description = "Consultation professional ID")
    ),
    responses(
        (status = 200, description = "Professional with latest reviews"),
        (status = 404, description = "Professional not found")
    )
)]
#[axum::debug_handler]
pub async fn get_professional(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let detail = state.professional_service.detail(id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    get,
    path = "/api/consultation/professionals/profile",
    responses(
        (status = 200, description = "Caller's consultation profile"),
        (status = 404, description = "Professional profile not found")
    )
)]
#[axum::debug_handler]
pub async fn get_own_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let profile = state.professional_service.profile(claims.user_id()?).await?;
    Ok(Json(profile))
}

#[utoipa::path(
    put,
    path = "/api/consultation/professionals/profile",
    request_body = UpdateConsultationProfilePayload,
    responses(
        (status = 200, description = "Profile updated"),
        (status = 404, description = "Professional profile not found")
    )
)]
#[axum::debug_handler]
pub async fn update_own_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateConsultationProfilePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let profile = state
        .professional_service
        .update_profile(claims.user_id()?, payload)
        .await?;
    Ok(Json(profile))
}

#[utoipa::path(
    post,
    path = "/api/consultation/professionals/verify-bank",
    request_body = VerifyBankPayload,
    responses(
        (status = 200, description = "Account resolved"),
        (status = 400, description = "Account could not be resolved")
    )
)]
#[axum::debug_handler]
pub async fn verify_bank(
    State(state): State<AppState>,
    Json(payload): Json<VerifyBankPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let resolved = state.professional_service.verify_bank(payload).await?;
    Ok(Json(resolved))
}

#[utoipa::path(
    post,
    path = "/api/consultation/professionals/bank-account",
    request_body = BankAccountPayload,
    responses(
        (status = 200, description = "Bank details saved"),
        (status = 404, description = "Professional profile not found")
    )
)]
#[axum::debug_handler]
pub async fn save_bank_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<BankAccountPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let profile = state
        .professional_service
        .save_bank_account(claims.user_id()?, payload)
        .await?;
    Ok(Json(json!({ "message": "Bank details saved", "professional": profile })))
}

#[utoipa::path(
    get,
    path = "/api/consultation/professionals/banks",
    responses(
        (status = 200, description = "Supported banks")
    )
)]
#[axum::debug_handler]
pub async fn list_banks(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.professional_service.banks()))
}

#[utoipa::path(
    get,
    path = "/api/consultation/professionals/earnings",
    responses(
        (status = 200, description = "Earnings summary in kobo")
    )
)]
#[axum::debug_handler]
pub async fn earnings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let summary = state.professional_service.earnings(claims.user_id()?).await?;
    Ok(Json(summary))
}

#[utoipa::path(
    post,
    path = "/api/consultation/professionals/withdraw",
    request_body = WithdrawPayload,
    responses(
        (status = 201, description = "Withdrawal requested"),
        (status = 400, description = "Below minimum, no bank details, or insufficient balance")
    )
)]
#[axum::debug_handler]
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<WithdrawPayload>,
) -> Result<impl IntoResponse> {
    let withdrawal = state
        .professional_service
        .withdraw(claims.user_id()?, payload.amount)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Withdrawal request submitted", "withdrawal": withdrawal })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/consultation/professionals/withdrawals",
    responses(
        (status = 200, description = "Latest withdrawals")
    )
)]
#[axum::debug_handler]
pub async fn list_withdrawals(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let withdrawals = state
        .professional_service
        .withdrawals(claims.user_id()?)
        .await?;
    Ok(Json(withdrawals))
}

#[utoipa::path(
    patch,
    path = "/api/consultation/professionals/withdrawals/{id}",
    params(
        ("id" = Uuid, Path, description = "Withdrawal ID")
    ),
    request_body = UpdateWithdrawalPayload,
    responses(
        (status = 200, description = "Withdrawal updated"),
        (status = 404, description = "Withdrawal not found"),
        (status = 409, description = "Withdrawal already completed or failed")
    )
)]
#[axum::debug_handler]
pub async fn update_withdrawal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWithdrawalPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let withdrawal = state
        .professional_service
        .update_withdrawal(id, payload)
        .await?;
    Ok(Json(withdrawal))
}

#[utoipa::path(
    post,
    path = "/api/consultation/register",
    request_body = RegisterConsultationProfessionalPayload,
    responses(
        (status = 201, description = "Registered, pending manual review"),
        (status = 403, description = "Token carries no doctor or lawyer role"),
        (status = 409, description = "Already registered")
    )
)]
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RegisterConsultationProfessionalPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let professional = state
        .professional_service
        .register(claims.user_id()?, &token_roles(&claims), payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration submitted. Your license will be reviewed shortly.",
            "professional": professional,
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/consultation/register/status",
    responses(
        (status = 200, description = "Registration status")
    )
)]
#[axum::debug_handler]
pub async fn registration_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let status = state
        .professional_service
        .registration_status(claims.user_id()?)
        .await?;
    Ok(Json(status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::TokenKind;

    #[test]
    fn token_roles_merge_primary_and_extra_roles() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: 0,
            role: Some("CLIENT".to_string()),
            roles: vec!["DOCTOR".to_string(), "CLIENT".to_string(), "bogus".to_string()],
            email: None,
            kind: TokenKind::User,
            anonymous_id: None,
        };
        assert_eq!(token_roles(&claims), vec![Role::Client, Role::Doctor]);
    }
}
