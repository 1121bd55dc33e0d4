use axum::{
    extract::State,
    response::IntoResponse,
    Extension,
};

use crate::{error::Result, middleware::auth::Claims, utils::extract::Json, AppState};

#[utoipa::path(
    get,
    path = "/api/dashboard/professional",
    responses(
        (status = 200, description = "Profile, consultations, wallet and stats"),
        (status = 404, description = "Professional profile not found")
    )
)]
#[axum::debug_handler]
pub async fn professional(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let dashboard = state
        .dashboard_service
        .professional(claims.user_id()?)
        .await?;
    Ok(Json(dashboard))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/employer",
    responses(
        (status = 200, description = "Recent jobs and accepted hires")
    )
)]
#[axum::debug_handler]
pub async fn employer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let dashboard = state.dashboard_service.employer(claims.user_id()?).await?;
    Ok(Json(dashboard))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/artisan",
    responses(
        (status = 200, description = "Profile and recent applications"),
        (status = 404, description = "Artisan profile not found")
    )
)]
#[axum::debug_handler]
pub async fn artisan(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let dashboard = state.dashboard_service.artisan(claims.user_id()?).await?;
    Ok(Json(dashboard))
}
