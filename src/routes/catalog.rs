use axum::{
    extract::State,
    response::IntoResponse,
    Extension,
};
use validator::Validate;

use crate::{
    dto::catalog_dto::{ProvidersQuery, SubscribePayload},
    error::Result,
    middleware::auth::Claims,
    utils::extract::{Json, Query},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/services/categories",
    responses(
        (status = 200, description = "Service categories with artisan and job counts")
    )
)]
#[axum::debug_handler]
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let categories = state.catalog_service.categories().await?;
    Ok(Json(categories))
}

#[utoipa::path(
    get,
    path = "/api/services/providers",
    params(
        ("categoryId" = Option<String>, Query, description = "Service category UUID"),
        ("includeUnverified" = Option<bool>, Query, description = "Include providers without a verified badge")
    ),
    responses(
        (status = 200, description = "Subscribed providers")
    )
)]
#[axum::debug_handler]
pub async fn list_providers(
    State(state): State<AppState>,
    Query(query): Query<ProvidersQuery>,
) -> Result<impl IntoResponse> {
    let providers = state.catalog_service.providers(query).await?;
    Ok(Json(providers))
}

#[utoipa::path(
    post,
    path = "/api/services/providers/subscribe",
    request_body = SubscribePayload,
    responses(
        (status = 200, description = "Provider subscription saved"),
        (status = 404, description = "Unknown category")
    )
)]
#[axum::debug_handler]
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubscribePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let profile = state
        .catalog_service
        .subscribe(claims.user_id()?, payload)
        .await?;
    Ok(Json(profile))
}
