pub mod alerts;
pub mod applications;
pub mod auth;
pub mod catalog;
pub mod client_errors;
pub mod consultation_payment;
pub mod consultation_professionals;
pub mod consultation_sessions;
pub mod consultations;
pub mod dashboard;
pub mod health;
pub mod jobs;
pub mod merchants;
pub mod notifications;
pub mod payments;
pub mod profiles;
pub mod verification;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderMap,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{
    config::get_config,
    middleware::{
        auth::{
            require_admin, require_artisan, require_bearer_auth, require_employer,
            require_license_checker, require_professional, require_user, require_worker,
        },
        cors::{client_cors, security_headers},
        rate_limit::{new_rps_state, rps_middleware},
    },
    services::audit_service::RequestMeta,
    utils::request::{client_ip, user_agent},
    AppState,
};

pub(crate) fn request_meta(headers: &HeaderMap) -> RequestMeta {
    RequestMeta {
        ip: client_ip(headers),
        user_agent: user_agent(headers),
    }
}

/// Full HTTP surface with every middleware layer applied.
pub fn router(state: AppState) -> Router {
    let config = get_config();

    let auth_api = Router::new()
        .route("/api/auth/register-client", post(auth::register_client))
        .route("/api/auth/register-professional", post(auth::register_professional))
        .route("/api/auth/register-worker", post(auth::register_worker))
        .route("/api/auth/register-employer", post(auth::register_employer))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/verify-email", post(auth::verify_email))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/merchants/register", post(merchants::register))
        .route("/api/merchants/login", post(merchants::login))
        .layer(from_fn_with_state(new_rps_state(config.auth_rps), rps_middleware));

    let public_api = Router::new()
        .route("/api/jobs", get(jobs::list_jobs))
        .route("/api/jobs/:id", get(jobs::get_job))
        .route("/api/services/categories", get(catalog::list_categories))
        .route("/api/services/providers", get(catalog::list_providers))
        .route("/api/profiles/:id", get(profiles::get_profile))
        .route(
            "/api/payments/professional/initiate-public",
            post(payments::initiate_public),
        )
        .route(
            "/api/payments/professional/verify-public",
            post(payments::verify_public),
        )
        .route("/api/payments/webhook", post(payments::webhook))
        .route(
            "/api/consultation/payment/initialize",
            post(consultation_payment::initialize),
        )
        .route(
            "/api/consultation/payment/verify",
            get(consultation_payment::verify),
        )
        .route(
            "/api/consultation/professionals",
            get(consultation_professionals::list_professionals),
        )
        .route(
            "/api/consultation/professionals/banks",
            get(consultation_professionals::list_banks),
        )
        .route(
            "/api/consultation/professionals/:id",
            get(consultation_professionals::get_professional),
        )
        .route(
            "/api/consultations/professionals/:professional_id/reviews",
            get(consultations::professional_reviews),
        )
        .route("/api/consultations/cross-book", post(consultations::cross_book))
        .route("/api/errors/log", post(client_errors::log_client_error))
        .layer(from_fn_with_state(new_rps_state(config.public_rps), rps_middleware));

    let user_api = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/applications/mine", get(applications::my_applications))
        .route(
            "/api/alerts",
            get(alerts::list_alerts).post(alerts::create_alert),
        )
        .route("/api/alerts/:id", delete(alerts::delete_alert))
        .route("/api/notifications", get(notifications::list_notifications))
        .route("/api/notifications/:id/read", post(notifications::mark_read))
        .route("/api/verification", post(verification::submit))
        .route("/api/verification/status", get(verification::status))
        .route("/api/payments/verify", post(payments::verify))
        .route(
            "/api/consultations/:id/reviews",
            post(consultations::review_consultation),
        )
        .route(
            "/api/consultation/professionals/profile",
            get(consultation_professionals::get_own_profile)
                .put(consultation_professionals::update_own_profile),
        )
        .route(
            "/api/consultation/professionals/verify-bank",
            post(consultation_professionals::verify_bank),
        )
        .route(
            "/api/consultation/professionals/bank-account",
            post(consultation_professionals::save_bank_account),
        )
        .route(
            "/api/consultation/professionals/earnings",
            get(consultation_professionals::earnings),
        )
        .route(
            "/api/consultation/professionals/withdraw",
            post(consultation_professionals::withdraw),
        )
        .route(
            "/api/consultation/professionals/withdrawals",
            get(consultation_professionals::list_withdrawals),
        )
        .route(
            "/api/consultation/register",
            post(consultation_professionals::register),
        )
        .route(
            "/api/consultation/register/status",
            get(consultation_professionals::registration_status),
        )
        .layer(from_fn(require_user));

    let bearer_api = Router::new()
        .route("/api/merchants/me", get(merchants::me))
        .route(
            "/api/consultation/sessions/:session_id",
            get(consultation_sessions::get_session),
        )
        .route(
            "/api/consultation/sessions/:session_id/messages",
            get(consultation_sessions::list_messages).post(consultation_sessions::send_message),
        )
        .route(
            "/api/consultation/sessions/:session_id/end",
            post(consultation_sessions::end_session),
        )
        .route(
            "/api/consultation/sessions/:session_id/review",
            post(consultation_sessions::review_session),
        )
        .layer(from_fn(require_bearer_auth));

    let employer_api = Router::new()
        .route("/api/jobs", post(jobs::create_job))
        .route("/api/jobs/:id/close", post(jobs::close_job))
        .route("/api/applications/:id/decision", post(applications::decide))
        .route("/api/profiles/hire", post(profiles::hire))
        .route("/api/dashboard/employer", get(dashboard::employer))
        .layer(from_fn(require_employer));

    let worker_api = Router::new()
        .route("/api/applications", post(applications::apply))
        .route("/api/services/providers/subscribe", post(catalog::subscribe))
        .route("/api/payments/professional/apply", post(payments::apply))
        .layer(from_fn(require_worker));

    let artisan_api = Router::new()
        .route("/api/dashboard/artisan", get(dashboard::artisan))
        .layer(from_fn(require_artisan));

    let professional_api = Router::new()
        .route(
            "/api/profiles/professional/me",
            put(profiles::update_professional),
        )
        .route(
            "/api/profiles/professional/completion",
            post(profiles::set_completion),
        )
        .route("/api/verification/license", post(verification::submit_license))
        .route(
            "/api/consultation/dashboard/professional",
            get(consultation_sessions::professional_dashboard),
        )
        .route("/api/dashboard/professional", get(dashboard::professional))
        .layer(from_fn(require_professional));

    let license_api = Router::new()
        .route(
            "/api/verification/license/check",
            post(verification::check_license),
        )
        .layer(from_fn(require_license_checker));

    let admin_api = Router::new()
        .route(
            "/api/verification/license/queue",
            get(verification::license_queue),
        )
        .route(
            "/api/consultation/professionals/withdrawals/:id",
            patch(consultation_professionals::update_withdrawal),
        )
        .layer(from_fn(require_admin));

    let mut app = Router::new()
        .route("/health", get(health::health))
        .route("/ws/notifications", get(notifications::notifications_socket))
        .merge(auth_api)
        .merge(public_api)
        .merge(user_api)
        .merge(bearer_api)
        .merge(employer_api)
        .merge(worker_api)
        .merge(artisan_api)
        .merge(professional_api)
        .merge(license_api)
        .merge(admin_api)
        .fallback(health::not_found)
        .with_state(state);

    for header in security_headers() {
        app = app.layer(header);
    }

    app.layer(client_cors(&config.client_origins))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
}
