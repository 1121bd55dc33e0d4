mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::json;
use sirius_jobs_backend::middleware::auth::{issue_merchant_token, issue_session_token};
use uuid::Uuid;

use common::{empty_request, json_request, lazy_app, send, user_token};

#[tokio::test]
async fn health_reports_ok_with_timestamp() {
    let app = lazy_app();
    let (status, body) = send(&app, empty_request("GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn unknown_routes_get_a_json_404() {
    let app = lazy_app();
    let (status, body) = send(&app, empty_request("GET", "/api/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Route not found");
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = lazy_app();
    let job = json!({
        "title": "Fix kitchen sink",
        "description": "Leaking pipe under the kitchen sink needs replacing",
        "location": "Lagos",
        "serviceCategoryId": Uuid::new_v4(),
    });
    let (status, _) = send(&app, json_request("POST", "/api/jobs", None, job)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, empty_request("GET", "/api/auth/me", Some("not-a-jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn role_guards_reject_other_roles() {
    let app = lazy_app();
    let (_, client) = user_token("CLIENT", &[]);
    let job = json!({
        "title": "Fix kitchen sink",
        "description": "Leaking pipe under the kitchen sink needs replacing",
        "location": "Lagos",
        "serviceCategoryId": Uuid::new_v4(),
    });
    let (status, _) = send(&app, json_request("POST", "/api/jobs", Some(&client), job)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, employer) = user_token("EMPLOYER", &[]);
    let (status, _) = send(&app, empty_request("GET", "/api/dashboard/artisan", Some(&employer))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        empty_request("GET", "/api/verification/license/queue", Some(&employer)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let merchant = issue_merchant_token(Uuid::new_v4(), "shop@example.com").unwrap();
    let (status, _) = send(&app, empty_request("GET", "/api/auth/me", Some(&merchant))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn merchant_profile_needs_a_merchant_token() {
    let app = lazy_app();
    let (_, client) = user_token("CLIENT", &[]);
    let (status, body) = send(&app, empty_request("GET", "/api/merchants/me", Some(&client))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Merchant access required");
}

#[tokio::test]
async fn invalid_payloads_are_rejected_before_storage() {
    let app = lazy_app();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/auth/register-client",
            None,
            json!({
                "firstName": "Ada",
                "lastName": "Obi",
                "email": "not-an-email",
                "password": "longenough",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (_, employer) = user_token("EMPLOYER", &[]);
    let short_job = json!({
        "title": "Fix",
        "description": "too short",
        "location": "Lagos",
        "serviceCategoryId": Uuid::new_v4(),
    });
    let (status, _) = send(&app, json_request("POST", "/api/jobs", Some(&employer), short_job)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/consultations/cross-book",
            None,
            json!({
                "professionalEmail": "doc@example.com",
                "targetProfession": "LAWYER",
                "reason": "short",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_tokens_are_bound_to_their_session() {
    let app = lazy_app();
    let session_id = Uuid::new_v4();
    let ends_at = Utc::now() + Duration::hours(24);
    let token = issue_session_token(session_id, "anon_test", ends_at).unwrap();

    let too_long = "a".repeat(2001);
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/consultation/sessions/{}/messages", session_id),
            Some(&token),
            json!({ "content": too_long }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("2000"));

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/consultation/sessions/{}/messages", session_id),
            Some(&token),
            json!({ "content": "   " }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let other_session = Uuid::new_v4();
    let (status, _) = send(
        &app,
        empty_request(
            "GET",
            &format!("/api/consultation/sessions/{}/messages", other_session),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, professional) = user_token("DOCTOR", &[]);
    let (status, _) = send(
        &app,
        empty_request(
            "GET",
            &format!("/api/consultation/sessions/{}", session_id),
            Some(&professional),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn webhook_rejects_bad_signatures() {
    let app = lazy_app();
    let event = json!({ "event": "charge.success", "data": { "reference": "PRO-DOCTOR-1" } });

    let (status, _) = send(&app, json_request("POST", "/api/payments/webhook", None, event.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let mut req = json_request("POST", "/api/payments/webhook", None, event);
    req.headers_mut()
        .insert("x-paystack-signature", "deadbeef".parse().unwrap());
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn withdrawals_below_the_minimum_are_refused() {
    let app = lazy_app();
    let (_, doctor) = user_token("DOCTOR", &[]);
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/consultation/professionals/withdraw",
            Some(&doctor),
            json!({ "amount": 100_000 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Minimum withdrawal amount is ₦5,000");
}

#[tokio::test]
async fn consultation_payment_inputs_are_checked() {
    let app = lazy_app();
    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/consultation/payment/initialize",
            None,
            json!({ "clientEmail": "client@example.com" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/consultation/payment/initialize",
            None,
            json!({ "professionalId": Uuid::new_v4(), "clientEmail": "nope" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, empty_request("GET", "/api/consultation/payment/verify", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Payment reference is required");
}

#[tokio::test]
async fn dashboard_rejects_unknown_status_filters() {
    let app = lazy_app();
    let (_, lawyer) = user_token("LAWYER", &[]);
    let (status, _) = send(
        &app,
        empty_request(
            "GET",
            "/api/consultation/dashboard/professional?status=bogus",
            Some(&lawyer),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn extra_roles_in_the_token_are_honoured() {
    let app = lazy_app();
    let (_, token) = user_token("CLIENT", &["ADMIN"]);
    let (status, body) = send(
        &app,
        empty_request("GET", "/api/verification/license/queue", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn static_reference_data_needs_no_database() {
    let app = lazy_app();
    let (status, body) = send(&app, empty_request("GET", "/api/consultation/professionals/banks", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().is_some_and(|banks| !banks.is_empty()));

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/errors/log",
            None,
            json!({ "message": "TypeError: x is undefined", "url": "/jobs" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn malformed_requests_get_a_json_400() {
    let app = lazy_app();

    let (status, body) = send(
        &app,
        json_request("POST", "/api/auth/login", None, json!({ "email": "a@b.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("password"));

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/consultations/cross-book",
            None,
            json!({
                "professionalEmail": "doc@example.com",
                "targetProfession": "NURSE",
                "clientName": "Ada Obi",
                "clientEmail": "ada@example.com",
                "reason": "Needs a second opinion on a contract",
                "mode": "VIDEO",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("NURSE"));

    let broken = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header("content-type", "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let (status, body) = send(&app, broken).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, empty_request("GET", "/api/jobs/not-a-uuid", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, empty_request("GET", "/api/jobs?status=BOGUS", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let session_id = Uuid::new_v4();
    let token = issue_session_token(session_id, "anon_test", Utc::now() + Duration::hours(1)).unwrap();
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/consultation/sessions/{}/messages", session_id),
            Some(&token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
