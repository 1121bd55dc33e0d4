//! End-to-end flows against a live Postgres. Run with
//! `cargo test -- --ignored` and `DATABASE_URL` pointing at a scratch database.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value as JsonValue};
use sirius_jobs_backend::{
    database::pool::create_pool,
    error::{Error, Result},
    middleware::auth::issue_session_token,
    routes,
    services::{
        escrow::CONSULTATION_FEE,
        payment_gateway::{
            InitializeTransaction, InitializedTransaction, PaymentGateway, ResolvedAccount,
            VerifiedTransaction,
        },
        payment_service::LISTING_WALLET_CREDIT,
        session_service::SessionService,
    },
    utils::signature::sign_payload,
    AppState,
};
use sqlx::PgPool;
use tokio::task::JoinSet;
use uuid::Uuid;

use common::{empty_request, init_env, json_request, send, user_token, PAYSTACK_TEST_SECRET};

/// Gateway that reports every reference as paid with fixed amount and metadata.
struct PaidGateway {
    amount: i64,
    metadata: JsonValue,
}

#[async_trait]
impl PaymentGateway for PaidGateway {
    async fn initialize(&self, _request: InitializeTransaction) -> Result<InitializedTransaction> {
        Err(Error::Gateway("initialize is not used in these flows".to_string()))
    }

    async fn verify(&self, reference: &str) -> Result<VerifiedTransaction> {
        Ok(VerifiedTransaction {
            status: "success".to_string(),
            amount: self.amount,
            reference: reference.to_string(),
            metadata: Some(self.metadata.clone()),
            gateway_response: Some("Approved".to_string()),
            paid_at: None,
        })
    }

    async fn resolve_account(&self, account_number: &str, _bank_code: &str) -> Result<ResolvedAccount> {
        Ok(ResolvedAccount {
            account_number: account_number.to_string(),
            account_name: "Test Account".to_string(),
        })
    }
}

async fn connect() -> PgPool {
    init_env();
    let pool = create_pool().await.expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

async fn setup() -> (Router, PgPool) {
    let pool = connect().await;
    let state = AppState::new(pool.clone()).expect("state");
    (routes::router(state), pool)
}

fn router_with_gateway(pool: &PgPool, gateway: PaidGateway) -> Router {
    let state = AppState::with_gateway(pool.clone(), Arc::new(gateway)).expect("state");
    routes::router(state)
}

async fn seed_user(pool: &PgPool, role: &str) -> (Uuid, String) {
    let id = Uuid::new_v4();
    let email = format!("{}_{}@example.com", role.to_lowercase(), id);
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, first_name, last_name, role, roles, email_verified)
        VALUES ($1, $2, 'x', 'Test', $3, $3, ARRAY[$3], TRUE)
        "#,
    )
    .bind(id)
    .bind(&email)
    .bind(role)
    .execute(pool)
    .await
    .expect("seed user");
    let token = sirius_jobs_backend::middleware::auth::issue_user_token(
        id,
        role,
        &[role.to_string()],
        &email,
    )
    .expect("token");
    (id, token)
}

async fn seed_professional(pool: &PgPool) -> Uuid {
    seed_professional_account(pool).await.0
}

/// Verified consultation professional plus the owning user's token.
async fn seed_professional_account(pool: &PgPool) -> (Uuid, String) {
    let (user_id, token) = seed_user(pool, "DOCTOR").await;
    let professional_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO consultation_professionals
            (user_id, name, email, profession, specialization, license_number, regulatory_body,
             verification_method, is_verified)
        VALUES ($1, 'Dr Test', $2, 'DOCTOR', 'General practice', 'MDCN-123456', 'MDCN', 'LINK', TRUE)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(format!("dr_{}@example.com", user_id))
    .fetch_one(pool)
    .await
    .expect("seed professional");
    (professional_id, token)
}

async fn seed_session(pool: &PgPool, professional_id: Uuid, ends_at: chrono::DateTime<Utc>) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO consultation_sessions
            (professional_id, client_anonymous_id, payment_reference, amount, platform_fee,
             professional_earning, status, started_at, ends_at)
        VALUES ($1, $2, $3, 300000, 50000, 250000, 'active', $4 - INTERVAL '24 hours', $4)
        RETURNING id
        "#,
    )
    .bind(professional_id)
    .bind(format!("anon_{}", Uuid::new_v4().simple()))
    .bind(format!("CONSULT-TEST-{}", Uuid::new_v4().simple()))
    .bind(ends_at)
    .fetch_one(pool)
    .await
    .expect("seed session")
}

async fn total_earnings(pool: &PgPool, professional_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT total_earnings FROM consultation_professionals WHERE id = $1")
        .bind(professional_id)
        .fetch_one(pool)
        .await
        .expect("earnings")
}

#[tokio::test]
#[ignore]
async fn job_application_and_decision_flow() {
    let (app, pool) = setup().await;
    let (_, employer) = seed_user(&pool, "EMPLOYER").await;
    let (_, other_employer) = seed_user(&pool, "EMPLOYER").await;
    let (_, artisan) = seed_user(&pool, "ARTISAN").await;
    let category_id: Uuid =
        sqlx::query_scalar("SELECT id FROM service_categories WHERE slug = 'plumbing'")
            .fetch_one(&pool)
            .await
            .expect("category");

    let (status, job) = send(
        &app,
        json_request(
            "POST",
            "/api/jobs",
            Some(&employer),
            json!({
                "title": "Fix kitchen sink",
                "description": "Leaking pipe under the kitchen sink needs replacing",
                "location": "Lekki, Lagos",
                "budget": 15000,
                "serviceCategoryId": category_id,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = job["id"].as_str().expect("job id").to_string();

    let (status, listed) = send(&app, empty_request("GET", "/api/jobs?search=kitchen%20sink", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().expect("jobs").iter().any(|j| j["id"] == job["id"]));
    let (status, listed) = send(&app, empty_request("GET", "/api/jobs?search=%25", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!listed.as_array().expect("jobs").iter().any(|j| j["id"] == job["id"]));

    let apply = json!({ "jobId": job_id, "coverLetter": "Ten years of plumbing work in Lagos." });
    let (status, application) =
        send(&app, json_request("POST", "/api/applications", Some(&artisan), apply.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app, json_request("POST", "/api/applications", Some(&artisan), apply)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let decision_uri = format!(
        "/api/applications/{}/decision",
        application["id"].as_str().expect("application id")
    );
    let (status, _) = send(
        &app,
        json_request("POST", &decision_uri, Some(&other_employer), json!({ "decision": "ACCEPT" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, decided) = send(
        &app,
        json_request("POST", &decision_uri, Some(&employer), json!({ "decision": "ACCEPT" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decided["status"], "ACCEPTED");

    let (status, _) = send(
        &app,
        json_request("POST", &decision_uri, Some(&employer), json!({ "decision": "REJECT" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, detail) = send(&app, empty_request("GET", &format!("/api/jobs/{}", job_id), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["applications"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
#[ignore]
async fn ending_a_session_credits_earnings_once() {
    let (app, pool) = setup().await;
    let professional_id = seed_professional(&pool).await;
    let ends_at = Utc::now() + Duration::hours(23);
    let session_id = seed_session(&pool, professional_id, ends_at).await;
    let token = issue_session_token(session_id, "anon_flow", ends_at).expect("session token");

    let messages_uri = format!("/api/consultation/sessions/{}/messages", session_id);
    let (status, _) = send(
        &app,
        json_request("POST", &messages_uri, Some(&token), json!({ "content": "  Hello doctor  " })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, page) = send(&app, empty_request("GET", &messages_uri, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["messages"][0]["content"], "Hello doctor");
    assert_eq!(page["hasMore"], false);

    let (status, _) = send(
        &app,
        json_request("POST", &messages_uri, Some(&token), json!({ "content": "Second question" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, latest) = send(
        &app,
        empty_request("GET", &format!("{}?limit=1", messages_uri), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["messages"][0]["content"], "Second question");
    assert_eq!(latest["hasMore"], true);
    let cursor = latest["messages"][0]["id"].as_str().expect("message id");
    let (status, older) = send(
        &app,
        empty_request("GET", &format!("{}?before={}", messages_uri, cursor), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(older["messages"][0]["content"], "Hello doctor");
    assert_eq!(older["hasMore"], false);

    let (status, body) = send(
        &app,
        empty_request("GET", &format!("{}?before={}", messages_uri, Uuid::new_v4()), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("cursor"));

    let end_uri = format!("/api/consultation/sessions/{}/end", session_id);
    let (status, _) = send(&app, empty_request("POST", &end_uri, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, empty_request("POST", &end_uri, Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(total_earnings(&pool, professional_id).await, 250_000);

    let review_uri = format!("/api/consultation/sessions/{}/review", session_id);
    let review = json!({ "rating": 5, "reviewText": "Very helpful" });
    let (status, _) = send(&app, json_request("POST", &review_uri, Some(&token), review.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = send(&app, json_request("POST", &review_uri, Some(&token), review)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn sweeping_expires_overdue_sessions_once() {
    let (_, pool) = setup().await;
    let professional_id = seed_professional(&pool).await;
    let session_id = seed_session(&pool, professional_id, Utc::now() - Duration::minutes(5)).await;

    let sessions = SessionService::new(pool.clone());
    let expired = sessions.expire_overdue(Utc::now()).await.expect("sweep");
    assert!(expired >= 1);
    sessions.expire_overdue(Utc::now()).await.expect("second sweep");

    let (status, ended_by): (String, Option<String>) =
        sqlx::query_as("SELECT status, ended_by FROM consultation_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_one(&pool)
            .await
            .expect("session");
    assert_eq!(status, "expired");
    assert_eq!(ended_by.as_deref(), Some("auto"));
    assert_eq!(total_earnings(&pool, professional_id).await, 250_000);
}

async fn sessions_for_reference(pool: &PgPool, reference: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM consultation_sessions WHERE payment_reference = $1")
        .bind(reference)
        .fetch_one(pool)
        .await
        .expect("session count")
}

#[tokio::test]
#[ignore]
async fn verified_consultation_payments_open_one_session() {
    let pool = connect().await;
    let professional_id = seed_professional(&pool).await;
    let app = router_with_gateway(
        &pool,
        PaidGateway {
            amount: CONSULTATION_FEE,
            metadata: json!({
                "professionalId": professional_id,
                "clientEmail": "Client@Example.com",
            }),
        },
    );

    let reference = format!("CONSULT-TEST-{}", Uuid::new_v4().simple());
    let verify_uri = format!("/api/consultation/payment/verify?reference={}", reference);
    let (status, created) = send(&app, empty_request("GET", &verify_uri, None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["clientToken"].is_string());
    assert_eq!(created["session"]["amount"], 300_000);
    assert_eq!(created["session"]["platformFee"], 50_000);
    assert_eq!(created["session"]["professionalEarning"], 250_000);
    assert_eq!(created["session"]["status"], "active");

    let (status, again) = send(&app, empty_request("GET", &verify_uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["session"]["id"], created["session"]["id"]);
    assert_eq!(sessions_for_reference(&pool, &reference).await, 1);

    let session_id = Uuid::parse_str(created["session"]["id"].as_str().expect("session id"))
        .expect("uuid");
    let welcome: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM session_messages WHERE session_id = $1 AND sender_type = 'system'",
    )
    .bind(session_id)
    .fetch_one(&pool)
    .await
    .expect("welcome count");
    assert_eq!(welcome, 1);

    let racing_reference = format!("CONSULT-TEST-{}", Uuid::new_v4().simple());
    let racing_uri = format!("/api/consultation/payment/verify?reference={}", racing_reference);
    let mut verifies = JoinSet::new();
    for _ in 0..6 {
        let app = app.clone();
        let uri = racing_uri.clone();
        verifies.spawn(async move { send(&app, empty_request("GET", &uri, None)).await.0 });
    }
    let mut codes = Vec::new();
    while let Some(code) = verifies.join_next().await {
        codes.push(code.expect("verify task"));
    }
    assert_eq!(codes.iter().filter(|c| **c == StatusCode::CREATED).count(), 1);
    assert_eq!(codes.iter().filter(|c| **c == StatusCode::OK).count(), 5);
    assert_eq!(sessions_for_reference(&pool, &racing_reference).await, 1);

    let total_sessions: i32 =
        sqlx::query_scalar("SELECT total_sessions FROM consultation_professionals WHERE id = $1")
            .bind(professional_id)
            .fetch_one(&pool)
            .await
            .expect("total sessions");
    assert_eq!(total_sessions, 2);
}

#[tokio::test]
#[ignore]
async fn listing_settlement_credits_the_wallet_once() {
    let pool = connect().await;
    let app = router_with_gateway(
        &pool,
        PaidGateway {
            amount: 300_000,
            metadata: json!({}),
        },
    );
    let (user_id, token) = seed_user(&pool, "DOCTOR").await;
    let email: String = sqlx::query_scalar("SELECT email FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .expect("email");
    let reference = format!("PRO-DOCTOR-{}", Uuid::new_v4().simple());
    sqlx::query(
        "INSERT INTO payout_requests (user_id, reference, amount, profession) VALUES ($1, $2, 300000, 'DOCTOR')",
    )
    .bind(user_id)
    .bind(&reference)
    .execute(&pool)
    .await
    .expect("seed payout request");

    let event = json!({ "event": "charge.success", "data": { "reference": reference } }).to_string();
    let signature = sign_payload(event.as_bytes(), PAYSTACK_TEST_SECRET).expect("signature");
    let mut balances = Vec::new();
    for _ in 0..2 {
        let req = Request::builder()
            .method("POST")
            .uri("/api/payments/webhook")
            .header("content-type", "application/json")
            .header("x-paystack-signature", &signature)
            .body(Body::from(event.clone()))
            .expect("webhook request");
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        balances.push(body["walletBalance"].clone());
    }
    assert_eq!(balances[0], LISTING_WALLET_CREDIT);
    assert!(balances[1].is_null());

    let (status, body) = send(
        &app,
        json_request("POST", "/api/payments/verify", Some(&token), json!({ "reference": reference })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment already verified");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/payments/professional/verify-public",
            None,
            json!({ "email": email, "reference": reference }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment already verified");

    let balance: i64 = sqlx::query_scalar("SELECT balance FROM wallets WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .expect("wallet");
    assert_eq!(balance, LISTING_WALLET_CREDIT);
}

#[tokio::test]
#[ignore]
async fn finished_withdrawals_stay_finished() {
    let (app, pool) = setup().await;
    let (professional_id, doctor) = seed_professional_account(&pool).await;
    sqlx::query(
        r#"
        UPDATE consultation_professionals
        SET total_earnings = 500000, bank_name = 'Access Bank', bank_code = '044',
            account_number = '0123456789', account_name = 'Dr Test', bank_verified = TRUE
        WHERE id = $1
        "#,
    )
    .bind(professional_id)
    .execute(&pool)
    .await
    .expect("seed earnings");
    let (_, admin) = user_token("ADMIN", &[]);

    let withdraw = json!({ "amount": 500_000 });
    let (status, body) = send(
        &app,
        json_request("POST", "/api/consultation/professionals/withdraw", Some(&doctor), withdraw.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let update_uri = format!(
        "/api/consultation/professionals/withdrawals/{}",
        body["withdrawal"]["id"].as_str().expect("withdrawal id")
    );

    let (status, _) = send(
        &app,
        json_request("PATCH", &update_uri, Some(&admin), json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    for reopened in ["failed", "processing", "pending"] {
        let (status, _) = send(
            &app,
            json_request("PATCH", &update_uri, Some(&admin), json!({ "status": reopened })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT, "completed -> {}", reopened);
    }

    let (status, earnings) = send(
        &app,
        empty_request("GET", "/api/consultation/professionals/earnings", Some(&doctor)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(earnings["totalWithdrawn"], 500_000);
    assert_eq!(earnings["availableToWithdraw"], 0);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/consultation/professionals/withdraw", Some(&doctor), withdraw),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = format!("/api/consultation/professionals/withdrawals/{}", Uuid::new_v4());
    let (status, _) = send(
        &app,
        json_request("PATCH", &missing, Some(&admin), json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
