//! End-to-end API flow against an in-memory database: login, catalog,
//! checkout, settlement, refund.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use pharma_core::{User, UserRole};
use pharma_db::{Database, DbConfig};
use pharma_server::auth::hash_password;
use pharma_server::config::ServerConfig;
use pharma_server::state::AppState;
use pharma_server::build_app;

const PASSWORD: &str = "correct-horse-battery";

async fn test_app() -> Router {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();

    let now = Utc::now();
    let admin = User {
        id: Uuid::new_v4().to_string(),
        username: "admin".to_string(),
        full_name: "Administrator".to_string(),
        email: None,
        role: UserRole::Admin,
        password_hash: hash_password(PASSWORD).unwrap(),
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.users().insert(&admin).await.unwrap();

    let config = ServerConfig {
        http_port: 0,
        database_path: ":memory:".to_string(),
        jwt_secret: "integration-test-secret".to_string(),
        jwt_lifetime_secs: 3600,
        tax_rate_bps: 700,
        dispensing_fee_cents: 300,
        prescription_tax_exempt: true,
    };

    build_app(AppState::new(db, config))
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn login(app: &Router) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn create_drug(app: &Router, token: &str, sku: &str, price_cents: i64, stock: i64) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/drugs",
        Some(token),
        Some(json!({
            "sku": sku,
            "name": "Paracetamol 500mg",
            "category": "otc_medicine",
            "price_cents": price_cents,
            "stock": stock,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create drug: {}", body);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_requests_without_token_rejected() {
    let app = test_app().await;

    let (status, body) = call(&app, Method::GET, "/api/drugs", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["statusCode"], 401);

    // Health stays open.
    let (status, _) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let app = test_app().await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "username": "admin", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid username or password");
}

#[tokio::test]
async fn test_pos_checkout_cash() {
    let app = test_app().await;
    let token = login(&app).await;
    let drug_id = create_drug(&app, &token, "PARA-500", 500, 10).await;

    // 2 x 500 = 1000, 7% tax = 70, total 1070. Cash 1100 -> change 30.
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/pos/checkout",
        Some(&token),
        Some(json!({
            "lines": [{ "drug_id": drug_id, "quantity": 2 }],
            "method": "cash",
            "cash_received_cents": 1100,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "checkout: {}", body);
    assert_eq!(body["invoice"]["total_cents"], 1070);
    assert_eq!(body["invoice"]["status"], "paid");
    assert_eq!(body["change_cents"], 30);
    assert_eq!(body["payment"]["tendered_cents"], 1100);

    // Stock committed at checkout.
    let (status, drug) = call(
        &app,
        Method::GET,
        &format!("/api/drugs/{}", drug_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(drug["stock"], 8);
}

#[tokio::test]
async fn test_pos_checkout_insufficient_cash_writes_nothing() {
    let app = test_app().await;
    let token = login(&app).await;
    let drug_id = create_drug(&app, &token, "PARA-500", 500, 10).await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/pos/checkout",
        Some(&token),
        Some(json!({
            "lines": [{ "drug_id": drug_id, "quantity": 2 }],
            "method": "cash",
            "cash_received_cents": 1000,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["statusCode"], 422);

    // No invoice, no stock movement.
    let (_, invoices) = call(&app, Method::GET, "/api/invoices", Some(&token), None).await;
    assert_eq!(invoices.as_array().unwrap().len(), 0);
    let (_, drug) = call(
        &app,
        Method::GET,
        &format!("/api/drugs/{}", drug_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(drug["stock"], 10);
}

#[tokio::test]
async fn test_billing_partial_payment_and_refund() {
    let app = test_app().await;
    let token = login(&app).await;
    let drug_id = create_drug(&app, &token, "IBU-200", 1000, 50).await;

    // Draft: 1 x 1000, 7% tax = 70, total 1070.
    let (status, invoice) = call(
        &app,
        Method::POST,
        "/api/invoices",
        Some(&token),
        Some(json!({ "lines": [{ "drug_id": drug_id, "quantity": 1 }] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create invoice: {}", invoice);
    let invoice_id = invoice["id"].as_str().unwrap().to_string();
    assert_eq!(invoice["total_cents"], 1070);
    assert_eq!(invoice["status"], "unpaid");

    // Drafts do not touch stock.
    let (_, drug) = call(
        &app,
        Method::GET,
        &format!("/api/drugs/{}", drug_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(drug["stock"], 50);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/invoices/{}/finalize", invoice_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Partial payment.
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/invoices/{}/payments", invoice_id),
        Some(&token),
        Some(json!({ "method": "card", "amount_cents": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "payment: {}", body);
    assert_eq!(body["invoice"]["status"], "partial");
    assert_eq!(body["invoice"]["paid_cents"], 500);

    // Overpayment rejected, nothing stored.
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/invoices/{}/payments", invoice_id),
        Some(&token),
        Some(json!({ "method": "card", "amount_cents": 600 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["statusCode"], 422);

    // Settle the remaining 570.
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/invoices/{}/payments", invoice_id),
        Some(&token),
        Some(json!({ "method": "card", "amount_cents": 570 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["invoice"]["status"], "paid");

    // Refund part of it. Terminal state.
    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/invoices/{}/refund", invoice_id),
        Some(&token),
        Some(json!({ "method": "card", "amount_cents": 300 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "refund: {}", body);
    assert_eq!(body["invoice"]["status"], "refunded");
    assert_eq!(body["payment"]["amount_cents"], -300);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/invoices/{}/payments", invoice_id),
        Some(&token),
        Some(json!({ "method": "card", "amount_cents": 100 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "post-refund payment: {}", body);

    // Full history: 3 settlement rows, one negative.
    let (_, detail) = call(
        &app,
        Method::GET,
        &format!("/api/invoices/{}", invoice_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(detail["payments"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_prescription_checkout_fee_and_exemption() {
    let app = test_app().await;
    let token = login(&app).await;

    let (status, drug) = call(
        &app,
        Method::POST,
        "/api/drugs",
        Some(&token),
        Some(json!({
            "sku": "AMOX-250",
            "name": "Amoxicillin 250mg",
            "category": "prescription",
            "price_cents": 2000,
            "stock": 5,
            "requires_prescription": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let drug_id = drug["id"].as_str().unwrap().to_string();

    // Prescription lines are tax exempt and carry the dispensing fee:
    // 2000 + 0 tax + 300 fee = 2300.
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/pos/checkout",
        Some(&token),
        Some(json!({
            "lines": [{ "drug_id": drug_id, "quantity": 1 }],
            "method": "card",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "checkout: {}", body);
    assert_eq!(body["invoice"]["tax_cents"], 0);
    assert_eq!(body["invoice"]["dispensing_fee_cents"], 300);
    assert_eq!(body["invoice"]["total_cents"], 2300);
}
