//! Router-level tests: status codes and envelopes for the representative
//! flows, driven through `tower::ServiceExt::oneshot` against an in-memory
//! database.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use vendra_api::config::VendraConfig;
use vendra_api::token::sign_provider_payload;
use vendra_api::{router, AppState};
use vendra_core::{PlanPolicy, PlanTier};
use vendra_db::{Database, DbConfig};

const ORG_HEADER: &str = "X-Organization-Id";

fn test_config() -> VendraConfig {
    VendraConfig {
        http_port: 0,
        database_path: ":memory:".to_string(),
        provider_secret: "test-provider-secret".to_string(),
        token_secret: "test-token-secret".to_string(),
        token_lifetime_secs: 900,
    }
}

/// Builds a router plus a handle to its database for seeding.
async fn test_app() -> (Router, Database) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let state = AppState::new(db.clone(), test_config());
    (router(state), db)
}

/// Registers a tenant directly through the repository and returns its id.
async fn seed_org(db: &Database, plan: PlanTier, subscription: &str) -> String {
    let (org, _) = db
        .organizations()
        .register(
            "Test Shop",
            plan,
            subscription,
            &["Main".to_string()],
            "owner-1",
            &PlanPolicy::standard(),
        )
        .await
        .unwrap();
    org.id
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post(uri: &str, org: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(ORG_HEADER, org)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn patch(uri: &str, org: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(uri)
        .header(ORG_HEADER, org)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, org: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(ORG_HEADER, org)
        .body(Body::empty())
        .unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn health_reports_ok() {
    let (app, _db) = test_app().await;

    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], json!(true));
}

#[tokio::test]
async fn missing_org_header_is_rejected() {
    let (app, _db) = test_app().await;

    let req = Request::builder()
        .method("POST")
        .uri("/bills")
        .header("content-type", "application/json")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["ok"], json!(false));
    assert_eq!(body["error"], json!("validation_error"));
}

#[tokio::test]
async fn bill_lifecycle_end_to_end() {
    let (app, db) = test_app().await;
    let org = seed_org(&db, PlanTier::Growth, "sub_flow").await;

    let a = db.stock().insert(&org, "SKU-A", "Alpha", 10_000, 10).await.unwrap();
    let b = db.stock().insert(&org, "SKU-B", "Beta", 20_000, 10).await.unwrap();

    // Create draft.
    let (status, body) = send(&app, post("/bills", &org, json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["bill"]["status"], json!("draft"));
    let bill_id = body["bill"]["id"].as_str().unwrap().to_string();

    // Add items.
    let (status, _) = send(
        &app,
        post(
            &format!("/bills/{bill_id}/items"),
            &org,
            json!({"product_id": a.id, "quantity": 2}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        post(
            &format!("/bills/{bill_id}/items"),
            &org,
            json!({"product_id": b.id, "quantity": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Finalize with 10% discount, 5% tax.
    let (status, body) = send(
        &app,
        patch(
            &format!("/bills/{bill_id}/finalize"),
            &org,
            json!({"discount_bps": 1000, "tax_bps": 500, "finalized_by": "cashier-1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bill"]["status"], json!("finalized"));
    assert_eq!(body["bill"]["total_cents"], json!(37_800));

    // Wrong amount is rejected with a stable code.
    let (status, body) = send(
        &app,
        post(
            &format!("/bills/{bill_id}/payment"),
            &org,
            json!({"amount_cents": 37_799, "method": {"type": "cash"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("amount_mismatch"));

    // Exact amount settles.
    let (status, body) = send(
        &app,
        post(
            &format!("/bills/{bill_id}/payment"),
            &org,
            json!({"amount_cents": 37_800, "method": {"type": "card"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment_status"], json!("completed"));

    // Second settlement is a duplicate.
    let (status, body) = send(
        &app,
        post(
            &format!("/bills/{bill_id}/payment"),
            &org,
            json!({"amount_cents": 37_800, "method": {"type": "cash"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("duplicate_payment"));

    // Projection returns the single payment.
    let (status, body) = send(&app, get(&format!("/bills/{bill_id}/payment"), &org)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn out_of_range_rate_maps_to_400() {
    let (app, db) = test_app().await;
    let org = seed_org(&db, PlanTier::Starter, "sub_rates").await;

    let (_, body) = send(&app, post("/bills", &org, json!({}))).await;
    let bill_id = body["bill"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        patch(
            &format!("/bills/{bill_id}/finalize"),
            &org,
            json!({"discount_bps": 10_001}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("validation_error"));
}

#[tokio::test]
async fn finalize_insufficient_stock_maps_to_400() {
    let (app, db) = test_app().await;
    let org = seed_org(&db, PlanTier::Starter, "sub_stock").await;
    let scarce = db.stock().insert(&org, "SKU-S", "Scarce", 100, 2).await.unwrap();

    let (_, body) = send(&app, post("/bills", &org, json!({}))).await;
    let bill_id = body["bill"]["id"].as_str().unwrap().to_string();

    send(
        &app,
        post(
            &format!("/bills/{bill_id}/items"),
            &org,
            json!({"product_id": scarce.id, "quantity": 2}),
        ),
    )
    .await;

    // Stock drains between assembly and finalize.
    sqlx::query("UPDATE products SET quantity_in_stock = 1 WHERE id = ?1")
        .bind(&scarce.id)
        .execute(db.pool())
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        patch(&format!("/bills/{bill_id}/finalize"), &org, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("insufficient_stock"));
}

#[tokio::test]
async fn unknown_product_maps_to_404() {
    let (app, db) = test_app().await;
    let org = seed_org(&db, PlanTier::Starter, "sub_404").await;

    let (_, body) = send(&app, post("/bills", &org, json!({}))).await;
    let bill_id = body["bill"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        post(
            &format!("/bills/{bill_id}/items"),
            &org,
            json!({"product_id": "no-such-product", "quantity": 1}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("product_not_found"));
}

#[tokio::test]
async fn onboarding_verify_and_exchange() {
    let (app, _db) = test_app().await;

    let signature = sign_provider_payload("sub_onb", "pay_onb", "test-provider-secret");

    // Verify mints a token.
    let (status, body) = send(
        &app,
        post(
            "/payments/verify",
            "unused",
            json!({
                "subscription_id": "sub_onb",
                "payment_id": "pay_onb",
                "signature": signature,
                "plan": "growth",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["onboarding_token"].as_str().unwrap().to_string();

    // Exchange creates the tenant.
    let register = json!({
        "onboarding_token": token,
        "organization": {"name": "New Shop"},
        "stores": ["Main Street", "Harbor"],
        "admin": {"user_id": "owner-9"},
    });
    let (status, body) = send(&app, post("/auth/register-organization", "unused", register.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["stores"].as_array().unwrap().len(), 2);

    // Replaying the same token conflicts; no second organization appears.
    let (status, body) = send(&app, post("/auth/register-organization", "unused", register)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("subscription_already_used"));
}

#[tokio::test]
async fn bad_signature_is_uniform_401() {
    let (app, _db) = test_app().await;

    let (status, body) = send(
        &app,
        post(
            "/payments/verify",
            "unused",
            json!({
                "subscription_id": "sub_x",
                "payment_id": "pay_x",
                "signature": "deadbeef",
                "plan": "starter",
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("invalid_signature"));
    // No hint about which part failed.
    assert_eq!(body["message"], json!("Invalid signature"));
}

#[tokio::test]
async fn tampered_token_is_401() {
    let (app, _db) = test_app().await;

    let (status, body) = send(
        &app,
        post(
            "/auth/register-organization",
            "unused",
            json!({
                "onboarding_token": "not.a.token",
                "organization": {"name": "Shop"},
                "stores": ["Main"],
                "admin": {"user_id": "u"},
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("invalid_token"));
}

#[tokio::test]
async fn role_limit_maps_to_400() {
    let (app, db) = test_app().await;
    let org = seed_org(&db, PlanTier::Starter, "sub_roles").await;

    for n in 1..=3 {
        let (status, _) = send(
            &app,
            post(
                "/organizations/roles",
                &org,
                json!({"user_id": format!("cashier-{n}"), "role": "cashier"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(
        &app,
        post(
            "/organizations/roles",
            &org,
            json!({"user_id": "cashier-4", "role": "cashier"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("plan_limit_exceeded"));
}
