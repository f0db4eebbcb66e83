//! HTTP route handlers and router assembly.
//!
//! ## Surface
//! ```text
//! POST  /bills                         create draft bill
//! POST  /bills/{id}/items              add/merge a line item
//! PATCH /bills/{id}/finalize           freeze totals + decrement stock
//! POST  /bills/{id}/payment            settle the frozen total
//! GET   /bills/{id}/payment            settlement projection
//! POST  /payments/verify               provider signature → onboarding token
//! POST  /auth/register-organization    exchange token for a tenant
//! POST  /organizations/roles           assign a role (plan-bounded)
//! GET   /health                        db ping
//! ```
//!
//! Success envelope: `{"ok": true, ...}`. Errors render through
//! [`crate::error::ApiError`].

pub mod bills;
pub mod onboarding;
pub mod payments;

use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::AppState;

/// Header carrying the caller's tenant.
pub const ORGANIZATION_HEADER: &str = "x-organization-id";

/// Extractor for the tenant scope header.
///
/// All bill, stock, and role routes require it; a request without it is
/// rejected before any handler logic runs.
pub struct OrgId(pub String);

impl<S> FromRequestParts<S> for OrgId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ORGANIZATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::BadHeader("X-Organization-Id"))?;

        Ok(OrgId(value.to_string()))
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/bills", post(bills::create_bill))
        .route("/bills/{id}/items", post(bills::add_item))
        .route("/bills/{id}/finalize", patch(bills::finalize))
        .route(
            "/bills/{id}/payment",
            post(bills::record_payment).get(bills::get_payment),
        )
        .route("/payments/verify", post(payments::verify))
        .route("/auth/register-organization", post(onboarding::register))
        .route("/organizations/roles", post(onboarding::assign_role))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness + database ping.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    if state.db.health_check().await {
        (StatusCode::OK, Json(json!({"ok": true, "status": "healthy"})))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"ok": false, "status": "degraded"})),
        )
    }
}
