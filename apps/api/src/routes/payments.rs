//! Payment-provider verification route.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use vendra_core::PlanTier;

use crate::error::ApiResult;
use crate::token::verify_provider_signature;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub subscription_id: String,
    pub payment_id: String,
    /// HMAC-SHA256 over "{subscription_id}.{payment_id}", hex.
    pub signature: String,
    pub plan: PlanTier,
}

/// `POST /payments/verify` — checks the provider signature and mints a
/// short-lived onboarding token.
///
/// The external charge already happened on the provider's side; this
/// endpoint only proves the caller holds the provider's signature. A 401
/// here carries no detail about which part failed.
pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    verify_provider_signature(
        &req.subscription_id,
        &req.payment_id,
        &state.config.provider_secret,
        &req.signature,
    )?;

    let token = state
        .broker
        .mint(&req.subscription_id, &req.payment_id, req.plan)?;

    info!(
        subscription_id = %req.subscription_id,
        plan = ?req.plan,
        "Provider payment verified, onboarding token minted"
    );

    Ok(Json(json!({"ok": true, "onboarding_token": token})))
}
