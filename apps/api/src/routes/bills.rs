//! Bill lifecycle routes: draft assembly, finalize, settlement.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use vendra_core::{validation, CoreError, PaymentMethod, RateBps};

use crate::error::ApiResult;
use crate::notify::Notification;
use crate::routes::OrgId;
use crate::AppState;

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    /// Discount percentage in basis points (default: none).
    #[serde(default)]
    pub discount_bps: u32,
    /// Tax percentage in basis points (default: none).
    #[serde(default)]
    pub tax_bps: u32,
    /// Actor recorded as finalized_by (cashier or terminal id).
    pub finalized_by: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount_cents: i64,
    pub method: PaymentMethod,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /bills` — creates an empty draft.
pub async fn create_bill(
    State(state): State<AppState>,
    OrgId(org): OrgId,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let bill = state.db.bills().create_draft(&org).await?;

    debug!(bill_id = %bill.id, "Draft bill created");

    Ok((StatusCode::CREATED, Json(json!({"ok": true, "bill": bill}))))
}

/// `POST /bills/{id}/items` — adds (or merges) a line item on a draft.
pub async fn add_item(
    State(state): State<AppState>,
    OrgId(org): OrgId,
    Path(bill_id): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let item = state
        .db
        .bills()
        .add_item(&org, &bill_id, &req.product_id, req.quantity)
        .await?;

    Ok((StatusCode::CREATED, Json(json!({"ok": true, "item": item}))))
}

/// `PATCH /bills/{id}/finalize` — freezes the bill and decrements stock.
///
/// Idempotent: repeating the call returns the frozen bill unchanged.
pub async fn finalize(
    State(state): State<AppState>,
    OrgId(org): OrgId,
    Path(bill_id): Path<String>,
    Json(req): Json<FinalizeRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let actor = req.finalized_by.as_deref().unwrap_or("api");
    let bill = state
        .db
        .bills()
        .finalize(
            &org,
            &bill_id,
            RateBps::from_bps(req.discount_bps),
            RateBps::from_bps(req.tax_bps),
            actor,
        )
        .await?;

    Ok(Json(json!({"ok": true, "bill": bill})))
}

/// `POST /bills/{id}/payment` — settles the frozen total, write-once.
pub async fn record_payment(
    State(state): State<AppState>,
    OrgId(org): OrgId,
    Path(bill_id): Path<String>,
    Json(req): Json<PaymentRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    validation::validate_amount_cents(req.amount_cents).map_err(CoreError::from)?;

    let payment = state
        .db
        .payments()
        .record(&org, &bill_id, req.amount_cents, &req.method)
        .await?;

    // After commit only; a dropped notification cannot unsettle the bill.
    state.notifier.send(Notification::ReceiptIssued {
        organization_id: org,
        bill_id,
        total_cents: payment.amount_cents,
    });

    Ok(Json(json!({
        "ok": true,
        "payment": payment,
        "payment_status": "completed",
    })))
}

/// `GET /bills/{id}/payment` — settlement projection (zero or one record).
pub async fn get_payment(
    State(state): State<AppState>,
    OrgId(org): OrgId,
    Path(bill_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    // Scope check first so a foreign bill id reads as not-found.
    state
        .db
        .bills()
        .get_by_id(&org, &bill_id)
        .await?
        .ok_or_else(|| CoreError::BillNotFound {
            bill_id: bill_id.clone(),
        })?;

    let payments: Vec<_> = state
        .db
        .payments()
        .get_for_bill(&bill_id)
        .await?
        .into_iter()
        .collect();

    Ok(Json(json!({"ok": true, "payments": payments})))
}
