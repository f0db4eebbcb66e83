//! Onboarding and role-assignment routes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use vendra_core::{validation, CoreError, Role};

use crate::error::ApiResult;
use crate::notify::Notification;
use crate::routes::OrgId;
use crate::AppState;

// =============================================================================
// Request Bodies
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Token minted by `POST /payments/verify`.
    pub onboarding_token: String,
    pub organization: OrganizationBody,
    /// Store names to create; at least one required.
    pub stores: Vec<String>,
    pub admin: AdminBody,
}

#[derive(Debug, Deserialize)]
pub struct OrganizationBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminBody {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignRoleRequest {
    pub user_id: String,
    pub role: Role,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /auth/register-organization` — exchanges an onboarding token for a
/// new tenant.
///
/// The token proves a verified subscription; the UNIQUE subscription_id
/// makes the exchange single-use. Organization, stores, and the initial
/// admin assignment land in one transaction.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let claims = state.broker.decode(&req.onboarding_token)?;

    validation::validate_name("organization name", &req.organization.name)
        .map_err(CoreError::from)?;
    for store_name in &req.stores {
        validation::validate_name("store name", store_name).map_err(CoreError::from)?;
    }

    let (org, stores) = state
        .db
        .organizations()
        .register(
            &req.organization.name,
            claims.plan,
            &claims.sub,
            &req.stores,
            &req.admin.user_id,
            &state.policy,
        )
        .await?;

    info!(organization_id = %org.id, "Onboarding exchange complete");

    state.notifier.send(Notification::OrganizationRegistered {
        organization_id: org.id.clone(),
        name: org.name.clone(),
    });

    Ok((
        StatusCode::CREATED,
        Json(json!({"ok": true, "organization": org, "stores": stores})),
    ))
}

/// `POST /organizations/roles` — assigns a role to a user, bounded by the
/// organization's plan at the moment of insertion.
pub async fn assign_role(
    State(state): State<AppState>,
    OrgId(org): OrgId,
    Json(req): Json<AssignRoleRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let assignment = state
        .db
        .organizations()
        .assign_role(&org, &req.user_id, req.role, &state.policy)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({"ok": true, "assignment": assignment})),
    ))
}
