//! # Domain Types
//!
//! Core domain types used throughout Vendra.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Organization (tenant root, plan tier, unique subscription_id)          │
//! │       ├── Store            (count bounded by plan)                      │
//! │       ├── Product          (quantity_in_stock >= 0, price in cents)     │
//! │       ├── RoleAssignment   (per-role count bounded by plan)             │
//! │       └── Bill ──┬── BillItem (price/name snapshot at add time)         │
//! │                  └── Payment  (1:1 with a finalized bill)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has a UUID v4 `id` for relations; organizations additionally
//! carry the external `subscription_id` business key (unique, set once).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Plan Tier
// =============================================================================

/// Subscription tier an organization is on. Quota limits per tier live in
/// [`crate::plan::PlanPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Starter,
    Growth,
    Premium,
}

// =============================================================================
// Organization & Store
// =============================================================================

/// Tenant root. Created exactly once per verified external subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Organization {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub name: String,

    /// Subscription tier; governs store and role quotas.
    pub plan: PlanTier,

    /// External payment-provider reference. UNIQUE; set at most once, at
    /// registration. The uniqueness constraint is what makes onboarding
    /// token exchange single-use.
    pub subscription_id: String,

    pub created_at: DateTime<Utc>,
}

/// A physical or logical shop belonging to exactly one organization.
/// Every organization has at least one store, enforced at registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Store {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale within one organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,

    /// Owning tenant; products are unreachable across organizations even if
    /// an id is guessed.
    pub organization_id: String,

    /// Stock Keeping Unit - business identifier, unique per organization.
    pub sku: String,

    pub name: String,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Available quantity. Invariant: never negative; decremented only by
    /// the conditional update in the stock ledger.
    pub quantity_in_stock: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Advisory availability check (the binding check happens at finalize).
    #[inline]
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.quantity_in_stock >= quantity
    }
}

// =============================================================================
// Bill
// =============================================================================

/// The status of a bill. `Finalized` is terminal: no transition leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    /// Items being added, updated, removed.
    Draft,
    /// Frozen: items and totals never change again.
    Finalized,
}

impl Default for BillStatus {
    fn default() -> Self {
        BillStatus::Draft
    }
}

/// A single sales transaction grouping line items, owned by one organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Bill {
    pub id: String,
    pub organization_id: String,
    pub status: BillStatus,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    /// Settlement marker, written only by the payment processor.
    pub payment_status: Option<PaymentStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set exactly once, by finalize.
    pub finalized_at: Option<DateTime<Utc>>,
    /// Actor who finalized the bill.
    pub finalized_by: Option<String>,
}

impl Bill {
    #[inline]
    pub fn is_draft(&self) -> bool {
        self.status == BillStatus::Draft
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.status == BillStatus::Finalized
    }

    /// Returns the frozen total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item in a bill.
/// Uses the snapshot pattern: unit price and name are frozen at add time so
/// later catalog edits cannot rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    pub product_id: String,
    /// Product name at add time (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at add time (frozen).
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// unit_price × quantity.
    pub line_total_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl BillItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Payment
// =============================================================================

/// Settlement state of a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

/// How a bill was paid. A closed set: an unknown method is a
/// deserialization failure at the boundary, not a runtime string mismatch.
///
/// `ExternalGateway` carries the provider transaction reference inline so a
/// gateway payment without a reference cannot be represented silently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Upi,
    ExternalGateway { reference: String },
}

impl PaymentMethod {
    /// The storable discriminant for this method.
    pub fn kind(&self) -> PaymentMethodKind {
        match self {
            PaymentMethod::Cash => PaymentMethodKind::Cash,
            PaymentMethod::Card => PaymentMethodKind::Card,
            PaymentMethod::Upi => PaymentMethodKind::Upi,
            PaymentMethod::ExternalGateway { .. } => PaymentMethodKind::ExternalGateway,
        }
    }

    /// Provider transaction reference, if this method carries one.
    pub fn provider_reference(&self) -> Option<&str> {
        match self {
            PaymentMethod::ExternalGateway { reference } => Some(reference),
            _ => None,
        }
    }
}

/// Unit discriminant of [`PaymentMethod`], used for storage and projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    Cash,
    Card,
    Upi,
    ExternalGateway,
}

/// A settled payment towards a finalized bill. At most one completed
/// payment exists per bill; the record is immutable once completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payment {
    pub id: String,
    pub bill_id: String,
    pub method: PaymentMethodKind,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    /// External transaction id for gateway payments.
    pub provider_reference: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Roles
// =============================================================================

/// Roles a user can hold within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

/// A (user, organization, role) triple. Per-role counts are bounded by the
/// organization's plan at the moment of creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RoleAssignment {
    pub id: String,
    pub organization_id: String,
    pub user_id: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bill_status_default() {
        assert_eq!(BillStatus::default(), BillStatus::Draft);
    }

    #[test]
    fn test_payment_method_kind() {
        assert_eq!(PaymentMethod::Cash.kind(), PaymentMethodKind::Cash);
        assert_eq!(PaymentMethod::Upi.kind(), PaymentMethodKind::Upi);

        let gw = PaymentMethod::ExternalGateway {
            reference: "tx_123".into(),
        };
        assert_eq!(gw.kind(), PaymentMethodKind::ExternalGateway);
        assert_eq!(gw.provider_reference(), Some("tx_123"));
        assert_eq!(PaymentMethod::Card.provider_reference(), None);
    }

    #[test]
    fn test_payment_method_wire_format() {
        let gw: PaymentMethod =
            serde_json::from_str(r#"{"type":"external_gateway","reference":"tx_9"}"#).unwrap();
        assert_eq!(gw.provider_reference(), Some("tx_9"));

        let cash: PaymentMethod = serde_json::from_str(r#"{"type":"cash"}"#).unwrap();
        assert_eq!(cash, PaymentMethod::Cash);

        // Unknown methods are a closed-set deserialization failure.
        assert!(serde_json::from_str::<PaymentMethod>(r#"{"type":"barter"}"#).is_err());
    }

    #[test]
    fn test_product_has_stock() {
        let product = Product {
            id: "p1".into(),
            organization_id: "o1".into(),
            sku: "SKU-1".into(),
            name: "Widget".into(),
            price_cents: 100,
            quantity_in_stock: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(product.has_stock(3));
        assert!(!product.has_stock(4));
    }
}
