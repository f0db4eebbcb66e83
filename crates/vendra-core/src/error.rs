//! # Error Types
//!
//! Domain-specific error types for vendra-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vendra-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                        │
//! │  └── ValidationError  - Input validation failures                       │
//! │                                                                         │
//! │  vendra-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                     │
//! │                                                                         │
//! │  API errors (in app)                                                    │
//! │  └── ApiError         - Stable code + HTTP status + envelope            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → client                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, limits, amounts)
//! 3. Errors are enum variants, never String
//! 4. Each variant maps to exactly one stable machine code

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and domain state conflicts.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id doesn't exist within the caller's organization. Raised
    /// both for unknown ids and for ids belonging to another tenant.
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// A stock decrement would take `quantity_in_stock` below zero.
    ///
    /// Finalize surfaces this for the first failing item and rolls the whole
    /// transaction back; no partial decrement ever persists.
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Bill id doesn't exist within the caller's organization.
    #[error("Bill not found: {bill_id}")]
    BillNotFound { bill_id: String },

    /// Item mutation attempted on a finalized bill.
    #[error("Bill {bill_id} is finalized and can no longer be modified")]
    BillAlreadyFinalized { bill_id: String },

    /// Finalize attempted on a bill with no items.
    #[error("Bill {bill_id} has no items")]
    EmptyBill { bill_id: String },

    /// Payment attempted against a bill that is still a draft.
    #[error("Bill {bill_id} is not finalized; payment requires a frozen total")]
    BillNotFinalized { bill_id: String },

    /// Payment amount doesn't match the bill's frozen total.
    #[error("Payment amount {actual_cents} does not match bill total {expected_cents}")]
    AmountMismatch {
        expected_cents: i64,
        actual_cents: i64,
    },

    /// Gateway payment submitted without a provider transaction id.
    #[error("External gateway payments require a provider transaction reference")]
    MissingProviderReference,

    /// The bill already has a completed payment. Write-once per bill.
    #[error("Bill {bill_id} already has a completed payment")]
    DuplicatePayment { bill_id: String },

    /// A plan quota was crossed at creation time.
    #[error("Plan limit exceeded for {boundary}: limit {limit}, requested {requested}")]
    PlanLimitExceeded {
        boundary: String,
        limit: u32,
        requested: u32,
    },

    /// The subscription behind an onboarding token was already exchanged
    /// for an organization.
    #[error("Subscription {subscription_id} has already been used to register an organization")]
    SubscriptionAlreadyUsed { subscription_id: String },

    /// Payment-provider signature check failed. Deliberately carries no
    /// detail about which portion mismatched.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Onboarding token failed verification (malformed, wrong key, expired).
    #[error("Invalid onboarding token")]
    InvalidToken,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Stable machine-readable code for the HTTP envelope. These strings are
    /// contract: clients match on them, so they never change.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::ProductNotFound { .. } => "product_not_found",
            CoreError::InsufficientStock { .. } => "insufficient_stock",
            CoreError::BillNotFound { .. } => "bill_not_found",
            CoreError::BillAlreadyFinalized { .. } => "bill_already_finalized",
            CoreError::EmptyBill { .. } => "empty_bill",
            CoreError::BillNotFinalized { .. } => "bill_not_finalized",
            CoreError::AmountMismatch { .. } => "amount_mismatch",
            CoreError::MissingProviderReference => "missing_provider_reference",
            CoreError::DuplicatePayment { .. } => "duplicate_payment",
            CoreError::PlanLimitExceeded { .. } => "plan_limit_exceeded",
            CoreError::SubscriptionAlreadyUsed { .. } => "subscription_already_used",
            CoreError::InvalidSignature => "invalid_signature",
            CoreError::InvalidToken => "invalid_token",
            CoreError::Validation(_) => "validation_error",
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before any business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
