//! # vendra-core: Pure Business Logic for Vendra
//!
//! This crate is the **heart** of Vendra. It contains all business logic as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vendra Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (axum)                              │   │
//! │  │    bills, payments, onboarding, roles                           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vendra-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   plan    │  │  payment  │  │   │
//! │  │   │  Bill     │  │   Money   │  │  quotas   │  │ validation│  │   │
//! │  │   │  Product  │  │ BillTotals│  │ per tier  │  │  pipeline │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    vendra-db (Database Layer)                   │   │
//! │  │        SQLite queries, migrations, transactional ledgers        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Organization, Bill, Payment, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`plan`] - Subscription-plan quota policy
//! - [`payment`] - Payment validation pipeline
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: every function is deterministic
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are cents (i64)
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod payment;
pub mod plan;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{BillTotals, Money, RateBps};
pub use plan::{Limit, PlanLimits, PlanPolicy};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum unique line items allowed in a single bill.
///
/// Prevents runaway bills and keeps the finalize transaction short; each
/// line adds one conditional stock update to the transaction.
pub const MAX_BILL_ITEMS: usize = 100;

/// Maximum quantity of a single line item.
///
/// Guards against typo-scale orders (1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;
