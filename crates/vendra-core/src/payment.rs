//! # Payment Validation
//!
//! Pure validation a payment must pass before the processor records a
//! settlement. All checks run against the bill's frozen state; persistence
//! (including the write-once guard race) lives in the payment repository.
//!
//! ## Validation Pipeline
//! ```text
//! processPayment(bill, amount, method)
//!      │
//!      ├── bill finalized?          ── no ──► BillNotFinalized
//!      ├── already settled?         ── yes ─► DuplicatePayment
//!      ├── amount == frozen total?  ── no ──► AmountMismatch
//!      └── method-specific fields?  ── bad ─► MissingProviderReference
//! ```

use crate::error::{CoreError, CoreResult};
use crate::types::{Bill, PaymentMethod, PaymentStatus};

/// Validates a payment attempt against a bill. Returns `Ok(())` when the
/// processor may record a completed settlement.
///
/// Amounts are integer cents, so "within currency epsilon" is exact
/// equality.
pub fn validate_payment(bill: &Bill, amount_cents: i64, method: &PaymentMethod) -> CoreResult<()> {
    if !bill.is_finalized() {
        return Err(CoreError::BillNotFinalized {
            bill_id: bill.id.clone(),
        });
    }

    if bill.payment_status == Some(PaymentStatus::Completed) {
        return Err(CoreError::DuplicatePayment {
            bill_id: bill.id.clone(),
        });
    }

    if amount_cents != bill.total_cents {
        return Err(CoreError::AmountMismatch {
            expected_cents: bill.total_cents,
            actual_cents: amount_cents,
        });
    }

    if let PaymentMethod::ExternalGateway { reference } = method {
        if reference.trim().is_empty() {
            return Err(CoreError::MissingProviderReference);
        }
    }

    Ok(())
}
