//! # Payment Repository
//!
//! Write-once settlement of finalized bills.
//!
//! ## Two Layers of Defense Against Double Payment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Validation (fast path)                                              │
//! │     The bill row carries payment_status; a completed bill is rejected   │
//! │     before any write with DuplicatePayment.                             │
//! │                                                                         │
//! │  2. Partial unique index (the race closer)                              │
//! │     idx_payments_completed_bill ON payments(bill_id)                    │
//! │       WHERE status = 'completed'                                        │
//! │     Two settlements that both passed validation concurrently cannot     │
//! │     both insert; the loser's constraint violation is translated back    │
//! │     into DuplicatePayment.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{is_unique_violation_on, DbError, DbResult};
use vendra_core::{
    payment::validate_payment, Bill, CoreError, Payment, PaymentMethod, PaymentStatus,
};

/// Repository for payment operations.
#[derive(Debug, Clone)]
pub struct PaymentRepository {
    pool: SqlitePool,
}

const PAYMENT_COLUMNS: &str =
    "id, bill_id, method, amount_cents, status, provider_reference, settled_at, created_at";

const BILL_COLUMNS: &str = "id, organization_id, status, subtotal_cents, discount_cents, \
     tax_cents, total_cents, payment_status, created_at, updated_at, finalized_at, finalized_by";

impl PaymentRepository {
    /// Creates a new PaymentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PaymentRepository { pool }
    }

    /// Settles a finalized bill with a single payment.
    ///
    /// Validation (bill finalized, exact amount, method shape) runs first;
    /// the insert and the bill's payment_status flip then happen in one
    /// transaction. At most one completed payment can ever exist per bill.
    pub async fn record(
        &self,
        organization_id: &str,
        bill_id: &str,
        amount_cents: i64,
        method: &PaymentMethod,
    ) -> DbResult<Payment> {
        let mut tx = self.pool.begin().await?;

        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1 AND organization_id = ?2"
        ))
        .bind(bill_id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::BillNotFound {
            bill_id: bill_id.to_string(),
        })?;

        validate_payment(&bill, amount_cents, method).map_err(DbError::from)?;

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            bill_id: bill_id.to_string(),
            method: method.kind(),
            amount_cents,
            status: PaymentStatus::Completed,
            provider_reference: method.provider_reference().map(str::to_string),
            settled_at: Some(now),
            created_at: now,
        };

        debug!(bill_id = %bill_id, amount_cents = amount_cents, "Recording payment");

        let insert = sqlx::query(
            r#"
            INSERT INTO payments (
                id, bill_id, method, amount_cents,
                status, provider_reference, settled_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.bill_id)
        .bind(payment.method)
        .bind(payment.amount_cents)
        .bind(payment.status)
        .bind(&payment.provider_reference)
        .bind(payment.settled_at)
        .bind(payment.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(err) = insert {
            let err = DbError::from(err);
            // Lost the race against another settlement of the same bill.
            if is_unique_violation_on(&err, "payments") {
                return Err(CoreError::DuplicatePayment {
                    bill_id: bill_id.to_string(),
                }
                .into());
            }
            return Err(err);
        }

        sqlx::query("UPDATE bills SET payment_status = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(PaymentStatus::Completed)
            .bind(now)
            .bind(bill_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            bill_id = %bill_id,
            payment_id = %payment.id,
            amount_cents = amount_cents,
            "Payment settled"
        );

        Ok(payment)
    }

    /// Gets the completed payment for a bill, if one exists.
    pub async fn get_for_bill(&self, bill_id: &str) -> DbResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE bill_id = ?1 AND status = 'completed'"
        ))
        .bind(bill_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }
}

// =============================================================================
// Integration Tests (in-memory SQLite)
// =============================================================================
