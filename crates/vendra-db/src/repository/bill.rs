//! # Bill Repository
//!
//! Draft bill assembly and the finalize transaction.
//!
//! ## Bill Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Bill Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE DRAFT                                                       │
//! │     └── create_draft() → Bill { status: Draft }                        │
//! │                                                                         │
//! │  2. ASSEMBLE                                                           │
//! │     └── add_item()             (merges lines for the same product)     │
//! │     └── update_item_quantity()                                         │
//! │     └── remove_item()                                                  │
//! │     (stock is NOT reserved; drafts never touch inventory)              │
//! │                                                                         │
//! │  3. FINALIZE — one transaction                                         │
//! │     ├── claim the draft: UPDATE ... WHERE status = 'draft'             │
//! │     ├── compute totals (discount before tax, half-up rounding)         │
//! │     ├── conditional stock decrement per line item                      │
//! │     └── COMMIT — or ROLLBACK restoring stock AND draft status          │
//! │                                                                         │
//! │  Finalized is terminal: items and totals never change again.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Finalize is idempotent: re-finalizing an already finalized bill returns
//! the frozen bill unchanged, so a client retrying after a lost response
//! cannot double-decrement stock.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::stock::decrement_stock;
use vendra_core::{
    validation, Bill, BillItem, BillStatus, BillTotals, CoreError, Money, Product, RateBps,
};

/// Repository for bill and bill item operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

const BILL_COLUMNS: &str = "id, organization_id, status, subtotal_cents, discount_cents, \
     tax_cents, total_cents, payment_status, created_at, updated_at, finalized_at, finalized_by";

const ITEM_COLUMNS: &str = "id, bill_id, product_id, name_snapshot, unit_price_cents, \
     quantity, line_total_cents, created_at";

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    // =========================================================================
    // Draft Assembly
    // =========================================================================

    /// Creates a new empty draft bill for an organization.
    pub async fn create_draft(&self, organization_id: &str) -> DbResult<Bill> {
        let now = Utc::now();
        let bill = Bill {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            status: BillStatus::Draft,
            subtotal_cents: 0,
            discount_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            payment_status: None,
            created_at: now,
            updated_at: now,
            finalized_at: None,
            finalized_by: None,
        };

        debug!(id = %bill.id, "Creating draft bill");

        sqlx::query(
            r#"
            INSERT INTO bills (
                id, organization_id, status,
                subtotal_cents, discount_cents, tax_cents, total_cents,
                payment_status, created_at, updated_at, finalized_at, finalized_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&bill.id)
        .bind(&bill.organization_id)
        .bind(bill.status)
        .bind(bill.subtotal_cents)
        .bind(bill.discount_cents)
        .bind(bill.tax_cents)
        .bind(bill.total_cents)
        .bind(bill.payment_status)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .bind(bill.finalized_at)
        .bind(&bill.finalized_by)
        .execute(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Gets a bill by ID, scoped to an organization.
    pub async fn get_by_id(&self, organization_id: &str, bill_id: &str) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1 AND organization_id = ?2"
        ))
        .bind(bill_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Lists an organization's bills, newest first.
    pub async fn list(&self, organization_id: &str) -> DbResult<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE organization_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// Gets all line items for a bill.
    pub async fn get_items(&self, bill_id: &str) -> DbResult<Vec<BillItem>> {
        let items = sqlx::query_as::<_, BillItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bill_items WHERE bill_id = ?1 ORDER BY created_at"
        ))
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Adds a product to a draft bill.
    ///
    /// ## Merge Semantics
    /// A bill holds at most one line per product. Adding a product already
    /// on the bill increases that line's quantity; the unit price and name
    /// snapshot from the FIRST add are kept.
    ///
    /// ## Stock Check
    /// The availability check here is advisory (catches obvious mistakes at
    /// assembly time). The binding check is the conditional decrement at
    /// finalize.
    pub async fn add_item(
        &self,
        organization_id: &str,
        bill_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<BillItem> {
        validation::validate_quantity(quantity).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        let bill = require_draft(&mut tx, organization_id, bill_id).await?;

        let product = sqlx::query_as::<_, Product>(
            "SELECT id, organization_id, sku, name, price_cents, quantity_in_stock, \
             created_at, updated_at FROM products WHERE id = ?1 AND organization_id = ?2",
        )
        .bind(product_id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound {
            product_id: product_id.to_string(),
        })?;

        let existing: Option<BillItem> = sqlx::query_as::<_, BillItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bill_items WHERE bill_id = ?1 AND product_id = ?2"
        ))
        .bind(bill_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;

        let merged_quantity = existing.as_ref().map_or(0, |item| item.quantity) + quantity;
        validation::validate_quantity(merged_quantity).map_err(CoreError::from)?;

        if !product.has_stock(merged_quantity) {
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                available: product.quantity_in_stock,
                requested: merged_quantity,
            }
            .into());
        }

        let now = Utc::now();
        let item = match existing {
            Some(mut item) => {
                // Merge into the existing line, keeping the first snapshot.
                let line_total =
                    Money::from_cents(item.unit_price_cents).multiply_quantity(merged_quantity);
                sqlx::query(
                    "UPDATE bill_items SET quantity = ?1, line_total_cents = ?2 WHERE id = ?3",
                )
                .bind(merged_quantity)
                .bind(line_total.cents())
                .bind(&item.id)
                .execute(&mut *tx)
                .await?;

                item.quantity = merged_quantity;
                item.line_total_cents = line_total.cents();
                item
            }
            None => {
                let count: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM bill_items WHERE bill_id = ?1")
                        .bind(bill_id)
                        .fetch_one(&mut *tx)
                        .await?;
                validation::validate_bill_size(count as usize).map_err(CoreError::from)?;

                let line_total = product.price().multiply_quantity(quantity);
                let item = BillItem {
                    id: Uuid::new_v4().to_string(),
                    bill_id: bill_id.to_string(),
                    product_id: product_id.to_string(),
                    name_snapshot: product.name.clone(),
                    unit_price_cents: product.price_cents,
                    quantity,
                    line_total_cents: line_total.cents(),
                    created_at: now,
                };

                sqlx::query(
                    r#"
                    INSERT INTO bill_items (
                        id, bill_id, product_id, name_snapshot,
                        unit_price_cents, quantity, line_total_cents, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                )
                .bind(&item.id)
                .bind(&item.bill_id)
                .bind(&item.product_id)
                .bind(&item.name_snapshot)
                .bind(item.unit_price_cents)
                .bind(item.quantity)
                .bind(item.line_total_cents)
                .bind(item.created_at)
                .execute(&mut *tx)
                .await?;

                item
            }
        };

        refresh_draft_subtotal(&mut tx, &bill.id).await?;
        tx.commit().await?;

        debug!(bill_id = %bill_id, product_id = %product_id, quantity = quantity, "Added bill item");

        Ok(item)
    }

    /// Replaces the quantity of an existing line item on a draft bill.
    pub async fn update_item_quantity(
        &self,
        organization_id: &str,
        bill_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<BillItem> {
        validation::validate_quantity(quantity).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        require_draft(&mut tx, organization_id, bill_id).await?;

        let mut item = sqlx::query_as::<_, BillItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bill_items WHERE bill_id = ?1 AND product_id = ?2"
        ))
        .bind(bill_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound {
            product_id: product_id.to_string(),
        })?;

        let line_total = Money::from_cents(item.unit_price_cents).multiply_quantity(quantity);

        sqlx::query("UPDATE bill_items SET quantity = ?1, line_total_cents = ?2 WHERE id = ?3")
            .bind(quantity)
            .bind(line_total.cents())
            .bind(&item.id)
            .execute(&mut *tx)
            .await?;

        refresh_draft_subtotal(&mut tx, bill_id).await?;
        tx.commit().await?;

        item.quantity = quantity;
        item.line_total_cents = line_total.cents();
        Ok(item)
    }

    /// Removes a line item from a draft bill.
    pub async fn remove_item(
        &self,
        organization_id: &str,
        bill_id: &str,
        product_id: &str,
    ) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        require_draft(&mut tx, organization_id, bill_id).await?;

        let result = sqlx::query("DELETE FROM bill_items WHERE bill_id = ?1 AND product_id = ?2")
            .bind(bill_id)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound {
                product_id: product_id.to_string(),
            }
            .into());
        }

        refresh_draft_subtotal(&mut tx, bill_id).await?;
        tx.commit().await?;

        Ok(())
    }

    // =========================================================================
    // Finalize
    // =========================================================================

    /// Finalizes a draft bill: freezes totals and decrements stock, all in
    /// one transaction.
    ///
    /// ## Steps
    /// 1. Claim the draft (`UPDATE ... WHERE status = 'draft'`). Of N
    ///    concurrent finalizes for one bill, exactly one claim succeeds.
    /// 2. Compute totals from the line items (discount before tax).
    /// 3. Conditionally decrement stock per line item. Any failure rolls
    ///    the whole transaction back: stock untouched, bill still a draft.
    ///
    /// ## Idempotency
    /// If the bill is already finalized, the frozen bill is returned as-is
    /// with no error and no side effects.
    pub async fn finalize(
        &self,
        organization_id: &str,
        bill_id: &str,
        discount: RateBps,
        tax: RateBps,
        finalized_by: &str,
    ) -> DbResult<Bill> {
        // Rate bounds hold for every caller, not just the HTTP layer.
        validation::validate_rate_bps("discount_bps", discount.bps()).map_err(CoreError::from)?;
        validation::validate_rate_bps("tax_bps", tax.bps()).map_err(CoreError::from)?;

        let mut tx = self.pool.begin().await?;

        let items = sqlx::query_as::<_, BillItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bill_items WHERE bill_id = ?1 ORDER BY created_at"
        ))
        .bind(bill_id)
        .fetch_all(&mut *tx)
        .await?;

        let subtotal = items
            .iter()
            .fold(Money::zero(), |acc, item| acc + item.line_total());
        let totals = BillTotals::compute(subtotal, discount, tax);

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE bills SET
                status = 'finalized',
                subtotal_cents = ?1,
                discount_cents = ?2,
                tax_cents = ?3,
                total_cents = ?4,
                updated_at = ?5,
                finalized_at = ?5,
                finalized_by = ?6
            WHERE id = ?7 AND organization_id = ?8 AND status = 'draft'
            "#,
        )
        .bind(totals.subtotal_cents)
        .bind(totals.discount_cents)
        .bind(totals.tax_cents)
        .bind(totals.total_cents)
        .bind(now)
        .bind(finalized_by)
        .bind(bill_id)
        .bind(organization_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Either the bill doesn't exist here, or someone else finalized
            // it first. The latter is the idempotent success path.
            let bill = fetch_bill(&mut tx, organization_id, bill_id)
                .await?
                .ok_or_else(|| {
                    DbError::from(CoreError::BillNotFound {
                        bill_id: bill_id.to_string(),
                    })
                })?;
            tx.rollback().await?;

            debug!(bill_id = %bill_id, "Finalize replay, returning frozen bill");
            return Ok(bill);
        }

        // The empty check happens after the claim so a concurrent add_item
        // cannot slip a line in between check and claim.
        if items.is_empty() {
            return Err(CoreError::EmptyBill {
                bill_id: bill_id.to_string(),
            }
            .into());
        }

        for item in &items {
            decrement_stock(&mut tx, organization_id, &item.product_id, item.quantity).await?;
        }

        tx.commit().await?;

        info!(
            bill_id = %bill_id,
            total_cents = totals.total_cents,
            items = items.len(),
            "Bill finalized"
        );

        let bill = self
            .get_by_id(organization_id, bill_id)
            .await?
            .ok_or_else(|| DbError::not_found("Bill", bill_id))?;
        Ok(bill)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Fetches a bill inside an open transaction.
async fn fetch_bill(
    conn: &mut SqliteConnection,
    organization_id: &str,
    bill_id: &str,
) -> DbResult<Option<Bill>> {
    let bill = sqlx::query_as::<_, Bill>(&format!(
        "SELECT {BILL_COLUMNS} FROM bills WHERE id = ?1 AND organization_id = ?2"
    ))
    .bind(bill_id)
    .bind(organization_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(bill)
}

/// Loads a bill and requires it to be a mutable draft.
async fn require_draft(
    conn: &mut SqliteConnection,
    organization_id: &str,
    bill_id: &str,
) -> DbResult<Bill> {
    let bill = fetch_bill(conn, organization_id, bill_id)
        .await?
        .ok_or_else(|| CoreError::BillNotFound {
            bill_id: bill_id.to_string(),
        })?;

    if bill.is_finalized() {
        return Err(CoreError::BillAlreadyFinalized {
            bill_id: bill_id.to_string(),
        }
        .into());
    }

    Ok(bill)
}

/// Recomputes a draft's running subtotal from its line items.
///
/// Drafts carry subtotal == total with zero discount and tax; the real
/// split is computed at finalize from the rates supplied there.
async fn refresh_draft_subtotal(conn: &mut SqliteConnection, bill_id: &str) -> DbResult<()> {
    let now = Utc::now();

    sqlx::query(
        r#"
        UPDATE bills SET
            subtotal_cents = (SELECT COALESCE(SUM(line_total_cents), 0)
                              FROM bill_items WHERE bill_id = ?1),
            total_cents = (SELECT COALESCE(SUM(line_total_cents), 0)
                           FROM bill_items WHERE bill_id = ?1),
            updated_at = ?2
        WHERE id = ?1
        "#,
    )
    .bind(bill_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Integration Tests (in-memory SQLite)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    const ORG: &str = "org-1";

    /// In-memory database with the test tenant seeded.
    async fn test_db() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query(
            "INSERT INTO organizations (id, name, plan, subscription_id, created_at) \
             VALUES (?1, 'Test Org', 'growth', 'sub-org-1', ?2)",
        )
        .bind(ORG)
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .unwrap();
        db
    }

    /// Two products priced 100.00 and 200.00 with generous stock.
    async fn seed_products(db: &Database) -> (Product, Product) {
        let a = db.stock().insert(ORG, "SKU-A", "Alpha", 10_000, 10).await.unwrap();
        let b = db.stock().insert(ORG, "SKU-B", "Beta", 20_000, 10).await.unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn test_add_item_and_merge() {
        let db = test_db().await;
        let (a, _) = seed_products(&db).await;
        let bills = db.bills();

        let bill = bills.create_draft(ORG).await.unwrap();
        bills.add_item(ORG, &bill.id, &a.id, 2).await.unwrap();
        let merged = bills.add_item(ORG, &bill.id, &a.id, 3).await.unwrap();

        // One line, merged quantity, snapshot price preserved.
        assert_eq!(merged.quantity, 5);
        assert_eq!(merged.unit_price_cents, 10_000);
        assert_eq!(merged.line_total_cents, 50_000);

        let items = bills.get_items(&bill.id).await.unwrap();
        assert_eq!(items.len(), 1);

        let bill = bills.get_by_id(ORG, &bill.id).await.unwrap().unwrap();
        assert_eq!(bill.subtotal_cents, 50_000);
    }

    #[tokio::test]
    async fn test_add_item_snapshot_survives_price_change() {
        let db = test_db().await;
        let (a, _) = seed_products(&db).await;
        let bills = db.bills();

        let bill = bills.create_draft(ORG).await.unwrap();
        let item = bills.add_item(ORG, &bill.id, &a.id, 1).await.unwrap();

        // Catalog edit after the add must not rewrite the line.
        sqlx::query("UPDATE products SET price_cents = 99999 WHERE id = ?1")
            .bind(&a.id)
            .execute(db.pool())
            .await
            .unwrap();

        let items = bills.get_items(&bill.id).await.unwrap();
        assert_eq!(items[0].id, item.id);
        assert_eq!(items[0].unit_price_cents, 10_000);
    }

    #[tokio::test]
    async fn test_add_item_advisory_stock_check() {
        let db = test_db().await;
        let bills = db.bills();
        let scarce = db.stock().insert(ORG, "SKU-S", "Scarce", 100, 2).await.unwrap();

        let bill = bills.create_draft(ORG).await.unwrap();
        let err = bills.add_item(ORG, &bill.id, &scarce.id, 3).await;
        assert!(matches!(
            err,
            Err(DbError::Domain(CoreError::InsufficientStock { .. }))
        ));
    }

    #[tokio::test]
    async fn test_finalize_reference_scenario() {
        let db = test_db().await;
        let (a, b) = seed_products(&db).await;
        let bills = db.bills();

        let bill = bills.create_draft(ORG).await.unwrap();
        bills.add_item(ORG, &bill.id, &a.id, 2).await.unwrap();
        bills.add_item(ORG, &bill.id, &b.id, 1).await.unwrap();

        // 10% discount, 5% tax on the discounted subtotal.
        let finalized = bills
            .finalize(ORG, &bill.id, RateBps::from_bps(1_000), RateBps::from_bps(500), "cashier-1")
            .await
            .unwrap();

        assert_eq!(finalized.status, BillStatus::Finalized);
        assert_eq!(finalized.subtotal_cents, 40_000);
        assert_eq!(finalized.discount_cents, 4_000);
        assert_eq!(finalized.tax_cents, 1_800);
        assert_eq!(finalized.total_cents, 37_800);
        assert!(finalized.finalized_at.is_some());
        assert_eq!(finalized.finalized_by.as_deref(), Some("cashier-1"));

        // Stock decremented by line quantities.
        let a = db.stock().get_by_id(ORG, &a.id).await.unwrap().unwrap();
        let b = db.stock().get_by_id(ORG, &b.id).await.unwrap().unwrap();
        assert_eq!(a.quantity_in_stock, 8);
        assert_eq!(b.quantity_in_stock, 9);
    }

    #[tokio::test]
    async fn test_finalize_insufficient_stock_rolls_back() {
        let db = test_db().await;
        let (a, _) = seed_products(&db).await;
        let bills = db.bills();
        let scarce = db.stock().insert(ORG, "SKU-S", "Scarce", 100, 2).await.unwrap();

        let bill = bills.create_draft(ORG).await.unwrap();
        bills.add_item(ORG, &bill.id, &a.id, 2).await.unwrap();
        bills.add_item(ORG, &bill.id, &scarce.id, 2).await.unwrap();

        // Another sale takes the scarce stock between assembly and finalize.
        sqlx::query("UPDATE products SET quantity_in_stock = 1 WHERE id = ?1")
            .bind(&scarce.id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = bills
            .finalize(ORG, &bill.id, RateBps::zero(), RateBps::zero(), "cashier-1")
            .await;
        assert!(matches!(
            err,
            Err(DbError::Domain(CoreError::InsufficientStock { .. }))
        ));

        // Nothing moved: first line's stock intact, bill still a draft.
        let a = db.stock().get_by_id(ORG, &a.id).await.unwrap().unwrap();
        assert_eq!(a.quantity_in_stock, 10);
        let bill = bills.get_by_id(ORG, &bill.id).await.unwrap().unwrap();
        assert!(bill.is_draft());
    }

    #[tokio::test]
    async fn test_finalize_rejects_rates_above_one_hundred_percent() {
        let db = test_db().await;
        let (a, _) = seed_products(&db).await;
        let bills = db.bills();

        let bill = bills.create_draft(ORG).await.unwrap();
        bills.add_item(ORG, &bill.id, &a.id, 1).await.unwrap();

        for (discount, tax) in [(10_001, 0), (0, 10_001)] {
            let err = bills
                .finalize(
                    ORG,
                    &bill.id,
                    RateBps::from_bps(discount),
                    RateBps::from_bps(tax),
                    "cashier-1",
                )
                .await;
            assert!(matches!(
                err,
                Err(DbError::Domain(CoreError::Validation(_)))
            ));
        }

        // The rejected calls touched nothing.
        let bill = bills.get_by_id(ORG, &bill.id).await.unwrap().unwrap();
        assert!(bill.is_draft());
        let a = db.stock().get_by_id(ORG, &a.id).await.unwrap().unwrap();
        assert_eq!(a.quantity_in_stock, 10);
    }

    #[tokio::test]
    async fn test_finalize_empty_bill_rejected() {
        let db = test_db().await;
        let bills = db.bills();

        let bill = bills.create_draft(ORG).await.unwrap();
        let err = bills
            .finalize(ORG, &bill.id, RateBps::zero(), RateBps::zero(), "cashier-1")
            .await;
        assert!(matches!(err, Err(DbError::Domain(CoreError::EmptyBill { .. }))));

        // The rejected finalize left the bill a draft.
        let bill = bills.get_by_id(ORG, &bill.id).await.unwrap().unwrap();
        assert!(bill.is_draft());
    }

    #[tokio::test]
    async fn test_finalize_is_idempotent() {
        let db = test_db().await;
        let (a, _) = seed_products(&db).await;
        let bills = db.bills();

        let bill = bills.create_draft(ORG).await.unwrap();
        bills.add_item(ORG, &bill.id, &a.id, 2).await.unwrap();

        let first = bills
            .finalize(ORG, &bill.id, RateBps::zero(), RateBps::zero(), "cashier-1")
            .await
            .unwrap();
        let second = bills
            .finalize(ORG, &bill.id, RateBps::from_bps(5_000), RateBps::zero(), "cashier-2")
            .await
            .unwrap();

        // The replay returns the frozen bill; the new rates are ignored.
        assert_eq!(second.total_cents, first.total_cents);
        assert_eq!(second.finalized_by.as_deref(), Some("cashier-1"));

        // Stock decremented exactly once.
        let a = db.stock().get_by_id(ORG, &a.id).await.unwrap().unwrap();
        assert_eq!(a.quantity_in_stock, 8);
    }

    #[tokio::test]
    async fn test_concurrent_finalize_last_unit_one_winner() {
        let db = test_db().await;
        let bills = db.bills();
        let last = db.stock().insert(ORG, "SKU-L", "Last One", 500, 1).await.unwrap();

        let bill_x = bills.create_draft(ORG).await.unwrap();
        let bill_y = bills.create_draft(ORG).await.unwrap();
        bills.add_item(ORG, &bill_x.id, &last.id, 1).await.unwrap();
        bills.add_item(ORG, &bill_y.id, &last.id, 1).await.unwrap();

        let fx = {
            let bills = bills.clone();
            let id = bill_x.id.clone();
            tokio::spawn(async move {
                bills.finalize(ORG, &id, RateBps::zero(), RateBps::zero(), "x").await
            })
        };
        let fy = {
            let bills = bills.clone();
            let id = bill_y.id.clone();
            tokio::spawn(async move {
                bills.finalize(ORG, &id, RateBps::zero(), RateBps::zero(), "y").await
            })
        };

        let rx = fx.await.unwrap();
        let ry = fy.await.unwrap();

        // Exactly one finalize won the last unit.
        let winners = [&rx, &ry].iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        let loser = if rx.is_ok() { ry } else { rx };
        assert!(matches!(
            loser,
            Err(DbError::Domain(CoreError::InsufficientStock { .. }))
        ));

        let last = db.stock().get_by_id(ORG, &last.id).await.unwrap().unwrap();
        assert_eq!(last.quantity_in_stock, 0);
    }

    #[tokio::test]
    async fn test_mutating_finalized_bill_rejected() {
        let db = test_db().await;
        let (a, b) = seed_products(&db).await;
        let bills = db.bills();

        let bill = bills.create_draft(ORG).await.unwrap();
        bills.add_item(ORG, &bill.id, &a.id, 1).await.unwrap();
        bills
            .finalize(ORG, &bill.id, RateBps::zero(), RateBps::zero(), "cashier-1")
            .await
            .unwrap();

        let add = bills.add_item(ORG, &bill.id, &b.id, 1).await;
        assert!(matches!(
            add,
            Err(DbError::Domain(CoreError::BillAlreadyFinalized { .. }))
        ));

        let update = bills.update_item_quantity(ORG, &bill.id, &a.id, 5).await;
        assert!(matches!(
            update,
            Err(DbError::Domain(CoreError::BillAlreadyFinalized { .. }))
        ));

        let remove = bills.remove_item(ORG, &bill.id, &a.id).await;
        assert!(matches!(
            remove,
            Err(DbError::Domain(CoreError::BillAlreadyFinalized { .. }))
        ));
    }

    #[tokio::test]
    async fn test_update_and_remove_item() {
        let db = test_db().await;
        let (a, b) = seed_products(&db).await;
        let bills = db.bills();

        let bill = bills.create_draft(ORG).await.unwrap();
        bills.add_item(ORG, &bill.id, &a.id, 2).await.unwrap();
        bills.add_item(ORG, &bill.id, &b.id, 1).await.unwrap();

        let updated = bills.update_item_quantity(ORG, &bill.id, &a.id, 4).await.unwrap();
        assert_eq!(updated.line_total_cents, 40_000);

        bills.remove_item(ORG, &bill.id, &b.id).await.unwrap();

        let bill = bills.get_by_id(ORG, &bill.id).await.unwrap().unwrap();
        assert_eq!(bill.subtotal_cents, 40_000);
        assert_eq!(bills.get_items(&bill.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bill_scoped_to_organization() {
        let db = test_db().await;
        let bills = db.bills();

        let bill = bills.create_draft(ORG).await.unwrap();
        assert!(bills.get_by_id("org-2", &bill.id).await.unwrap().is_none());

        let err = bills
            .finalize("org-2", &bill.id, RateBps::zero(), RateBps::zero(), "x")
            .await;
        assert!(matches!(
            err,
            Err(DbError::Domain(CoreError::BillNotFound { .. }))
        ));
    }
}
