//! # Stock Repository
//!
//! Product catalog and stock level operations.
//!
//! ## The Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              How stock never goes negative                              │
//! │                                                                         │
//! │  UPDATE products                                                        │
//! │  SET quantity_in_stock = quantity_in_stock - :qty                       │
//! │  WHERE id = :id                                                         │
//! │    AND organization_id = :org                                           │
//! │    AND quantity_in_stock >= :qty      ← the guard                       │
//! │                                                                         │
//! │  rows_affected == 1  →  decrement happened, stock was sufficient        │
//! │  rows_affected == 0  →  nothing changed; report InsufficientStock       │
//! │                                                                         │
//! │  The check and the write are ONE statement, so two concurrent           │
//! │  finalizes racing for the last unit cannot both succeed. No             │
//! │  read-then-write window exists.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use vendra_core::{validation, CoreError, Product, ValidationError};

/// Repository for product and stock level operations.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

const PRODUCT_COLUMNS: &str = "id, organization_id, sku, name, price_cents, \
     quantity_in_stock, created_at, updated_at";

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Inserts a new product into an organization's catalog.
    ///
    /// SKU is unique per organization; a duplicate surfaces as
    /// [`DbError::UniqueViolation`].
    pub async fn insert(
        &self,
        organization_id: &str,
        sku: &str,
        name: &str,
        price_cents: i64,
        quantity_in_stock: i64,
    ) -> DbResult<Product> {
        validation::validate_name("sku", sku).map_err(CoreError::from)?;
        validation::validate_name("name", name).map_err(CoreError::from)?;
        if price_cents < 0 {
            return Err(CoreError::from(ValidationError::OutOfRange {
                field: "price_cents".to_string(),
                min: 0,
                max: i64::MAX,
            })
            .into());
        }
        if quantity_in_stock < 0 {
            return Err(CoreError::from(ValidationError::OutOfRange {
                field: "quantity_in_stock".to_string(),
                min: 0,
                max: i64::MAX,
            })
            .into());
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            organization_id: organization_id.to_string(),
            sku: sku.to_string(),
            name: name.to_string(),
            price_cents,
            quantity_in_stock,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, organization_id, sku, name,
                price_cents, quantity_in_stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&product.id)
        .bind(&product.organization_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.quantity_in_stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID, scoped to an organization.
    ///
    /// A valid product ID owned by another organization returns `None`, the
    /// same as a nonexistent ID. Tenants cannot probe each other's catalogs.
    pub async fn get_by_id(
        &self,
        organization_id: &str,
        product_id: &str,
    ) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1 AND organization_id = ?2"
        ))
        .bind(product_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists all products in an organization's catalog.
    pub async fn list(&self, organization_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE organization_id = ?1 ORDER BY name"
        ))
        .bind(organization_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Atomically increases stock for a product.
    ///
    /// The delta must be positive; a positive increment cannot violate the
    /// non-negative invariant, so the update is unconditional.
    pub async fn restock(
        &self,
        organization_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> DbResult<Product> {
        if quantity <= 0 {
            return Err(CoreError::from(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            })
            .into());
        }

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity_in_stock = quantity_in_stock + ?1, updated_at = ?2
            WHERE id = ?3 AND organization_id = ?4
            "#,
        )
        .bind(quantity)
        .bind(now)
        .bind(product_id)
        .bind(organization_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound {
                product_id: product_id.to_string(),
            }
            .into());
        }

        debug!(product_id = %product_id, quantity = quantity, "Restocked product");

        self.get_by_id(organization_id, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Conditionally decrements stock inside an open transaction.
///
/// Used by bill finalization: one call per line item, all within the same
/// transaction, so a failure on the third line rolls back the first two.
///
/// ## Errors
/// - [`CoreError::InsufficientStock`] if the guard clause rejected the
///   decrement (carries current availability for the error message)
/// - [`CoreError::ProductNotFound`] if the product does not exist in this
///   organization
pub(crate) async fn decrement_stock(
    conn: &mut SqliteConnection,
    organization_id: &str,
    product_id: &str,
    quantity: i64,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE products
        SET quantity_in_stock = quantity_in_stock - ?1, updated_at = ?2
        WHERE id = ?3 AND organization_id = ?4 AND quantity_in_stock >= ?1
        "#,
    )
    .bind(quantity)
    .bind(now)
    .bind(product_id)
    .bind(organization_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    // The guard rejected the write. Distinguish "not enough stock" from
    // "no such product" for the error; the transaction rolls back either way.
    let available: Option<i64> = sqlx::query_scalar(
        "SELECT quantity_in_stock FROM products WHERE id = ?1 AND organization_id = ?2",
    )
    .bind(product_id)
    .bind(organization_id)
    .fetch_optional(&mut *conn)
    .await?;

    match available {
        Some(available) => Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            available,
            requested: quantity,
        }
        .into()),
        None => Err(CoreError::ProductNotFound {
            product_id: product_id.to_string(),
        }
        .into()),
    }
}

// =============================================================================
// Integration Tests (in-memory SQLite)
// =============================================================================
