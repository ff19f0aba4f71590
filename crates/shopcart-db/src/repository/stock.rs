//! # Stock Repository
//!
//! The stock ledger: available quantity per product, never negative.
//!
//! ## Adjusting Stock
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Adjustment                                     │
//! │                                                                         │
//! │  adjust(product, delta)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  lock(product)          ← in-process, one holder per product           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE product_stock                                                  │
//! │     SET quantity = quantity + delta                                    │
//! │   WHERE product_id = ? AND quantity + delta >= 0                       │
//! │     AND delta <= i64::MAX - quantity                                   │
//! │  RETURNING quantity                                                    │
//! │       │                                                                 │
//! │       ├── row      → new quantity                                      │
//! │       └── no row   → re-read: NotFound, InsufficientStock or           │
//! │                      CheckViolation (restock past i64::MAX)            │
//! │                                                                         │
//! │  Delta updates only, never absolute writes: a reservation and its      │
//! │  compensation are inverse deltas of the same product.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guard in the WHERE clause keeps the check and the write in one
//! statement, so even a writer outside this process cannot slip between
//! them. The in-process lock orders same-product adjustments fairly and keeps
//! them off SQLite's busy handler.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use shopcart_core::{ProductId, StockRecord};

use crate::error::{DbError, DbResult};
use crate::ledger::StockLedger;
use crate::locks::KeyedLocks;

/// Repository for the `product_stock` table.
///
/// Cheap to clone. Every clone obtained from the same `Database` shares one
/// lock table.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
    locks: KeyedLocks<ProductId>,
}

impl StockRepository {
    pub fn new(pool: SqlitePool, locks: KeyedLocks<ProductId>) -> Self {
        StockRepository { pool, locks }
    }

    /// Reads the stock record of a product.
    ///
    /// ## Returns
    /// * `Ok(Some(StockRecord))` - Record found
    /// * `Ok(None)` - Product has no stock record
    pub async fn get_record(&self, product_id: ProductId) -> DbResult<Option<StockRecord>> {
        let quantity: Option<i64> =
            sqlx::query_scalar("SELECT quantity FROM product_stock WHERE product_id = ?1")
                .bind(product_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(quantity.map(|quantity| StockRecord {
            product_id,
            quantity,
        }))
    }

    /// Current quantity of a product.
    pub async fn get_stock(&self, product_id: ProductId) -> DbResult<i64> {
        self.get_record(product_id)
            .await?
            .map(|record| record.quantity)
            .ok_or_else(|| DbError::not_found("Stock record", product_id))
    }

    /// Applies `delta` to a product's stock and returns the new quantity.
    ///
    /// ## Arguments
    /// * `product_id` - Product whose stock changes
    /// * `delta` - Negative to reserve, positive to release or restock
    ///
    /// ## Returns
    /// * `Ok(i64)` - Quantity after the adjustment
    /// * `Err(DbError::InsufficientStock)` - Result would be negative; nothing written
    /// * `Err(DbError::CheckViolation)` - Result would exceed `i64::MAX`; nothing written
    /// * `Err(DbError::NotFound)` - Product has no stock record
    pub async fn adjust(&self, product_id: ProductId, delta: i64) -> DbResult<i64> {
        let _guard = self.locks.lock(product_id).await;

        debug!(product_id = %product_id, delta = delta, "Adjusting stock");

        // SQLite turns an overflowing integer sum into REAL, so the upper
        // bound is checked by subtraction. quantity >= 0 keeps it exact.
        let updated: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE product_stock
            SET quantity = quantity + ?2
            WHERE product_id = ?1
              AND quantity + ?2 >= 0
              AND ?2 <= ?3 - quantity
            RETURNING quantity
            "#,
        )
        .bind(product_id)
        .bind(delta)
        .bind(i64::MAX)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(quantity) => {
                debug!(product_id = %product_id, quantity = quantity, "Stock adjusted");
                Ok(quantity)
            }
            None => {
                // Still under the lock, so this read sees the value the guard
                // rejected.
                let available = self.get_stock(product_id).await?;
                debug!(
                    product_id = %product_id,
                    available = available,
                    delta = delta,
                    "Stock adjustment rejected"
                );
                if delta > 0 {
                    return Err(DbError::CheckViolation {
                        message: format!(
                            "stock of product {product_id} would overflow: {available} + {delta}"
                        ),
                    });
                }
                // i64::MIN has no positive counterpart; i64::MAX is already
                // more than any record can hold.
                Err(DbError::InsufficientStock {
                    product_id,
                    available,
                    requested: delta.saturating_neg(),
                })
            }
        }
    }

    /// Sum of all stock records (for diagnostics).
    pub async fn total_quantity(&self) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM product_stock")
            .fetch_one(&self.pool)
            .await?;

        Ok(total)
    }
}

#[async_trait]
impl StockLedger for StockRepository {
    async fn get_stock(&self, product_id: ProductId) -> DbResult<i64> {
        StockRepository::get_stock(self, product_id).await
    }

    async fn adjust(&self, product_id: ProductId, delta: i64) -> DbResult<i64> {
        StockRepository::adjust(self, product_id, delta).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_product, TestDb};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_adjust_applies_delta() {
        let test_db = TestDb::new().await;
        let id = seed_product(&test_db.db, "Tea", 300, 5).await;
        let stock = test_db.db.stock();

        assert_eq!(stock.adjust(id, -3).await.unwrap(), 2);
        assert_eq!(stock.adjust(id, 4).await.unwrap(), 6);
        assert_eq!(stock.get_stock(id).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_adjust_below_zero_is_rejected_without_effect() {
        let test_db = TestDb::new().await;
        let id = seed_product(&test_db.db, "Tea", 300, 2).await;
        let stock = test_db.db.stock();

        let err = stock.adjust(id, -5).await.unwrap_err();
        match err {
            DbError::InsufficientStock {
                product_id,
                available,
                requested,
            } => {
                assert_eq!(product_id, id);
                assert_eq!(available, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(stock.get_stock(id).await.unwrap(), 2);

        // Exactly to zero is fine.
        assert_eq!(stock.adjust(id, -2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_adjust_at_integer_limits_leaves_record_intact() {
        let test_db = TestDb::new().await;
        let id = seed_product(&test_db.db, "Tea", 300, 5).await;
        let stock = test_db.db.stock();

        let err = stock.adjust(id, i64::MAX).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }), "{err:?}");
        assert_eq!(stock.get_stock(id).await.unwrap(), 5);

        match stock.adjust(id, i64::MIN).await.unwrap_err() {
            DbError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 5);
                assert_eq!(requested, i64::MAX);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(stock.get_stock(id).await.unwrap(), 5);

        // Filling up to exactly i64::MAX is allowed, one more unit is not.
        assert_eq!(stock.adjust(id, i64::MAX - 5).await.unwrap(), i64::MAX);
        assert!(matches!(
            stock.adjust(id, 1).await,
            Err(DbError::CheckViolation { .. })
        ));
        assert_eq!(stock.get_stock(id).await.unwrap(), i64::MAX);

        // The record is still an integer the ledger can work with.
        assert_eq!(stock.adjust(id, i64::MIN + 1).await.unwrap(), 0);
        assert_eq!(stock.adjust(id, 0).await.unwrap(), 0);

        let storage: String =
            sqlx::query_scalar("SELECT typeof(quantity) FROM product_stock WHERE product_id = ?1")
                .bind(id)
                .fetch_one(test_db.db.pool())
                .await
                .unwrap();
        assert_eq!(storage, "integer");
    }

    #[tokio::test]
    async fn test_total_quantity_sums_all_records() {
        let test_db = TestDb::new().await;
        let stock = test_db.db.stock();
        assert_eq!(stock.total_quantity().await.unwrap(), 0);

        let tea = seed_product(&test_db.db, "Tea", 300, 5).await;
        seed_product(&test_db.db, "Mug", 1200, 7).await;
        stock.adjust(tea, -2).await.unwrap();

        assert_eq!(stock.total_quantity().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let test_db = TestDb::new().await;
        let stock = test_db.db.stock();
        let missing = ProductId::new(404);

        assert!(matches!(
            stock.get_stock(missing).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            stock.adjust(missing, 1).await,
            Err(DbError::NotFound { .. })
        ));
        assert!(stock.get_record(missing).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reservations_never_oversell() {
        let test_db = TestDb::new().await;
        let id = seed_product(&test_db.db, "Limited print", 5000, 5).await;
        let stock = Arc::new(test_db.db.stock());

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let stock = Arc::clone(&stock);
                tokio::spawn(async move { stock.adjust(id, -1).await })
            })
            .collect();

        let mut succeeded = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(DbError::InsufficientStock { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(succeeded, 5);
        assert_eq!(rejected, 15);
        assert_eq!(stock.get_stock(id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_locks_are_shared_and_released() {
        let test_db = TestDb::new().await;
        let id = seed_product(&test_db.db, "Tea", 300, 5).await;

        test_db.db.stock().adjust(id, -1).await.unwrap();
        assert!(test_db.db.stock_locks().is_empty());
    }
}
