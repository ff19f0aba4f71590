//! # Order Repository
//!
//! Database operations for orders and order lines.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. BEGIN                                                              │
//! │     └── begin() → SqliteOrderWriter (one SQLite transaction)           │
//! │                                                                         │
//! │  2. WRITE                                                              │
//! │     └── create_order() → OrderId { status: pending }                   │
//! │     └── create_order_line() × N  (snapshot unit prices)                │
//! │                                                                         │
//! │  3. COMMIT ──► order and all lines visible together                    │
//! │     or                                                                  │
//! │     ROLLBACK / drop ──► nothing visible                                │
//! │                                                                         │
//! │  Orders are never updated or deleted afterwards.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::ledger::{OrderLedger, OrderWriter};
use shopcart_core::{Money, Order, OrderId, OrderLine, OrderLineId, OrderStatus, ProductId};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    buyer_id: String,
    address: String,
    total_cents: Money,
    status: OrderStatus,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            buyer_id: row.buyer_id,
            address: row.address,
            total: row.total_cents,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: OrderLineId,
    order_id: OrderId,
    product_id: ProductId,
    quantity: i64,
    price_cents: Money,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.price_cents,
        }
    }
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Opens a transactional write session.
    pub async fn begin(&self) -> DbResult<SqliteOrderWriter> {
        let tx = self.pool.begin().await.map_err(DbError::transaction)?;
        Ok(SqliteOrderWriter { tx })
    }

    /// Gets an order by ID.
    pub async fn get_order(&self, id: OrderId) -> DbResult<Option<Order>> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, buyer_id, address, total_cents, status, created_at
            FROM orders
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    /// Gets all lines for an order, in insertion order.
    pub async fn get_order_lines(&self, order_id: OrderId) -> DbResult<Vec<OrderLine>> {
        let rows: Vec<OrderLineRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, product_id, quantity, price_cents
            FROM order_items
            WHERE order_id = ?1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderLine::from).collect())
    }

    /// Orders placed by one buyer, newest first.
    pub async fn list_by_buyer(&self, buyer_id: &str, limit: u32) -> DbResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, buyer_id, address, total_cents, status, created_at
            FROM orders
            WHERE buyer_id = ?1
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )
        .bind(buyer_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Counts all orders (for diagnostics).
    pub async fn count_orders(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl OrderLedger for OrderRepository {
    type Writer = SqliteOrderWriter;

    async fn begin(&self) -> DbResult<SqliteOrderWriter> {
        OrderRepository::begin(self).await
    }
}

// =============================================================================
// Writer
// =============================================================================

/// An open order transaction. Dropping it without `commit` rolls it back.
#[derive(Debug)]
pub struct SqliteOrderWriter {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl OrderWriter for SqliteOrderWriter {
    async fn create_order(
        &mut self,
        buyer_id: &str,
        address: &str,
        total: Money,
    ) -> DbResult<OrderId> {
        debug!(buyer_id = %buyer_id, total = %total, "Creating order");

        let id: OrderId = sqlx::query_scalar(
            r#"
            INSERT INTO orders (buyer_id, address, total_cents, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(buyer_id)
        .bind(address)
        .bind(total)
        .bind(OrderStatus::Pending)
        .bind(Utc::now())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(id)
    }

    async fn create_order_line(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i64,
        unit_price: Money,
    ) -> DbResult<OrderLineId> {
        debug!(
            order_id = %order_id,
            product_id = %product_id,
            quantity = quantity,
            "Adding order line"
        );

        // The EXISTS guard reports a missing order as "no row" instead of
        // relying on the foreign key error text.
        let id: Option<OrderLineId> = sqlx::query_scalar(
            r#"
            INSERT INTO order_items (order_id, product_id, quantity, price_cents)
            SELECT ?1, ?2, ?3, ?4
            WHERE EXISTS (SELECT 1 FROM orders WHERE id = ?1)
            RETURNING id
            "#,
        )
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .fetch_optional(&mut *self.tx)
        .await?;

        id.ok_or_else(|| DbError::not_found("Order", order_id))
    }

    async fn commit(self) -> DbResult<()> {
        self.tx.commit().await.map_err(DbError::transaction)
    }

    async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await.map_err(DbError::transaction)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_product, TestDb};

    #[tokio::test]
    async fn test_committed_order_is_visible_with_lines() {
        let test_db = TestDb::new().await;
        let p1 = seed_product(&test_db.db, "A", 250, 10).await;
        let p2 = seed_product(&test_db.db, "B", 1000, 10).await;
        let orders = test_db.db.orders();

        let mut writer = orders.begin().await.unwrap();
        let order_id = writer
            .create_order("b1", "1 Main St", Money::from_cents(1750))
            .await
            .unwrap();
        writer
            .create_order_line(order_id, p1, 3, Money::from_cents(250))
            .await
            .unwrap();
        writer
            .create_order_line(order_id, p2, 1, Money::from_cents(1000))
            .await
            .unwrap();
        writer.commit().await.unwrap();

        let order = orders.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.buyer_id, "b1");
        assert_eq!(order.address, "1 Main St");
        assert_eq!(order.total, Money::from_cents(1750));
        assert_eq!(order.status, OrderStatus::Pending);

        let lines = orders.get_order_lines(order_id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].product_id, p1);
        assert_eq!(lines[0].unit_price, Money::from_cents(250));
        assert_eq!(lines[1].line_total(), Some(Money::from_cents(1000)));

        assert_eq!(orders.list_by_buyer("b1", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rollback_leaves_nothing_behind() {
        let test_db = TestDb::new().await;
        let p1 = seed_product(&test_db.db, "A", 250, 10).await;
        let orders = test_db.db.orders();

        let mut writer = orders.begin().await.unwrap();
        let order_id = writer
            .create_order("b1", "1 Main St", Money::from_cents(250))
            .await
            .unwrap();
        writer
            .create_order_line(order_id, p1, 1, Money::from_cents(250))
            .await
            .unwrap();
        writer.rollback().await.unwrap();

        assert!(orders.get_order(order_id).await.unwrap().is_none());
        assert!(orders.get_order_lines(order_id).await.unwrap().is_empty());
        assert_eq!(orders.count_orders().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dropped_writer_rolls_back() {
        let test_db = TestDb::new().await;
        let orders = test_db.db.orders();

        {
            let mut writer = orders.begin().await.unwrap();
            writer
                .create_order("b1", "1 Main St", Money::from_cents(100))
                .await
                .unwrap();
        }

        assert_eq!(orders.count_orders().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_line_for_missing_order_is_rejected() {
        let test_db = TestDb::new().await;
        let p1 = seed_product(&test_db.db, "A", 250, 10).await;
        let orders = test_db.db.orders();

        let mut writer = orders.begin().await.unwrap();
        let err = writer
            .create_order_line(OrderId::new(777), p1, 1, Money::from_cents(250))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Order"));
        writer.rollback().await.unwrap();
    }
}
