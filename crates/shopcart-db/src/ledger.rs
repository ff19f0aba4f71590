//! # Ledger Traits
//!
//! The three collaborators a checkout talks to. The SQLite repositories
//! implement them; tests wrap them to inject failures and delays.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CheckoutService<C, S, O>                                               │
//! │       │                                                                 │
//! │       ├── C: Catalog      get_products_by_ids      (ProductRepository)  │
//! │       ├── S: StockLedger  get_stock / adjust       (StockRepository)    │
//! │       └── O: OrderLedger  begin → OrderWriter      (OrderRepository)    │
//! │                               create_order                              │
//! │                               create_order_line × N                     │
//! │                               commit | rollback                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use shopcart_core::{Money, OrderId, OrderLineId, Product, ProductId};

use crate::error::DbResult;

/// Read access to product data.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Returns the products that exist among `ids`, in no particular order.
    /// Unknown ids are simply absent from the result.
    async fn get_products_by_ids(&self, ids: &[ProductId]) -> DbResult<Vec<Product>>;
}

/// Per-product available quantity.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Current quantity. `DbError::NotFound` when the product has no record.
    async fn get_stock(&self, product_id: ProductId) -> DbResult<i64>;

    /// Atomically applies `delta` and returns the new quantity.
    ///
    /// Fails with `DbError::InsufficientStock` (and changes nothing) when the
    /// result would be negative, with `DbError::CheckViolation` (also
    /// changing nothing) when it would exceed `i64::MAX`, and with
    /// `DbError::NotFound` when the product has no record. Adjustments to
    /// one product are serialized.
    async fn adjust(&self, product_id: ProductId, delta: i64) -> DbResult<i64>;
}

/// Append-only order storage.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    type Writer: OrderWriter;

    /// Opens a write session. Nothing written through it is visible until
    /// [`OrderWriter::commit`].
    async fn begin(&self) -> DbResult<Self::Writer>;
}

/// One all-or-nothing batch of order writes.
#[async_trait]
pub trait OrderWriter: Send {
    /// Inserts an order in `pending` status and returns its id.
    async fn create_order(&mut self, buyer_id: &str, address: &str, total: Money)
        -> DbResult<OrderId>;

    /// Inserts one line of `order_id`.
    ///
    /// `DbError::NotFound` when the order does not exist.
    async fn create_order_line(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i64,
        unit_price: Money,
    ) -> DbResult<OrderLineId>;

    async fn commit(self) -> DbResult<()>;

    /// Discards everything written in this session.
    async fn rollback(self) -> DbResult<()>;
}
