//! # Domain Types
//!
//! Core domain types used throughout Shopcart.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │     Order       │   │   OrderLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  order_id (FK)  │       │
//! │  │  name           │   │  buyer_id       │   │  product_id     │       │
//! │  │  price          │   │  address        │   │  quantity       │       │
//! │  │  quantity       │   │  total, status  │   │  unit_price     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   StockRecord   │   │    CartLine     │   │  OrderStatus    │       │
//! │  │  product_id     │   │  product_id     │   │  Pending        │       │
//! │  │  quantity >= 0  │   │  quantity > 0   │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{OrderId, OrderLineId, ProductId};
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A catalog product, as read at one point in time.
///
/// `quantity` is the stock level at read time. Checkout uses it for the
/// early availability check only; the authoritative value lives in the
/// stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub image: String,
    /// Unit price in cents.
    pub price: Money,
    /// Available stock when this snapshot was taken.
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a product together with its initial stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub image: String,
    pub price: Money,
    /// Initial stock level.
    pub quantity: i64,
}

/// Catalog fields that may be edited after creation.
///
/// Stock is deliberately absent: it changes only through the stock ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: String,
    pub description: String,
    pub image: String,
    pub price: Money,
}

// =============================================================================
// Stock
// =============================================================================

/// Available quantity for one product. Invariant: `quantity >= 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockRecord {
    pub product_id: ProductId,
    pub quantity: i64,
}

// =============================================================================
// Cart
// =============================================================================

/// One requested product in a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        CartLine {
            product_id,
            quantity,
        }
    }
}

/// A checkout submission.
///
/// Buyer id and shipping address come from an already authenticated
/// identity; the engine trusts them as given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub buyer_id: String,
    pub shipping_address: String,
    #[serde(alias = "items")]
    pub lines: Vec<CartLine>,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub total: Money,
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle status of an order. Only creation is modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created at checkout, awaiting fulfillment.
    #[default]
    Pending,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A persisted order. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: String,
    pub address: String,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// A line of a persisted order.
///
/// `unit_price` is copied from the checkout's price snapshot so that later
/// catalog price changes never rewrite order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
}

impl OrderLine {
    /// Quantity × snapshot unit price. `None` on overflow.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_mul_quantity(self.quantity)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_default_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(OrderStatus::Pending.as_str(), "pending");
    }

    #[test]
    fn test_checkout_request_accepts_items_alias() {
        let json = r#"{
            "buyerId": "b1",
            "shippingAddress": "1 Main St",
            "items": [{ "productId": 7, "quantity": 2 }]
        }"#;
        let request: CheckoutRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.buyer_id, "b1");
        assert_eq!(request.lines, vec![CartLine::new(ProductId::new(7), 2)]);
    }

    #[test]
    fn test_receipt_serialization() {
        let receipt = CheckoutReceipt {
            order_id: OrderId::new(3),
            total: Money::from_cents(4500),
        };
        let json = serde_json::to_string(&receipt).unwrap();
        assert_eq!(json, r#"{"orderId":3,"total":4500}"#);
    }

    #[test]
    fn test_order_line_total() {
        let line = OrderLine {
            id: OrderLineId::new(1),
            order_id: OrderId::new(1),
            product_id: ProductId::new(1),
            quantity: 4,
            unit_price: Money::from_cents(250),
        };
        assert_eq!(line.line_total(), Some(Money::from_cents(1000)));
    }
}
