//! # Repository Module
//!
//! Database repository implementations for Shopcart.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repositories and Their Tables                        │
//! │                                                                         │
//! │  CheckoutService / seed tool                                           │
//! │       │                                                                 │
//! │       │  db.products() / db.stock() / db.orders()                      │
//! │       ▼                                                                 │
//! │  ProductRepository  ── products (+ initial product_stock row)          │
//! │  StockRepository    ── product_stock      (per-product locked deltas)  │
//! │  OrderRepository    ── orders, order_items (transactional writer)      │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog reads and edits
//! - [`StockRepository`](stock::StockRepository) - Stock ledger
//! - [`OrderRepository`](order::OrderRepository) - Order ledger

pub mod order;
pub mod product;
pub mod stock;
