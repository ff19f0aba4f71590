//! # shopcart-core: Pure Checkout Logic for Shopcart
//!
//! This crate contains the business rules of checkout as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shopcart Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Transport (HTTP, auth) - outside workspace         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ CheckoutRequest                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               shopcart-db: CheckoutService                      │   │
//! │  │    reserve stock ──► write order ──► compensate on failure      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ uses                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ shopcart-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ checkout  │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │   Plan    │  │   rules   │  │   │
//! │  │   │   Order   │  │           │  │  Stage    │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO LOCKS • PURE FUNCTIONS              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`ids`] - Typed identifiers (`ProductId`, `OrderId`, `OrderLineId`)
//! - [`types`] - Domain types (Product, CartLine, Order, OrderLine, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Checkout error taxonomy
//! - [`validation`] - Input validation rules
//! - [`checkout`] - The pure part of the checkout protocol
//!
//! ## Example Usage
//!
//! ```rust
//! use shopcart_core::{CartLine, CheckoutPlan, Money, Product, ProductId};
//! use chrono::Utc;
//!
//! let product = Product {
//!     id: ProductId::new(1),
//!     name: "Espresso beans".to_string(),
//!     description: String::new(),
//!     image: String::new(),
//!     price: Money::from_cents(1250),
//!     quantity: 5,
//!     created_at: Utc::now(),
//! };
//!
//! let lines = vec![CartLine::new(ProductId::new(1), 3)];
//! let plan = CheckoutPlan::price(&lines, &[product]).unwrap();
//!
//! assert_eq!(plan.total().cents(), 3750);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod ids;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use checkout::{merge_lines, validate_request, CheckoutPlan, CheckoutStage, PlannedLine};
pub use error::{CheckoutError, CheckoutResult, ErrorCode, ValidationError};
pub use ids::{OrderId, OrderLineId, ProductId};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct products allowed in a single checkout.
///
/// Prevents runaway carts and keeps the number of held stock locks small.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in one checkout.
///
/// Guards against typos (1000 instead of 10) and against overflow when the
/// quantity is multiplied by a unit price.
pub const MAX_ITEM_QUANTITY: i64 = 999;
