//! # shopcart-db: Database Layer and Checkout for Shopcart
//!
//! This crate owns every piece of shared mutable state: the catalog, the
//! stock ledger and the order ledger, all in SQLite via sqlx. It also runs
//! the checkout protocol that ties them together.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shopcart Data Flow                               │
//! │                                                                         │
//! │  Transport (outside this workspace)                                    │
//! │       │  CheckoutRequest                                               │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   shopcart-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   CheckoutService ──► Catalog ──────► ProductRepository         │   │
//! │  │         │         ──► StockLedger ──► StockRepository + locks   │   │
//! │  │         │         ──► OrderLedger ──► OrderRepository           │   │
//! │  │         ▼                                                       │   │
//! │  │   shopcart-core (validation, pricing, error taxonomy)           │   │
//! │  │                                                                 │   │
//! │  │   Database (pool.rs) ── SqlitePool + embedded migrations        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL)                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`ledger`] - Catalog / stock / order traits
//! - [`locks`] - Per-key async lock table
//! - [`repository`] - SQLite implementations of the ledgers
//! - [`checkout`] - The checkout orchestrator
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shopcart_db::{AppConfig, Database};
//!
//! let config = AppConfig::from_env()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let receipt = db
//!     .checkout(config.checkout_config())
//!     .checkout(request)
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod config;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::{CheckoutConfig, CheckoutService};
pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult};
pub use ledger::{Catalog, OrderLedger, OrderWriter, StockLedger};
pub use locks::KeyedLocks;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::order::{OrderRepository, SqliteOrderWriter};
pub use repository::product::ProductRepository;
pub use repository::stock::StockRepository;

// =============================================================================
// Test Support
// =============================================================================
