//! # Checkout Service
//!
//! Turns a cart into an order while keeping stock and orders consistent.
//!
//! ## Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         checkout(request)                               │
//! │                                                                         │
//! │  Validating      validate_request      merge duplicates, sort by id    │
//! │       │                                                                 │
//! │  Pricing         Catalog snapshot      missing → ProductNotFound       │
//! │       │          CheckoutPlan::price   short   → InsufficientStock     │
//! │       │                                                                 │
//! │  ReservingStock  adjust(id, -qty)      ascending product id            │
//! │       │          ─ failure ─────────►  release reserved, fail          │
//! │       │                                                                 │
//! │  PersistingOrder begin                                                 │
//! │       │          create_order + lines  snapshot unit prices            │
//! │       │          commit                                                │
//! │       │          ─ failure ─────────►  rollback, release, fail         │
//! │       ▼                                                                 │
//! │  Completed       CheckoutReceipt { order_id, total }                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Compensation
//! Reservations touch several products and cannot share one atomic unit with
//! the order, so every successful `adjust(id, -qty)` is remembered and undone
//! with `adjust(id, +qty)` (newest first) when a later step fails. If a
//! release itself fails the stock stays deducted, and the caller receives
//! [`CheckoutError::Inconsistent`] listing what needs manual reconciliation.
//!
//! ## Cancellation
//! The protocol runs on its own task. Dropping the caller's future or passing
//! `checkout_timeout` cancels a token that the task checks between steps and
//! before every reservation. A cancelled checkout releases what it reserved
//! and fails with [`CheckoutError::Cancelled`]. Release work always runs to
//! completion, even after the caller is gone.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use shopcart_core::{
    validate_request, CartLine, CheckoutError, CheckoutPlan, CheckoutReceipt, CheckoutRequest,
    CheckoutResult, CheckoutStage, OrderId, PlannedLine, ProductId,
};

use crate::error::DbError;
use crate::ledger::{Catalog, OrderLedger, OrderWriter, StockLedger};

// =============================================================================
// Configuration
// =============================================================================

/// Checkout configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Deadline for one checkout, after which it is cancelled.
    /// Default: 10 seconds
    pub checkout_timeout: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        CheckoutConfig {
            checkout_timeout: Duration::from_secs(10),
        }
    }
}

impl CheckoutConfig {
    /// Sets the checkout deadline.
    pub fn checkout_timeout(mut self, timeout: Duration) -> Self {
        self.checkout_timeout = timeout;
        self
    }
}

// =============================================================================
// Service
// =============================================================================

/// The checkout orchestrator.
///
/// ## Usage
/// ```rust,ignore
/// let service = db.checkout(CheckoutConfig::default());
/// let receipt = service.checkout(request).await?;
/// println!("order {} for {}", receipt.order_id, receipt.total);
/// ```
pub struct CheckoutService<C, S, O> {
    catalog: Arc<C>,
    stock: Arc<S>,
    orders: Arc<O>,
    config: CheckoutConfig,
}

impl<C, S, O> Clone for CheckoutService<C, S, O> {
    fn clone(&self) -> Self {
        CheckoutService {
            catalog: Arc::clone(&self.catalog),
            stock: Arc::clone(&self.stock),
            orders: Arc::clone(&self.orders),
            config: self.config.clone(),
        }
    }
}

impl<C, S, O> CheckoutService<C, S, O>
where
    C: Catalog + 'static,
    S: StockLedger + 'static,
    O: OrderLedger + 'static,
    O::Writer: 'static,
{
    pub fn new(catalog: C, stock: S, orders: O, config: CheckoutConfig) -> Self {
        CheckoutService {
            catalog: Arc::new(catalog),
            stock: Arc::new(stock),
            orders: Arc::new(orders),
            config,
        }
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    /// Places an order for `request`.
    ///
    /// ## Returns
    /// * `Ok(CheckoutReceipt)` - Order committed, stock deducted
    /// * `Err(CheckoutError)` - No order, no stock held (except `Inconsistent`)
    pub async fn checkout(&self, request: CheckoutRequest) -> CheckoutResult<CheckoutReceipt> {
        let token = CancellationToken::new();
        // Cancels the task if this future is dropped before it finishes.
        let _cancel_on_drop = token.clone().drop_guard();

        let service = self.clone();
        let task_token = token.clone();
        let mut handle = tokio::spawn(async move { service.run(request, task_token).await });

        let joined = match tokio::time::timeout(self.config.checkout_timeout, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(
                    timeout_ms = self.config.checkout_timeout.as_millis() as u64,
                    "Checkout deadline passed, cancelling"
                );
                token.cancel();
                handle.await
            }
        };

        joined.map_err(|e| {
            error!(error = %e, "Checkout task failed");
            CheckoutError::Persistence(format!("checkout task failed: {e}"))
        })?
    }

    async fn run(
        &self,
        request: CheckoutRequest,
        cancel: CancellationToken,
    ) -> CheckoutResult<CheckoutReceipt> {
        debug!(
            stage = %CheckoutStage::Validating,
            buyer_id = %request.buyer_id,
            lines = request.lines.len(),
            "Checkout started"
        );
        let lines = validate_request(&request)?;

        checkpoint(&cancel, CheckoutStage::Pricing)?;
        debug!(stage = %CheckoutStage::Pricing, products = lines.len(), "Pricing cart");
        let ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
        let products = self.catalog.get_products_by_ids(&ids).await?;
        let plan = CheckoutPlan::price(&lines, &products)?;

        debug!(stage = %CheckoutStage::ReservingStock, total = %plan.total(), "Reserving stock");
        let mut reserved: Vec<CartLine> = Vec::with_capacity(plan.lines().len());
        for line in plan.lines() {
            if let Err(cancelled) = checkpoint(&cancel, CheckoutStage::ReservingStock) {
                return Err(self.abort(&reserved, cancelled).await);
            }

            match self.stock.adjust(line.product_id, -line.quantity).await {
                Ok(remaining) => {
                    debug!(
                        product_id = %line.product_id,
                        quantity = line.quantity,
                        remaining = remaining,
                        "Stock reserved"
                    );
                    reserved.push(line.as_cart_line());
                }
                Err(err) => {
                    let cause = reservation_error(line, err);
                    return Err(self.abort(&reserved, cause).await);
                }
            }
        }

        if let Err(cancelled) = checkpoint(&cancel, CheckoutStage::PersistingOrder) {
            return Err(self.abort(&reserved, cancelled).await);
        }

        debug!(stage = %CheckoutStage::PersistingOrder, "Persisting order");
        let order_id = match self.persist(&request, &plan).await {
            Ok(order_id) => order_id,
            Err(cause) => return Err(self.abort(&reserved, cause).await),
        };

        info!(
            stage = %CheckoutStage::Completed,
            order_id = %order_id,
            buyer_id = %request.buyer_id,
            total = %plan.total(),
            lines = plan.lines().len(),
            "Checkout completed"
        );

        Ok(CheckoutReceipt {
            order_id,
            total: plan.total(),
        })
    }

    /// Writes the order and its lines in one transaction.
    async fn persist(&self, request: &CheckoutRequest, plan: &CheckoutPlan) -> CheckoutResult<OrderId> {
        let mut writer = self.orders.begin().await?;

        let written = write_order(&mut writer, request, plan).await;
        match written {
            Ok(order_id) => {
                writer.commit().await?;
                Ok(order_id)
            }
            Err(err) => {
                // Roll back before releasing stock: the open transaction holds
                // SQLite's write lock.
                if let Err(rollback_err) = writer.rollback().await {
                    warn!(error = %rollback_err, "Order rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Releases `reserved` (newest first) and returns the error to report.
    async fn abort(&self, reserved: &[CartLine], cause: CheckoutError) -> CheckoutError {
        if reserved.is_empty() {
            debug!(reason = %cause, "Checkout failed before reserving stock");
            return cause;
        }

        warn!(
            reason = %cause,
            lines = reserved.len(),
            "Checkout failed, releasing reserved stock"
        );

        let mut unreleased = Vec::new();
        for line in reserved.iter().rev() {
            match self.stock.adjust(line.product_id, line.quantity).await {
                Ok(quantity) => debug!(
                    product_id = %line.product_id,
                    released = line.quantity,
                    quantity = quantity,
                    "Reserved stock released"
                ),
                Err(err) => {
                    error!(
                        product_id = %line.product_id,
                        quantity = line.quantity,
                        error = %err,
                        "Failed to release reserved stock"
                    );
                    unreleased.push(*line);
                }
            }
        }

        if unreleased.is_empty() {
            return cause;
        }

        error!(
            reason = %cause,
            unreleased = unreleased.len(),
            "Stock left reserved after failed checkout, manual reconciliation needed"
        );
        CheckoutError::Inconsistent {
            cause: Box::new(cause),
            unreleased,
        }
    }
}

// =============================================================================
// Steps
// =============================================================================

fn checkpoint(cancel: &CancellationToken, stage: CheckoutStage) -> CheckoutResult<()> {
    if cancel.is_cancelled() {
        debug!(stage = %stage, "Checkout cancelled");
        return Err(CheckoutError::Cancelled { stage });
    }
    Ok(())
}

async fn write_order<W: OrderWriter>(
    writer: &mut W,
    request: &CheckoutRequest,
    plan: &CheckoutPlan,
) -> CheckoutResult<OrderId> {
    let order_id = writer
        .create_order(&request.buyer_id, &request.shipping_address, plan.total())
        .await?;

    for line in plan.lines() {
        writer
            .create_order_line(order_id, line.product_id, line.quantity, line.unit_price)
            .await
            .map_err(|err| order_line_error(order_id, err))?;
    }

    Ok(order_id)
}

fn reservation_error(line: &PlannedLine, err: DbError) -> CheckoutError {
    match err {
        DbError::NotFound { .. } => CheckoutError::ProductNotFound(line.product_id),
        other => CheckoutError::from(other),
    }
}

fn order_line_error(order_id: OrderId, err: DbError) -> CheckoutError {
    match err {
        DbError::NotFound { .. } | DbError::ForeignKeyViolation { .. } => {
            CheckoutError::InvalidReference(order_id)
        }
        other => CheckoutError::from(other),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
