//! # Checkout Planning
//!
//! The pure half of the checkout protocol: everything that can be decided
//! from the request and a catalog snapshot without touching shared state.
//!
//! ## Protocol Stages
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Validating ──► Pricing ──► ReservingStock ──► PersistingOrder ──► Completed
//! │      │             │              │                   │                 │
//! │      └─────────────┴──────────────┴───────────────────┴──► Failed       │
//! │                                                                         │
//! │  THIS MODULE: Validating + Pricing (validate_request, CheckoutPlan)     │
//! │  shopcart-db: ReservingStock + PersistingOrder (+ compensation)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A [`CheckoutPlan`] fixes three things before any stock is touched:
//! the unit price of every line (the snapshot), the total, and the order in
//! which stock is reserved (ascending product id).

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::error::{CheckoutError, CheckoutResult, ValidationError};
use crate::ids::ProductId;
use crate::money::Money;
use crate::types::{CartLine, CheckoutRequest, Product};
use crate::validation;

// =============================================================================
// Stage
// =============================================================================

/// Where a checkout currently is. Used for logging and for reporting where a
/// cancellation landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    Validating,
    Pricing,
    ReservingStock,
    PersistingOrder,
    Completed,
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutStage::Validating => "validating",
            CheckoutStage::Pricing => "pricing",
            CheckoutStage::ReservingStock => "reserving stock",
            CheckoutStage::PersistingOrder => "persisting order",
            CheckoutStage::Completed => "completed",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Collapses duplicate product lines and sorts by ascending product id.
///
/// Each product is then reserved exactly once per checkout, and the returned
/// order is the lock order.
pub fn merge_lines(lines: &[CartLine]) -> Vec<CartLine> {
    let mut merged: BTreeMap<ProductId, i64> = BTreeMap::new();
    for line in lines {
        *merged.entry(line.product_id).or_insert(0) += line.quantity;
    }

    merged
        .into_iter()
        .map(|(product_id, quantity)| CartLine::new(product_id, quantity))
        .collect()
}

/// Structural validation of a checkout request.
///
/// Returns the merged, lock-ordered lines on success.
pub fn validate_request(request: &CheckoutRequest) -> CheckoutResult<Vec<CartLine>> {
    validation::validate_buyer_id(&request.buyer_id)?;
    validation::validate_address(&request.shipping_address)?;
    validation::validate_cart(&request.lines)?;

    let merged = merge_lines(&request.lines);
    // Merging can push a product past the per-line maximum.
    for line in &merged {
        validation::validate_quantity(line.product_id, line.quantity)?;
    }

    Ok(merged)
}

// =============================================================================
// Plan
// =============================================================================

/// One line of a priced checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedLine {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Snapshot price, reused for the total and the persisted order line.
    pub unit_price: Money,
}

impl PlannedLine {
    pub fn as_cart_line(&self) -> CartLine {
        CartLine::new(self.product_id, self.quantity)
    }
}

/// A validated, priced checkout ready for reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    lines: Vec<PlannedLine>,
    total: Money,
}

impl CheckoutPlan {
    /// Prices `lines` against a catalog snapshot.
    ///
    /// ## Order of checks
    /// 1. every referenced product exists (`ProductNotFound`)
    /// 2. every line fits the snapshot's stock (`InsufficientStock`)
    /// 3. the total fits in `Money` (`InvalidRequest`)
    ///
    /// A failure here happens before any reservation, so there is nothing to
    /// compensate.
    pub fn price(lines: &[CartLine], products: &[Product]) -> CheckoutResult<Self> {
        let by_id: HashMap<ProductId, &Product> = products.iter().map(|p| (p.id, p)).collect();
        let lines = merge_lines(lines);

        let mut priced = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = by_id
                .get(&line.product_id)
                .ok_or(CheckoutError::ProductNotFound(line.product_id))?;
            priced.push((line, *product));
        }

        for (line, product) in &priced {
            if line.quantity > product.quantity {
                return Err(CheckoutError::InsufficientStock {
                    product_id: line.product_id,
                    available: product.quantity,
                    requested: line.quantity,
                });
            }
        }

        let mut total = Money::zero();
        let mut planned = Vec::with_capacity(priced.len());
        for (line, product) in priced {
            let line_total = product
                .price
                .checked_mul_quantity(line.quantity)
                .ok_or(ValidationError::TotalOverflow)?;
            total = total
                .checked_add(line_total)
                .ok_or(ValidationError::TotalOverflow)?;

            planned.push(PlannedLine {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price: product.price,
            });
        }

        Ok(CheckoutPlan {
            lines: planned,
            total,
        })
    }

    /// Lines in reservation order (ascending product id).
    pub fn lines(&self) -> &[PlannedLine] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: i64, price_cents: i64, quantity: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            image: String::new(),
            price: Money::from_cents(price_cents),
            quantity,
            created_at: Utc::now(),
        }
    }

    fn line(id: i64, quantity: i64) -> CartLine {
        CartLine::new(ProductId::new(id), quantity)
    }

    fn request(lines: Vec<CartLine>) -> CheckoutRequest {
        CheckoutRequest {
            buyer_id: "b1".to_string(),
            shipping_address: "1 Main St".to_string(),
            lines,
        }
    }

    #[test]
    fn test_merge_lines_sums_and_sorts() {
        let merged = merge_lines(&[line(5, 1), line(2, 3), line(5, 2)]);
        assert_eq!(merged, vec![line(2, 3), line(5, 3)]);
    }

    #[test]
    fn test_validate_request_rejects_malformed_carts() {
        assert!(matches!(
            validate_request(&request(vec![])),
            Err(CheckoutError::InvalidRequest(ValidationError::EmptyCart))
        ));

        let err = validate_request(&request(vec![line(1, 2), line(4, -1)])).unwrap_err();
        assert_eq!(err.product_id(), Some(ProductId::new(4)));

        let mut blank_buyer = request(vec![line(1, 1)]);
        blank_buyer.buyer_id = " ".to_string();
        assert!(validate_request(&blank_buyer).is_err());
    }

    #[test]
    fn test_validate_request_checks_merged_quantity() {
        let err = validate_request(&request(vec![line(1, 600), line(1, 600)])).unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InvalidRequest(ValidationError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_price_computes_total_from_snapshot() {
        let products = [product(1, 250, 5), product(2, 1000, 1)];
        let plan = CheckoutPlan::price(&[line(2, 1), line(1, 3)], &products).unwrap();

        assert_eq!(plan.total(), Money::from_cents(3 * 250 + 1000));
        let ids: Vec<i64> = plan.lines().iter().map(|l| l.product_id.get()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(plan.lines()[0].unit_price, Money::from_cents(250));
    }

    #[test]
    fn test_price_reports_missing_product_before_stock() {
        // P1 would also fail the stock check; the missing product wins.
        let products = [product(1, 100, 0)];
        let err = CheckoutPlan::price(&[line(1, 2), line(99, 1)], &products).unwrap_err();
        assert!(matches!(err, CheckoutError::ProductNotFound(id) if id == ProductId::new(99)));
    }

    #[test]
    fn test_price_rejects_insufficient_stock() {
        let products = [product(1, 100, 2)];
        let err = CheckoutPlan::price(&[line(1, 5)], &products).unwrap_err();
        match err {
            CheckoutError::InsufficientStock {
                product_id,
                available,
                requested,
            } => {
                assert_eq!(product_id, ProductId::new(1));
                assert_eq!(available, 2);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_price_rejects_overflowing_total() {
        let products = [product(1, i64::MAX / 2, 10)];
        let err = CheckoutPlan::price(&[line(1, 3)], &products).unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InvalidRequest(ValidationError::TotalOverflow)
        ));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(CheckoutStage::ReservingStock.to_string(), "reserving stock");
    }
}
