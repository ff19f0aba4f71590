//! # Validation Module
//!
//! Input validation rules for Shopcart.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Transport                                                    │
//! │  └── JSON shape, authentication                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── quantities > 0, cart not empty                                    │
//! │  └── buyer/address present, product payload sane                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (quantity >= 0) on stock                                    │
//! │  └── Foreign keys from order lines                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::ids::ProductId;
use crate::money::Money;
use crate::types::{CartLine, NewProduct, ProductUpdate};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Longest accepted free-text field (names, addresses).
const MAX_TEXT_LEN: usize = 500;

// =============================================================================
// String Validators
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates the authenticated buyer identifier.
pub fn validate_buyer_id(buyer_id: &str) -> ValidationResult<()> {
    validate_text("buyer_id", buyer_id, 100)
}

/// Validates a shipping address.
pub fn validate_address(address: &str) -> ValidationResult<()> {
    validate_text("shipping_address", address, MAX_TEXT_LEN)
}

/// Validates a product name.
///
/// ## Example
/// ```rust
/// use shopcart_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Espresso beans 1kg").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("name", name, 200)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the quantity of one cart line.
///
/// ## Rules
/// - Must be positive (> 0); zero or negative is a malformed request, not a
///   stock shortage
/// - Must not exceed `MAX_ITEM_QUANTITY`
pub fn validate_quantity(product_id: ProductId, quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::InvalidQuantity {
            product_id,
            quantity,
        });
    }

    if quantity > MAX_ITEM_QUANTITY {
        return Err(ValidationError::QuantityTooLarge {
            product_id,
            requested: quantity,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed (free items).
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates an initial stock level.
pub fn validate_initial_stock(quantity: i64) -> ValidationResult<()> {
    if quantity < 0 {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates the shape of a cart: non-empty, bounded, positive quantities.
///
/// Runs over the raw lines, so the error names the first offending line as
/// the buyer submitted it.
pub fn validate_cart(lines: &[CartLine]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyCart);
    }

    if lines.len() > MAX_CART_ITEMS {
        return Err(ValidationError::TooManyLines {
            max: MAX_CART_ITEMS,
        });
    }

    for line in lines {
        validate_quantity(line.product_id, line.quantity)?;
    }

    Ok(())
}

/// Validates a product creation payload.
pub fn validate_new_product(product: &NewProduct) -> ValidationResult<()> {
    validate_product_name(&product.name)?;
    validate_price(product.price)?;
    validate_initial_stock(product.quantity)
}

/// Validates a product edit payload.
pub fn validate_product_update(update: &ProductUpdate) -> ValidationResult<()> {
    validate_product_name(&update.name)?;
    validate_price(update.price)
}

// =============================================================================
// Unit Tests
// =============================================================================
