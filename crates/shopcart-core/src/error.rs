//! # Error Types
//!
//! Domain-specific error types for shopcart-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shopcart-core errors (this file)                                      │
//! │  ├── ValidationError  - Malformed input (cart, product payloads)        │
//! │  └── CheckoutError    - Outcome of a failed checkout                   │
//! │                                                                         │
//! │  shopcart-db errors (separate crate)                                   │
//! │  └── DbError          - Storage failures and ledger rejections         │
//! │                                                                         │
//! │  Flow: ValidationError ─┐                                               │
//! │        DbError ─────────┴──► CheckoutError ──► transport status code    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Name the offending product wherever the failure is product-specific
//! 3. Errors are enum variants, never String-typed kinds
//! 4. Each variant maps to one transport status code

use serde::Serialize;
use thiserror::Error;

use crate::checkout::CheckoutStage;
use crate::ids::{OrderId, ProductId};
use crate::types::CartLine;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any stock or order state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// The cart references more distinct products than allowed.
    #[error("cart cannot have more than {max} products")]
    TooManyLines { max: usize },

    /// A line requests zero or a negative quantity.
    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    /// A line requests more than the per-product maximum.
    #[error("quantity {requested} for product {product_id} exceeds maximum allowed ({max})")]
    QuantityTooLarge {
        product_id: ProductId,
        requested: i64,
        max: i64,
    },

    /// Quantity × price (or the sum of lines) does not fit in the money type.
    #[error("order total overflows")]
    TotalOverflow,
}

impl ValidationError {
    /// The product this failure is about, if any.
    pub fn product_id(&self) -> Option<ProductId> {
        match self {
            ValidationError::InvalidQuantity { product_id, .. }
            | ValidationError::QuantityTooLarge { product_id, .. } => Some(*product_id),
            _ => None,
        }
    }
}

// =============================================================================
// Checkout Error
// =============================================================================

/// Why a checkout did not produce an order.
///
/// Every variant except [`CheckoutError::Inconsistent`] guarantees that no
/// stock stayed reserved and no order is visible.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Malformed cart: empty, non-positive quantity, blank buyer, ...
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    /// The cart references a product the catalog does not know.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Requested quantity exceeds availability, including races lost to a
    /// concurrent checkout after the initial check passed.
    #[error("insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// An order line referenced an order that does not exist.
    #[error("order {0} does not exist")]
    InvalidReference(OrderId),

    /// The underlying storage failed.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The caller went away or the checkout deadline passed.
    #[error("checkout cancelled during {stage}")]
    Cancelled { stage: CheckoutStage },

    /// A compensating stock adjustment failed. The listed quantities are
    /// still deducted from stock and need manual reconciliation.
    #[error("stock left reserved for {} product(s) after: {cause}", .unreleased.len())]
    Inconsistent {
        #[source]
        cause: Box<CheckoutError>,
        unreleased: Vec<CartLine>,
    },
}

impl CheckoutError {
    /// The product this failure names, if any.
    pub fn product_id(&self) -> Option<ProductId> {
        match self {
            CheckoutError::InvalidRequest(err) => err.product_id(),
            CheckoutError::ProductNotFound(id) => Some(*id),
            CheckoutError::InsufficientStock { product_id, .. } => Some(*product_id),
            CheckoutError::Inconsistent { cause, .. } => cause.product_id(),
            _ => None,
        }
    }

    /// Machine-readable code for the transport layer.
    pub fn code(&self) -> ErrorCode {
        match self {
            CheckoutError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            CheckoutError::ProductNotFound(_) => ErrorCode::ProductNotFound,
            CheckoutError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CheckoutError::InvalidReference(_) => ErrorCode::InvalidReference,
            CheckoutError::Persistence(_) => ErrorCode::PersistenceError,
            CheckoutError::Cancelled { .. } => ErrorCode::Cancelled,
            CheckoutError::Inconsistent { .. } => ErrorCode::InconsistentState,
        }
    }

    /// HTTP status a transport should answer with.
    pub fn status_code(&self) -> u16 {
        self.code().status_code()
    }

    /// True when resubmitting a corrected request can succeed.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

// =============================================================================
// Error Codes
// =============================================================================

/// Stable error codes, serialized as `SCREAMING_SNAKE_CASE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed cart (400)
    InvalidRequest,
    /// Unknown product (404)
    ProductNotFound,
    /// Not enough stock (409)
    InsufficientStock,
    /// Caller cancelled or deadline passed (408)
    Cancelled,
    /// Internal sequencing defect (500)
    InvalidReference,
    /// Storage failure (500)
    PersistenceError,
    /// Stock needs manual reconciliation (500)
    InconsistentState,
}

impl ErrorCode {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::InvalidRequest => 400,
            ErrorCode::ProductNotFound => 404,
            ErrorCode::InsufficientStock => 409,
            ErrorCode::Cancelled => 408,
            ErrorCode::InvalidReference
            | ErrorCode::PersistenceError
            | ErrorCode::InconsistentState => 500,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result of a checkout or of one of its pure steps.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

/// Result of a validation rule.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_product() {
        let err = CheckoutError::InsufficientStock {
            product_id: ProductId::new(7),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for product 7: available 2, requested 5"
        );
        assert_eq!(err.product_id(), Some(ProductId::new(7)));

        let err: CheckoutError = ValidationError::InvalidQuantity {
            product_id: ProductId::new(3),
            quantity: 0,
        }
        .into();
        assert_eq!(err.to_string(), "invalid request: invalid quantity 0 for product 3");
        assert_eq!(err.product_id(), Some(ProductId::new(3)));
    }

    #[test]
    fn test_client_and_server_errors() {
        assert!(CheckoutError::ProductNotFound(ProductId::new(1)).is_client_error());
        assert!(CheckoutError::from(ValidationError::EmptyCart).is_client_error());
        assert!(!CheckoutError::Persistence("disk full".into()).is_client_error());
        assert!(!CheckoutError::InvalidReference(OrderId::new(9)).is_client_error());
    }

    #[test]
    fn test_inconsistent_keeps_cause() {
        let err = CheckoutError::Inconsistent {
            cause: Box::new(CheckoutError::Persistence("disk full".into())),
            unreleased: vec![CartLine::new(ProductId::new(4), 2)],
        };
        assert_eq!(err.code(), ErrorCode::InconsistentState);
        assert_eq!(
            err.to_string(),
            "stock left reserved for 1 product(s) after: persistence error: disk full"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }
}
