//! Newtype IDs for type-safe entity references.
//!
//! All identifiers are database-assigned `i64` row ids. Wrapping them keeps a
//! product id from being passed where an order id is expected, and gives
//! `ProductId` a total order, which the checkout uses for lock ordering.

use serde::{Deserialize, Serialize};

/// Defines a type-safe `i64` id wrapper.
///
/// Generated types are `Copy`, ordered, hashable, serialize as a bare number
/// and (with the `sqlx` feature) bind directly into queries.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
        #[cfg_attr(feature = "sqlx", sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw row id.
            #[inline]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw row id.
            #[inline]
            pub const fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifies a catalog product and its stock record.
    ProductId
);

define_id!(
    /// Identifies a persisted order.
    OrderId
);

define_id!(
    /// Identifies a single line of a persisted order.
    OrderLineId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_ids_order_numerically() {
        let mut ids = vec![ProductId::new(10), ProductId::new(2), ProductId::new(7)];
        ids.sort();
        assert_eq!(ids, vec![ProductId::new(2), ProductId::new(7), ProductId::new(10)]);
    }

    #[test]
    fn test_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&OrderId::new(42)).unwrap();
        assert_eq!(json, "42");

        let back: OrderId = serde_json::from_str("42").unwrap();
        assert_eq!(back.get(), 42);
    }
}
