//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Key Operations
//! - Batch lookup for checkout pricing (`get_by_ids`)
//! - Create (product + initial stock in one transaction)
//! - Edit of catalog fields (never stock)
//!
//! ## Reading a Product
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products p  LEFT JOIN  product_stock ps  ON ps.product_id = p.id       │
//! │                                                                         │
//! │  id │ name          │ price_cents │ COALESCE(ps.quantity, 0)            │
//! │  ───┼───────────────┼─────────────┼──────────                          │
//! │   1 │ Espresso 1kg  │        1250 │        5                            │
//! │   2 │ Filter papers │         399 │        0  ← no stock row yet        │
//! │                                                                         │
//! │  The quantity is a snapshot. Checkout re-checks it against the stock    │
//! │  ledger while reserving.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::ledger::Catalog;
use shopcart_core::validation::{validate_new_product, validate_product_update};
use shopcart_core::{Money, NewProduct, Product, ProductId, ProductUpdate};

const PRODUCT_COLUMNS: &str = r#"
    SELECT
        p.id,
        p.name,
        p.description,
        p.image,
        p.price_cents,
        COALESCE(ps.quantity, 0) AS quantity,
        p.created_at
    FROM products p
    LEFT JOIN product_stock ps ON ps.product_id = p.id
"#;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    image: String,
    price_cents: Money,
    quantity: i64,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description,
            image: row.image,
            price: row.price_cents,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let id = repo.create(&new_product).await?;
/// let snapshot = repo.get_by_ids(&[id]).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products, newest first.
    pub async fn list(&self, limit: u32) -> DbResult<Vec<Product>> {
        debug!(limit = limit, "Listing products");

        let sql = format!("{PRODUCT_COLUMNS} ORDER BY p.id DESC LIMIT ?1");
        let rows: Vec<ProductRow> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: ProductId) -> DbResult<Option<Product>> {
        let sql = format!("{PRODUCT_COLUMNS} WHERE p.id = ?1");
        let row: Option<ProductRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Gets every product among `ids` in one query.
    ///
    /// Missing ids are skipped, so the caller can tell which ones are unknown.
    pub async fn get_by_ids(&self, ids: &[ProductId]) -> DbResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        debug!(count = ids.len(), "Fetching products by id");

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(PRODUCT_COLUMNS);
        builder.push(" WHERE p.id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<ProductRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        debug!(found = rows.len(), "Products fetched");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Inserts a product and its initial stock record.
    ///
    /// Both rows are written in one transaction, so every product has
    /// exactly one stock record from the moment it exists.
    ///
    /// ## Returns
    /// * `Ok(ProductId)` - Generated product id
    /// * `Err(DbError::CheckViolation)` - Payload failed validation
    pub async fn create(&self, product: &NewProduct) -> DbResult<ProductId> {
        validate_new_product(product).map_err(|e| DbError::CheckViolation {
            message: e.to_string(),
        })?;

        debug!(name = %product.name, quantity = product.quantity, "Creating product");

        let mut tx = self.pool.begin().await.map_err(DbError::transaction)?;

        let id: ProductId = sqlx::query_scalar(
            r#"
            INSERT INTO products (name, description, image, price_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id
            "#,
        )
        .bind(product.name.trim())
        .bind(&product.description)
        .bind(&product.image)
        .bind(product.price)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO product_stock (product_id, quantity) VALUES (?1, ?2)")
            .bind(id)
            .bind(product.quantity)
            .execute(&mut *tx)
            .await?;

        tx.commit().await.map_err(DbError::transaction)?;

        debug!(id = %id, "Product created");
        Ok(id)
    }

    /// Updates the catalog fields of a product.
    ///
    /// Stock is not touched; it changes only through the stock ledger.
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, id: ProductId, update: &ProductUpdate) -> DbResult<()> {
        validate_product_update(update).map_err(|e| DbError::CheckViolation {
            message: e.to_string(),
        })?;

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                image = ?4,
                price_cents = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(update.name.trim())
        .bind(&update.description)
        .bind(&update.image)
        .bind(update.price)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl Catalog for ProductRepository {
    async fn get_products_by_ids(&self, ids: &[ProductId]) -> DbResult<Vec<Product>> {
        self.get_by_ids(ids).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_product, seed_product, TestDb};

    #[tokio::test]
    async fn test_create_writes_product_and_stock() {
        let test_db = TestDb::new().await;
        let repo = test_db.db.products();

        let id = repo.create(&new_product("Espresso 1kg", 1250, 5)).await.unwrap();

        let product = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(product.name, "Espresso 1kg");
        assert_eq!(product.price, Money::from_cents(1250));
        assert_eq!(product.quantity, 5);
        assert_eq!(test_db.db.stock().get_stock(id).await.unwrap(), 5);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_payload() {
        let test_db = TestDb::new().await;
        let repo = test_db.db.products();

        let err = repo.create(&new_product("Broken", 100, -1)).await.unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_by_ids_skips_unknown_ids() {
        let test_db = TestDb::new().await;
        let a = seed_product(&test_db.db, "A", 100, 1).await;
        let b = seed_product(&test_db.db, "B", 200, 2).await;

        let mut found = test_db
            .db
            .products()
            .get_by_ids(&[b, ProductId::new(999), a])
            .await
            .unwrap();
        found.sort_by_key(|p| p.id);

        let ids: Vec<ProductId> = found.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a, b]);
        assert!(test_db.db.products().get_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_changes_catalog_fields_only() {
        let test_db = TestDb::new().await;
        let repo = test_db.db.products();
        let id = seed_product(&test_db.db, "Tea", 300, 7).await;

        let update = ProductUpdate {
            name: "Green tea".to_string(),
            description: "Loose leaf".to_string(),
            image: "tea.png".to_string(),
            price: Money::from_cents(450),
        };
        repo.update(id, &update).await.unwrap();

        let product = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(product.name, "Green tea");
        assert_eq!(product.price, Money::from_cents(450));
        assert_eq!(product.quantity, 7);

        assert!(matches!(
            repo.update(ProductId::new(999), &update).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_returns_newest_first() {
        let test_db = TestDb::new().await;
        let first = seed_product(&test_db.db, "First", 100, 1).await;
        let second = seed_product(&test_db.db, "Second", 100, 1).await;

        let products = test_db.db.products().list(10).await.unwrap();
        let ids: Vec<ProductId> = products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second, first]);
    }
}
