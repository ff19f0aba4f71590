//! # Database Migrations
//!
//! Embedded SQL migrations for Shopcart.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database::new                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  _sqlx_migrations ── compare with embedded files                       │
//! │       │                                                                 │
//! │       ├── 001_initial_schema.sql ✓ (already applied)                  │
//! │       └── 00N_next.sql           ⬜ (pending - runs now, in order)     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Record checksum + timestamp                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Create `migrations/sqlite/NNN_description.sql` with the next number
//! 2. Use `IF NOT EXISTS` where possible
//! 3. **NEVER** modify an applied migration - add a new one

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Migrations embedded from `migrations/sqlite` at compile time.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// Idempotent, and each migration runs in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestDb;

    #[tokio::test]
    async fn test_all_migrations_applied_once() {
        let test_db = TestDb::new().await;

        // A second run is a no-op.
        run_migrations(test_db.db.pool()).await.unwrap();

        let (total, applied) = migration_status(test_db.db.pool()).await.unwrap();
        assert!(total > 0);
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_stock_check_constraint_holds() {
        let test_db = TestDb::new().await;
        let id = crate::test_support::seed_product(&test_db.db, "Tea", 300, 1).await;

        let err = sqlx::query("UPDATE product_stock SET quantity = -1 WHERE product_id = ?1")
            .bind(id)
            .execute(test_db.db.pool())
            .await
            .map_err(crate::error::DbError::from)
            .unwrap_err();
        assert!(matches!(err, crate::error::DbError::CheckViolation { .. }));
    }
}
