//! # Inventory Ledger
//!
//! Quantity-on-hand per product plus an append-only movement log. Every stock
//! change, from a sale, a purchase or a manual count, goes through
//! [`apply_stock_delta`], which writes both in the caller's transaction.
//!
//! ## Guarded Delta Update
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ Read-then-write (two tills can both see 2 in stock and sell 2)     │
//! │     SELECT quantity_on_hand ...; UPDATE ... SET quantity_on_hand = 0    │
//! │                                                                         │
//! │  ✅ Conditional delta (one statement, SQLite serialises writers)        │
//! │     UPDATE products                                                     │
//! │        SET quantity_on_hand = quantity_on_hand + :delta                 │
//! │      WHERE id = :id AND quantity_on_hand + :delta >= 0                  │
//! │     RETURNING name, quantity_on_hand                                    │
//! │                                                                         │
//! │  0 rows → look the product up once more to tell                         │
//! │           "not found" from "insufficient stock"                         │
//! │  1 row  → INSERT INTO stock_movements (direction from the sign)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The movement log is protected by triggers that abort any UPDATE or
//! DELETE, so `quantity_on_hand == initial_stock + Σ IN − Σ OUT` can always
//! be checked with [`InventoryRepository::audit`].

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, new_id};
use crate::repository::product::PRODUCT_COLUMNS;
use mezze_core::validation::{validate_quantity, validate_stock_level};
use mezze_core::{
    Actor, CoreError, LedgerAudit, MovementDirection, Product, ReferenceType, StockLevel,
    StockMovement,
};

/// Largest single manual adjustment.
const MAX_MANUAL_QUANTITY: i64 = 1_000_000;

// =============================================================================
// Stock Change
// =============================================================================

/// One signed change to a product's stock.
#[derive(Debug, Clone)]
pub struct StockChange<'a> {
    pub product_id: &'a str,
    /// Positive adds stock, negative removes it. Zero is rejected.
    pub delta: i64,
    pub reference_type: ReferenceType,
    pub reference_id: Option<&'a str>,
    pub reason: &'a str,
    pub actor_id: &'a str,
}

/// What the guarded update returned.
#[derive(Debug, Clone)]
pub(crate) struct AppliedStock {
    pub product_name: String,
    pub new_quantity: i64,
}

/// Applies a stock change and appends its movement on `conn`.
///
/// ## Errors
/// * `CoreError::ProductNotFound` - unknown product id
/// * `CoreError::InsufficientStock` - the change would take stock below zero
///
/// Neither error leaves a write behind on `conn`.
pub(crate) async fn apply_stock_delta(
    conn: &mut SqliteConnection,
    change: &StockChange<'_>,
) -> DbResult<AppliedStock> {
    let direction = MovementDirection::from_delta(change.delta).ok_or_else(|| {
        DbError::from(mezze_core::ValidationError::MustBePositive {
            field: "quantity".to_string(),
        })
    })?;

    let now = Utc::now();

    let updated: Option<(String, i64)> = sqlx::query_as(
        r#"
        UPDATE products
        SET quantity_on_hand = quantity_on_hand + ?1,
            updated_at = ?2
        WHERE id = ?3 AND quantity_on_hand + ?1 >= 0
        RETURNING name, quantity_on_hand
        "#,
    )
    .bind(change.delta)
    .bind(now)
    .bind(change.product_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some((product_name, new_quantity)) = updated else {
        let current: Option<(String, i64)> =
            sqlx::query_as("SELECT name, quantity_on_hand FROM products WHERE id = ?1")
                .bind(change.product_id)
                .fetch_optional(&mut *conn)
                .await?;

        return Err(match current {
            None => CoreError::ProductNotFound(change.product_id.to_string()),
            Some((name, available)) => CoreError::InsufficientStock {
                product: name,
                available,
                requested: -change.delta,
            },
        }
        .into());
    };

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, direction, reference_type, reference_id,
            quantity, reason, actor_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(new_id())
    .bind(change.product_id)
    .bind(direction)
    .bind(change.reference_type)
    .bind(change.reference_id)
    .bind(change.delta.abs())
    .bind(change.reason)
    .bind(change.actor_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(
        product_id = %change.product_id,
        delta = change.delta,
        new_quantity,
        reference = ?change.reference_type,
        "Stock movement recorded"
    );

    Ok(AppliedStock {
        product_name,
        new_quantity,
    })
}

// =============================================================================
// Repository
// =============================================================================

/// The inventory ledger.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Applies one stock change with its movement in its own transaction.
    ///
    /// Returns the new quantity on hand.
    pub async fn adjust_stock(&self, change: &StockChange<'_>) -> DbResult<i64> {
        let mut tx = begin_write(&self.pool).await?;
        let applied = apply_stock_delta(&mut tx, change).await?;
        tx.commit().await?;

        Ok(applied.new_quantity)
    }

    /// Removes stock by hand (waste, breakage, staff meals).
    ///
    /// ## Returns
    /// * `Ok(true)` - stock reduced and movement logged
    /// * `Ok(false)` - product missing or not enough stock; nothing written
    pub async fn reduce_stock(
        &self,
        actor: &Actor,
        product_id: &str,
        quantity: i64,
        reason: &str,
    ) -> DbResult<bool> {
        validate_quantity("quantity", quantity, MAX_MANUAL_QUANTITY)?;

        let change = StockChange {
            product_id,
            delta: -quantity,
            reference_type: ReferenceType::Adjustment,
            reference_id: None,
            reason,
            actor_id: &actor.id,
        };

        match self.adjust_stock(&change).await {
            Ok(_) => Ok(true),
            Err(DbError::Domain(CoreError::InsufficientStock {
                available,
                requested,
                ..
            })) => {
                warn!(product_id, available, requested, "Stock reduction refused");
                Ok(false)
            }
            Err(DbError::Domain(CoreError::ProductNotFound(_))) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Adds stock by hand. No upper bound.
    ///
    /// Returns `Ok(false)` only when the product does not exist.
    pub async fn increase_stock(
        &self,
        actor: &Actor,
        product_id: &str,
        quantity: i64,
        reason: &str,
    ) -> DbResult<bool> {
        validate_quantity("quantity", quantity, MAX_MANUAL_QUANTITY)?;

        let change = StockChange {
            product_id,
            delta: quantity,
            reference_type: ReferenceType::Adjustment,
            reference_id: None,
            reason,
            actor_id: &actor.id,
        };

        match self.adjust_stock(&change).await {
            Ok(_) => Ok(true),
            Err(DbError::Domain(CoreError::ProductNotFound(_))) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Sets stock to an absolute level after a physical count.
    ///
    /// The difference is logged as an ADJUSTMENT movement; setting the level
    /// it already has logs nothing.
    pub async fn update_stock(
        &self,
        actor: &Actor,
        product_id: &str,
        new_quantity: i64,
        reason: &str,
    ) -> DbResult<StockLevel> {
        validate_stock_level(new_quantity)?;

        let mut tx = begin_write(&self.pool).await?;

        let old: i64 = sqlx::query_scalar("SELECT quantity_on_hand FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let delta = new_quantity - old;
        if delta != 0 {
            apply_stock_delta(
                &mut tx,
                &StockChange {
                    product_id,
                    delta,
                    reference_type: ReferenceType::Adjustment,
                    reference_id: None,
                    reason,
                    actor_id: &actor.id,
                },
            )
            .await?;
        }

        tx.commit().await?;

        info!(product_id, old, new = new_quantity, "Stock level set");

        Ok(StockLevel {
            old,
            new: new_quantity,
        })
    }

    /// Movements for a product, oldest first.
    pub async fn movements(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, direction, reference_type, reference_id,
                   quantity, reason, actor_id, created_at
            FROM stock_movements
            WHERE product_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Movements caused by one sale or purchase.
    pub async fn movements_for_reference(&self, reference_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, product_id, direction, reference_type, reference_id,
                   quantity, reason, actor_id, created_at
            FROM stock_movements
            WHERE reference_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Replays the movement log against the stored quantity.
    pub async fn audit(&self, product_id: &str) -> DbResult<LedgerAudit> {
        let row: Option<(i64, i64, i64, i64)> = sqlx::query_as(
            r#"
            SELECT p.quantity_on_hand,
                   p.initial_stock,
                   COALESCE(SUM(CASE WHEN m.direction = 'IN' THEN m.quantity END), 0),
                   COALESCE(SUM(CASE WHEN m.direction = 'OUT' THEN m.quantity END), 0)
            FROM products p
            LEFT JOIN stock_movements m ON m.product_id = p.id
            WHERE p.id = ?1
            GROUP BY p.id
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        let (quantity_on_hand, initial_stock, total_in, total_out) =
            row.ok_or_else(|| DbError::not_found("Product", product_id))?;

        let audit = LedgerAudit {
            product_id: product_id.to_string(),
            quantity_on_hand,
            initial_stock,
            total_in,
            total_out,
        };

        if !audit.is_consistent() {
            warn!(
                product_id,
                stored = quantity_on_hand,
                replayed = audit.replayed_quantity(),
                "Ledger mismatch"
            );
        }

        Ok(audit)
    }

    /// Active products at or below their reorder level.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND quantity_on_hand <= reorder_level \
             ORDER BY quantity_on_hand, name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{seed_product, test_db};

    fn actor() -> Actor {
        Actor::new("manager-1")
    }

    #[tokio::test]
    async fn test_reduce_and_increase() {
        let db = test_db().await;
        let p = seed_product(&db, "FALAFEL", 10, 500).await;
        let inv = db.inventory();

        assert!(inv.reduce_stock(&actor(), &p.id, 4, "dropped tray").await.unwrap());
        assert!(inv.increase_stock(&actor(), &p.id, 2, "recount").await.unwrap());

        let product = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_on_hand, 8);

        let movements = inv.movements(&p.id).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].direction, MovementDirection::Out);
        assert_eq!(movements[0].quantity, 4);
        assert_eq!(movements[1].signed_quantity(), 2);
        assert!(movements
            .iter()
            .all(|m| m.reference_type == ReferenceType::Adjustment && m.actor_id == "manager-1"));
    }

    #[tokio::test]
    async fn test_reduce_refuses_to_go_negative() {
        let db = test_db().await;
        let p = seed_product(&db, "BAKLAVA", 2, 400).await;
        let inv = db.inventory();

        assert!(!inv.reduce_stock(&actor(), &p.id, 3, "waste").await.unwrap());

        let product = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_on_hand, 2);
        assert!(inv.movements(&p.id).await.unwrap().is_empty());

        // Exactly down to zero is allowed.
        assert!(inv.reduce_stock(&actor(), &p.id, 2, "waste").await.unwrap());
        let product = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_on_hand, 0);
    }

    #[tokio::test]
    async fn test_missing_product_returns_false() {
        let db = test_db().await;
        let inv = db.inventory();

        assert!(!inv.reduce_stock(&actor(), "nope", 1, "x").await.unwrap());
        assert!(!inv.increase_stock(&actor(), "nope", 1, "x").await.unwrap());
    }

    #[tokio::test]
    async fn test_non_positive_quantity_is_validation_error() {
        let db = test_db().await;
        let p = seed_product(&db, "TEA", 5, 150).await;

        let err = db
            .inventory()
            .reduce_stock(&actor(), &p.id, 0, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_stock_logs_delta() {
        let db = test_db().await;
        let p = seed_product(&db, "PITA", 10, 80).await;
        let inv = db.inventory();

        let level = inv.update_stock(&actor(), &p.id, 7, "stock take").await.unwrap();
        assert_eq!(level, StockLevel { old: 10, new: 7 });

        let level = inv.update_stock(&actor(), &p.id, 15, "delivery miscount").await.unwrap();
        assert_eq!(level, StockLevel { old: 7, new: 15 });

        // Same level: no movement.
        inv.update_stock(&actor(), &p.id, 15, "no change").await.unwrap();

        let movements = inv.movements(&p.id).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].signed_quantity(), -3);
        assert_eq!(movements[1].signed_quantity(), 8);

        assert!(inv.audit(&p.id).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_update_stock_rejects_negative_and_unknown() {
        let db = test_db().await;
        let p = seed_product(&db, "SALAD", 3, 700).await;
        let inv = db.inventory();

        assert!(matches!(
            inv.update_stock(&actor(), &p.id, -1, "x").await.unwrap_err(),
            DbError::Domain(CoreError::Validation(_))
        ));
        assert!(matches!(
            inv.update_stock(&actor(), "missing", 1, "x").await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_movement_log_is_append_only() {
        let db = test_db().await;
        let p = seed_product(&db, "LEMONADE", 5, 300).await;
        db.inventory()
            .reduce_stock(&actor(), &p.id, 1, "spill")
            .await
            .unwrap();

        let update = sqlx::query("UPDATE stock_movements SET quantity = 100")
            .execute(db.pool())
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM stock_movements")
            .execute(db.pool())
            .await;
        assert!(delete.is_err());

        assert_eq!(db.inventory().movements(&p.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_low_stock() {
        let db = test_db().await;
        let low = seed_product(&db, "MINT", 2, 100).await;
        seed_product(&db, "RICE", 50, 100).await;

        let products = db.inventory().low_stock().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, low.id);
        assert!(products[0].needs_reorder());
    }
}
