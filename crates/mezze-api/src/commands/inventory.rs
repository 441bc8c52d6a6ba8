//! # Inventory Commands
//!
//! Catalogue entry plus the manual side of the stock ledger: waste, found
//! stock, physical counts. Every change lands in the movement log as an
//! ADJUSTMENT.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::PosEngine;
use crate::error::ApiError;
use crate::outcome::Outcome;
use mezze_core::{Actor, LedgerAudit, NewProduct, Product, StockLevel, StockMovement};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub product: Product,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChangeResponse {
    /// False when the product is unknown or, for reductions, short of stock.
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductsResponse {
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementsResponse {
    pub movements: Vec<StockMovement>,
}

/// Adds a menu item or stock item, with its opening stock.
pub async fn create_product(engine: &PosEngine, new: &NewProduct) -> Outcome<ProductResponse> {
    debug!(code = %new.code, "create_product command");

    engine
        .db()
        .products()
        .insert(new)
        .await
        .map(|product| ProductResponse { product })
        .into()
}

pub async fn list_products(engine: &PosEngine, limit: Option<u32>) -> Outcome<ProductsResponse> {
    engine
        .db()
        .products()
        .list_active(limit.unwrap_or(500))
        .await
        .map(|products| ProductsResponse { products })
        .into()
}

/// Takes stock out by hand (waste, staff meal).
pub async fn reduce_stock(
    engine: &PosEngine,
    actor: &Actor,
    product_id: &str,
    quantity: i64,
    reason: &str,
) -> Outcome<StockChangeResponse> {
    debug!(actor = %actor.id, product_id, quantity, "reduce_stock command");

    engine
        .db()
        .inventory()
        .reduce_stock(actor, product_id, quantity, reason)
        .await
        .map(|changed| StockChangeResponse { changed })
        .into()
}

pub async fn increase_stock(
    engine: &PosEngine,
    actor: &Actor,
    product_id: &str,
    quantity: i64,
    reason: &str,
) -> Outcome<StockChangeResponse> {
    debug!(actor = %actor.id, product_id, quantity, "increase_stock command");

    engine
        .db()
        .inventory()
        .increase_stock(actor, product_id, quantity, reason)
        .await
        .map(|changed| StockChangeResponse { changed })
        .into()
}

/// Sets the level after a physical count. Returns `{old, new}`.
pub async fn update_stock(
    engine: &PosEngine,
    actor: &Actor,
    product_id: &str,
    new_quantity: i64,
    reason: &str,
) -> Outcome<StockLevel> {
    debug!(actor = %actor.id, product_id, new_quantity, "update_stock command");

    engine
        .db()
        .inventory()
        .update_stock(actor, product_id, new_quantity, reason)
        .await
        .into()
}

/// Products at or below their reorder level.
pub async fn low_stock(engine: &PosEngine) -> Outcome<ProductsResponse> {
    engine
        .db()
        .inventory()
        .low_stock()
        .await
        .map(|products| ProductsResponse { products })
        .into()
}

pub async fn stock_movements(engine: &PosEngine, product_id: &str) -> Outcome<MovementsResponse> {
    engine
        .db()
        .inventory()
        .movements(product_id)
        .await
        .map(|movements| MovementsResponse { movements })
        .into()
}

/// Replays the movement log against the stored quantity.
pub async fn stock_audit(engine: &PosEngine, product_id: &str) -> Outcome<LedgerAudit> {
    let result = async {
        if engine.db().products().get_by_id(product_id).await?.is_none() {
            return Err(ApiError::not_found("Product", product_id));
        }
        Ok(engine.db().inventory().audit(product_id).await?)
    };
    result.await.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{seed_product, test_engine};
    use crate::error::ErrorCode;

    fn chef() -> Actor {
        Actor::new("chef-1")
    }

    #[tokio::test]
    async fn test_manual_changes_keep_ledger_consistent() {
        let engine = test_engine().await;
        let p = seed_product(&engine, "TAHINI", 10, 900).await;

        let reduced = reduce_stock(&engine, &chef(), &p.id, 3, "Spilled").await.into_result().unwrap();
        assert!(reduced.changed);

        let increased = increase_stock(&engine, &chef(), &p.id, 5, "Found in store room")
            .await
            .into_result()
            .unwrap();
        assert!(increased.changed);

        let level = update_stock(&engine, &chef(), &p.id, 4, "Weekly count")
            .await
            .into_result()
            .unwrap();
        assert_eq!(level, StockLevel { old: 12, new: 4 });

        let audit = stock_audit(&engine, &p.id).await.into_result().unwrap();
        assert_eq!(audit.quantity_on_hand, 4);
        assert!(audit.is_consistent());

        let moves = stock_movements(&engine, &p.id).await.into_result().unwrap();
        assert_eq!(moves.movements.len(), 3);
    }

    #[tokio::test]
    async fn test_reduce_below_zero_is_false_not_error() {
        let engine = test_engine().await;
        let p = seed_product(&engine, "SUMAC", 2, 100).await;

        let outcome = reduce_stock(&engine, &chef(), &p.id, 3, "Waste").await;
        assert_eq!(outcome.value(), Some(&StockChangeResponse { changed: false }));

        let missing = increase_stock(&engine, &chef(), "ghost", 1, "Found").await;
        assert_eq!(missing.value(), Some(&StockChangeResponse { changed: false }));
    }

    #[tokio::test]
    async fn test_negative_count_rejected() {
        let engine = test_engine().await;
        let p = seed_product(&engine, "ZAATAR", 2, 100).await;

        let outcome = update_stock(&engine, &chef(), &p.id, -1, "Count").await;
        assert_eq!(outcome.error().map(|e| e.code), Some(ErrorCode::ValidationError));
    }

    #[tokio::test]
    async fn test_create_and_low_stock() {
        let engine = test_engine().await;

        let created = create_product(
            &engine,
            &NewProduct {
                code: "SAFFRON".to_string(),
                name: "Saffron rice".to_string(),
                initial_stock: 1,
                reorder_level: 3,
                cost_price_cents: 200,
                sell_price_cents: 650,
            },
        )
        .await
        .into_result()
        .unwrap();
        seed_product(&engine, "BULGUR", 50, 300).await;

        let low = low_stock(&engine).await.into_result().unwrap();
        assert_eq!(low.products.len(), 1);
        assert_eq!(low.products[0].id, created.product.id);

        let all = list_products(&engine, None).await.into_result().unwrap();
        assert_eq!(all.products.len(), 2);

        let duplicate = create_product(
            &engine,
            &NewProduct {
                code: "SAFFRON".to_string(),
                name: "Another".to_string(),
                initial_stock: 0,
                reorder_level: 0,
                cost_price_cents: 0,
                sell_price_cents: 0,
            },
        )
        .await;
        assert_eq!(duplicate.error().map(|e| e.code), Some(ErrorCode::ValidationError));
    }

    #[tokio::test]
    async fn test_audit_unknown_product() {
        let engine = test_engine().await;
        let outcome = stock_audit(&engine, "ghost").await;
        assert_eq!(outcome.error().map(|e| e.code), Some(ErrorCode::NotFound));
    }
}
