//! # Repository Module
//!
//! Database repositories for Mezze POS.
//!
//! ## Transaction Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Public methods take &self and own their transaction:                  │
//! │                                                                         │
//! │    db.sales().create_sale(..)                                          │
//! │       │  let mut tx = begin_write(&pool)   (BEGIN IMMEDIATE)           │
//! │       │                                                                 │
//! │       ├── shift::apply_sale(&mut tx, ..)          ┐                     │
//! │       ├── numbering + INSERT sales                 │ crate-private      │
//! │       ├── inventory::apply_stock_delta(&mut tx, ..)│ helpers taking     │
//! │       └── INSERT sale_items                        ┘ &mut Connection    │
//! │       │                                                                 │
//! │       └── tx.commit()   (any `?` before this rolls everything back)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product catalogue
//! - [`inventory::InventoryRepository`] - Stock ledger
//! - [`sale::SaleRepository`] - Sale settlement and read-back
//! - [`held_order::HeldOrderRepository`] - Parked carts
//! - [`purchase::PurchaseRepository`] - Supplier invoices and payments
//! - [`shift::ShiftRepository`] - Register shifts and reconciliation

pub mod held_order;
pub mod inventory;
pub mod numbering;
pub mod product;
pub mod purchase;
pub mod sale;
pub mod shift;

use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::error::DbResult;

/// Generates a new entity ID.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Opens a write transaction holding SQLite's write lock from the start.
///
/// Under WAL a DEFERRED transaction that reads first gets `SQLITE_BUSY`
/// (no busy-timeout retry) when it later tries to write after another
/// writer committed. `BEGIN IMMEDIATE` waits on the busy timeout instead.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

#[cfg(test)]
pub(crate) mod test_support {
    use mezze_core::{NewProduct, Product};

    use crate::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// File-backed database (WAL, pooled connections). Keep the dir alive.
    pub async fn file_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("mezze.db")))
            .await
            .unwrap();
        (db, dir)
    }

    pub async fn seed_product(db: &Database, code: &str, stock: i64, price_cents: i64) -> Product {
        db.products()
            .insert(&NewProduct {
                code: code.to_string(),
                name: format!("{code} plate"),
                initial_stock: stock,
                reorder_level: 2,
                cost_price_cents: price_cents / 3,
                sell_price_cents: price_cents,
            })
            .await
            .unwrap()
    }
}
