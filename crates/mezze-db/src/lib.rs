//! # mezze-db: Database Layer for Mezze POS
//!
//! SQLite persistence for the settlement engine: the inventory ledger, number
//! allocation, sale and purchase settlement, held orders and shifts.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mezze POS Data Flow                              │
//! │                                                                         │
//! │  mezze-api command (create_sale)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     mezze-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ SaleRepo ──┐   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ PurchaseRepo ─┤│    │ 001_initial  │  │   │
//! │  │   │               │    │ HeldOrderRepo ││    │  _schema.sql │  │   │
//! │  │   │               │    │ ShiftRepo   ◄─┤│    │              │  │   │
//! │  │   │               │    │ InventoryRepo◄┘│    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (mezze.db)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Ledger, settlements, held orders, shifts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mezze_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("mezze.db")).await?;
//! let shift = db.shifts().open("cashier-1", 20_000).await?;
//! let receipt = db.sales().create_sale(&actor, Some(&shift.id), &header, &items).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::held_order::HeldOrderRepository;
pub use repository::inventory::{InventoryRepository, StockChange};
pub use repository::numbering::NumberingConfig;
pub use repository::product::ProductRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::sale::{SaleReceipt, SaleRepository};
pub use repository::shift::{ShiftClose, ShiftRepository};
