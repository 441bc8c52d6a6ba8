//! # Commands Module
//!
//! All operations exposed to the till and back-office frontends.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs        ◄─── You are here (exports)
//! ├── sale.rs       ◄─── Sale settlement, receipt read-back
//! ├── held.rs       ◄─── Parked carts
//! ├── purchase.rs   ◄─── Supplier invoices and payments
//! ├── inventory.rs  ◄─── Products, manual stock changes, audit
//! └── shift.rs      ◄─── Register shifts
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Command Flow                                     │
//! │                                                                         │
//! │  pub async fn create_sale(engine, actor, header, items)                 │
//! │      -> Outcome<CreateSaleResponse>                                     │
//! │         │                                                               │
//! │         ├── resolve the actor's open shift (or none)                    │
//! │         ├── engine.db().sales().create_sale(..)   one transaction       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Result<CreateSaleResponse, ApiError>  ──into()──►  Outcome             │
//! │                                                                         │
//! │  { "success": true, "saleId": "...", "orderNumber": "...", ... }        │
//! │  { "success": false, "code": "...", "message": "..." }                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The actor is always passed in explicitly; commands never look up a
//! "current user".

pub mod held;
pub mod inventory;
pub mod purchase;
pub mod sale;
pub mod shift;

use mezze_core::Actor;

use crate::engine::PosEngine;
use crate::error::ApiError;

/// Id of the actor's open shift, if they have one.
pub(crate) async fn open_shift_id(
    engine: &PosEngine,
    actor: &Actor,
) -> Result<Option<String>, ApiError> {
    let shift = engine.db().shifts().find_open(&actor.id).await?;
    Ok(shift.map(|s| s.id))
}
