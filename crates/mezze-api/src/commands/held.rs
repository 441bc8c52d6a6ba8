//! # Held Order Commands
//!
//! Park a cart (table still eating, customer stepped away), list what is
//! parked, resume one back into the till, or throw it away. None of these
//! touch stock or shift totals.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::PosEngine;
use crate::outcome::Outcome;
use mezze_core::sale::HeldCart;
use mezze_core::{Actor, HeldOrder};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldOrderResponse {
    pub held_id: String,
    pub order_number: String,
    pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldOrdersResponse {
    pub orders: Vec<HeldOrder>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeHeldOrderResponse {
    pub order: HeldOrder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteHeldOrderResponse {
    pub deleted: bool,
}

pub async fn hold_order(engine: &PosEngine, actor: &Actor, cart: &HeldCart) -> Outcome<HoldOrderResponse> {
    debug!(actor = %actor.id, lines = cart.items.len(), "hold_order command");

    engine
        .db()
        .held_orders()
        .hold(actor, cart)
        .await
        .map(|held| {
            info!(held_id = %held.id, order_number = %held.order_number, "Order held");
            HoldOrderResponse {
                held_id: held.id,
                order_number: held.order_number,
                total_cents: held.total_cents,
            }
        })
        .into()
}

/// Parked carts, oldest first. `owner` limits the list to one actor.
pub async fn get_held_orders(engine: &PosEngine, owner: Option<&str>) -> Outcome<HeldOrdersResponse> {
    engine
        .db()
        .held_orders()
        .list(owner)
        .await
        .map(|orders| HeldOrdersResponse { orders })
        .into()
}

/// Removes the parked cart and hands it back to the till.
///
/// The caller settles it later through `create_sale`, typically with
/// [`HeldOrder::to_sale_request`] so the held order number is reused.
pub async fn resume_held_order(engine: &PosEngine, held_id: &str) -> Outcome<ResumeHeldOrderResponse> {
    debug!(held_id, "resume_held_order command");

    engine
        .db()
        .held_orders()
        .resume(held_id)
        .await
        .map(|order| ResumeHeldOrderResponse { order })
        .into()
}

pub async fn delete_held_order(engine: &PosEngine, held_id: &str) -> Outcome<DeleteHeldOrderResponse> {
    engine
        .db()
        .held_orders()
        .delete(held_id)
        .await
        .map(|deleted| DeleteHeldOrderResponse { deleted })
        .into()
}
