//! # Purchase Commands
//!
//! Supplier invoices from the back office. Cash paid to a supplier comes out
//! of the acting user's open shift drawer, if they have one.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::open_shift_id;
use crate::engine::PosEngine;
use crate::error::ApiError;
use crate::outcome::Outcome;
use mezze_core::purchase::{PurchaseHeader, PurchaseLine};
use mezze_core::{Actor, PaymentStatus, Purchase, PurchaseDetail, PurchasePayment, SupplierPaymentMethod};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseResponse {
    pub purchase_id: String,
    pub total_cents: i64,
    pub paid_amount_cents: i64,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakePaymentResponse {
    /// Paid so far, in cents.
    pub new_paid_amount: i64,
    /// Still owed, in cents. Never negative.
    pub remaining_amount: i64,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub purchase: PurchaseDetail,
    pub payments: Vec<PurchasePayment>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutstandingPurchasesResponse {
    pub purchases: Vec<Purchase>,
}

/// Records a supplier invoice and receives its stock.
pub async fn create_purchase(
    engine: &PosEngine,
    actor: &Actor,
    header: &PurchaseHeader,
    items: &[PurchaseLine],
) -> Outcome<CreatePurchaseResponse> {
    debug!(actor = %actor.id, lines = items.len(), "create_purchase command");

    let result = async {
        let shift_id = open_shift_id(engine, actor).await?;
        let detail = engine
            .db()
            .purchases()
            .create_purchase(actor, shift_id.as_deref(), header, items)
            .await?;

        Ok::<_, ApiError>(CreatePurchaseResponse {
            purchase_id: detail.purchase.id,
            total_cents: detail.purchase.total_cents,
            paid_amount_cents: detail.purchase.paid_amount_cents,
            payment_status: detail.purchase.payment_status,
        })
    };
    result.await.into()
}

/// Pays (part of) a supplier invoice.
pub async fn make_payment(
    engine: &PosEngine,
    actor: &Actor,
    purchase_id: &str,
    amount_cents: i64,
    method: SupplierPaymentMethod,
) -> Outcome<MakePaymentResponse> {
    debug!(actor = %actor.id, purchase_id, amount_cents, ?method, "make_payment command");

    let result = async {
        let shift_id = open_shift_id(engine, actor).await?;
        let applied = engine
            .db()
            .purchases()
            .make_payment(actor, shift_id.as_deref(), purchase_id, amount_cents, method)
            .await?;

        Ok::<_, ApiError>(MakePaymentResponse {
            new_paid_amount: applied.new_paid.cents(),
            remaining_amount: applied.remaining.cents(),
            payment_status: applied.status,
        })
    };
    result.await.into()
}

pub async fn get_purchase(engine: &PosEngine, purchase_id: &str) -> Outcome<PurchaseResponse> {
    let result = async {
        let purchase = engine
            .db()
            .purchases()
            .get(purchase_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Purchase", purchase_id))?;
        let payments = engine.db().purchases().payments(purchase_id).await?;

        Ok::<_, ApiError>(PurchaseResponse { purchase, payments })
    };
    result.await.into()
}

/// Invoices still owing money, oldest first.
pub async fn outstanding_purchases(engine: &PosEngine) -> Outcome<OutstandingPurchasesResponse> {
    engine
        .db()
        .purchases()
        .list_outstanding()
        .await
        .map(|purchases| OutstandingPurchasesResponse { purchases })
        .into()
}
