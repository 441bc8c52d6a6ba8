//! # Sale Commands

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::commands::open_shift_id;
use crate::engine::PosEngine;
use crate::error::ApiError;
use crate::outcome::Outcome;
use mezze_core::sale::SaleHeader;
use mezze_core::{Actor, CartLine, Sale, SaleDetail};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleResponse {
    pub sale_id: String,
    pub receipt_number: String,
    pub order_number: String,
    /// Shift the sale was folded into, if the cashier had one open.
    pub shift_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub sale: SaleDetail,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftSalesResponse {
    pub sales: Vec<Sale>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintedResponse {
    pub sale_id: String,
}

/// Settles a cart into a sale.
///
/// The sale is attached to the actor's open shift when there is one.
/// Any failure rolls the whole sale back: no header, no lines, no stock
/// change, no shift change.
pub async fn create_sale(
    engine: &PosEngine,
    actor: &Actor,
    header: &SaleHeader,
    items: &[CartLine],
) -> Outcome<CreateSaleResponse> {
    debug!(actor = %actor.id, lines = items.len(), "create_sale command");
    settle(engine, actor, header, items).await.into()
}

async fn settle(
    engine: &PosEngine,
    actor: &Actor,
    header: &SaleHeader,
    items: &[CartLine],
) -> Result<CreateSaleResponse, ApiError> {
    let shift_id = open_shift_id(engine, actor).await?;

    let receipt = engine
        .db()
        .sales()
        .create_sale(actor, shift_id.as_deref(), header, items)
        .await?;

    info!(
        sale_id = %receipt.sale_id,
        order_number = %receipt.order_number,
        shift_id = ?shift_id,
        "Sale settled"
    );

    Ok(CreateSaleResponse {
        sale_id: receipt.sale_id,
        receipt_number: receipt.receipt_number,
        order_number: receipt.order_number,
        shift_id,
    })
}

/// Reads a sale back with its lines (receipt reprint, order lookup).
pub async fn get_sale(engine: &PosEngine, sale_id: &str) -> Outcome<SaleResponse> {
    let result = async {
        let sale = engine
            .db()
            .sales()
            .get(sale_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Sale", sale_id))?;
        Ok::<_, ApiError>(SaleResponse { sale })
    };
    result.await.into()
}

/// Every sale folded into a shift, for the end-of-day listing.
pub async fn shift_sales(engine: &PosEngine, shift_id: &str) -> Outcome<ShiftSalesResponse> {
    engine
        .db()
        .sales()
        .list_by_shift(shift_id)
        .await
        .map(|sales| ShiftSalesResponse { sales })
        .into()
}

/// Records that the receipt came off the printer.
pub async fn mark_receipt_printed(engine: &PosEngine, sale_id: &str) -> Outcome<PrintedResponse> {
    engine
        .db()
        .sales()
        .mark_printed(sale_id)
        .await
        .map(|()| PrintedResponse {
            sale_id: sale_id.to_string(),
        })
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{seed_product, test_engine};
    use crate::error::ErrorCode;
    use mezze_core::{OrderType, PaymentMethod};

    fn cash_header(total: i64) -> SaleHeader {
        SaleHeader {
            order_type: Some(OrderType::Takeaway),
            payment_method: Some(PaymentMethod::Cash),
            subtotal_cents: Some(total),
            total_cents: Some(total),
            ..SaleHeader::default()
        }
    }

    #[tokio::test]
    async fn test_sale_of_three_leaves_two() {
        let engine = test_engine().await;
        let p = seed_product(&engine, "FALAFEL", 5, 500).await;
        let actor = Actor::new("cashier-1");

        let outcome = create_sale(&engine, &actor, &cash_header(1500), &[CartLine::new(&p.id, 3, 500)]).await;
        let response = outcome.into_result().unwrap();
        assert!(response.order_number.starts_with("ORD"));
        assert!(response.receipt_number.starts_with("RC"));
        assert_eq!(response.shift_id, None);

        let product = engine.db().products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_on_hand, 2);

        let movements = engine.db().inventory().movements(&p.id).await.unwrap();
        let sale_movements: Vec<_> = movements
            .iter()
            .filter(|m| m.reference_id.as_deref() == Some(response.sale_id.as_str()))
            .collect();
        assert_eq!(sale_movements.len(), 1);
        assert_eq!(sale_movements[0].quantity, 3);

        // Now only 2 left: the next sale of 3 fails and changes nothing.
        let outcome = create_sale(&engine, &actor, &cash_header(1500), &[CartLine::new(&p.id, 3, 500)]).await;
        assert_eq!(outcome.error().map(|e| e.code), Some(ErrorCode::InsufficientStock));

        let product = engine.db().products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_on_hand, 2);
    }

    #[tokio::test]
    async fn test_sale_attaches_to_open_shift() {
        let engine = test_engine().await;
        let p = seed_product(&engine, "AYRAN", 10, 300).await;
        let actor = Actor::new("cashier-2");
        let shift = engine.db().shifts().open(&actor.id, 5_000).await.unwrap();

        let response = create_sale(&engine, &actor, &cash_header(600), &[CartLine::new(&p.id, 2, 300)])
            .await
            .into_result()
            .unwrap();
        assert_eq!(response.shift_id.as_deref(), Some(shift.id.as_str()));

        let summary = engine.db().shifts().summary(&shift.id).await.unwrap();
        assert_eq!(summary.cash_sales.cents(), 600);
        assert_eq!(summary.sale_count, 1);

        let listed = shift_sales(&engine, &shift.id).await.into_result().unwrap();
        assert_eq!(listed.sales.len(), 1);
        assert_eq!(listed.sales[0].id, response.sale_id);
    }

    #[tokio::test]
    async fn test_missing_header_field_is_reported() {
        let engine = test_engine().await;
        let p = seed_product(&engine, "OLIVES", 10, 250).await;

        let header = SaleHeader {
            payment_method: None,
            ..cash_header(250)
        };
        let outcome = create_sale(&engine, &Actor::new("c"), &header, &[CartLine::new(&p.id, 1, 250)]).await;

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert!(json["message"].as_str().unwrap().contains("payment_method"));
    }

    #[tokio::test]
    async fn test_read_back_and_print() {
        let engine = test_engine().await;
        let p = seed_product(&engine, "KNAFEH", 4, 700).await;

        let sale = create_sale(&engine, &Actor::new("c"), &cash_header(700), &[CartLine::new(&p.id, 1, 700)])
            .await
            .into_result()
            .unwrap();

        let read = get_sale(&engine, &sale.sale_id).await.into_result().unwrap();
        assert_eq!(read.sale.items.len(), 1);
        assert_eq!(read.sale.items[0].name_snapshot, "KNAFEH plate");
        assert!(!read.sale.sale.is_printed);

        assert!(mark_receipt_printed(&engine, &sale.sale_id).await.is_success());
        let read = get_sale(&engine, &sale.sale_id).await.into_result().unwrap();
        assert!(read.sale.sale.is_printed);

        let missing = get_sale(&engine, "nope").await;
        assert_eq!(missing.error().map(|e| e.code), Some(ErrorCode::NotFound));
    }
}
