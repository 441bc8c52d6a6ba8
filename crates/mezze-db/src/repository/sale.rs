//! # Sale Repository
//!
//! Sale settlement: turns a validated cart into a committed sale in one
//! transaction, and reads sales back for receipts and reports.
//!
//! ## Settlement Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleHeader::validate(items)   ← before BEGIN, no side effects          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. UPDATE shifts SET x = x + ? ... WHERE is_closed = 0        │   │
//! │  │     (only when a shift is attached; 0 rows → ShiftNotOpen)     │   │
//! │  │                                                                 │   │
//! │  │  2. INSERT INTO sales (order_number, receipt_number, ...)      │   │
//! │  │     (numbers allocated here, regenerated on collision)          │   │
//! │  │                                                                 │   │
//! │  │  3. for each line:                                              │   │
//! │  │       guarded stock decrement + SALE/OUT movement               │   │
//! │  │       INSERT INTO sale_items (name frozen from the product)     │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← all of it, or (any error) none of it                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::inventory::{apply_stock_delta, StockChange};
use crate::repository::{begin_write, new_id};
use crate::repository::numbering::{count_orders_on, is_held, NumberingConfig, OrderNumbers};
use crate::repository::shift;
use mezze_core::sale::{SaleDraft, SaleHeader, ShiftIncrement};
use mezze_core::{Actor, CartLine, ReferenceType, Sale, SaleDetail, SaleItem};

const SALE_COLUMNS: &str = r#"
    id, order_number, receipt_number, order_type, payment_method,
    subtotal_cents, discount_cents, delivery_fee_cents, total_cents,
    amount_received_cents, change_cents,
    customer_name, customer_phone, customer_address, table_number, notes,
    shift_id, cashier_id, business_date, is_printed, created_at
"#;

/// Identifiers of a committed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub sale_id: String,
    pub order_number: String,
    pub receipt_number: String,
}

/// Repository for sale settlement and read-back.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    numbering: NumberingConfig,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, numbering: NumberingConfig) -> Self {
        SaleRepository { pool, numbering }
    }

    /// Settles a cart into a committed sale.
    ///
    /// ## Arguments
    /// * `actor` - cashier taking the order
    /// * `shift_id` - open shift to fold the sale into, if any
    /// * `header` / `items` - the cart as the till sent it
    ///
    /// ## Errors
    /// * `CoreError::Validation` - bad input; nothing was written
    /// * `CoreError::InsufficientStock` / `ProductNotFound` - a line failed;
    ///   the whole sale was rolled back
    /// * `CoreError::ShiftNotOpen` - the attached shift is closed or unknown
    /// * `DbError::TransactionFailed` - no free order/receipt number
    pub async fn create_sale(
        &self,
        actor: &Actor,
        shift_id: Option<&str>,
        header: &SaleHeader,
        items: &[CartLine],
    ) -> DbResult<SaleReceipt> {
        let draft = header.validate(items)?;
        let business_date = Local::now().date_naive();
        self.settle(actor, shift_id, &draft, business_date).await
    }

    async fn settle(
        &self,
        actor: &Actor,
        shift_id: Option<&str>,
        draft: &SaleDraft,
        business_date: NaiveDate,
    ) -> DbResult<SaleReceipt> {
        let sale_id = new_id();

        debug!(
            sale_id = %sale_id,
            lines = draft.lines.len(),
            total = %draft.total,
            "Settling sale"
        );

        let mut tx = begin_write(&self.pool).await?;

        // Shift first: a closed or unknown shift aborts before any row is written.
        if let Some(shift_id) = shift_id {
            shift::apply_sale(&mut tx, shift_id, &ShiftIncrement::for_sale(draft)).await?;
        }

        let (order_number, receipt_number) = self
            .insert_header(&mut tx, &sale_id, actor, shift_id, draft, business_date)
            .await?;

        let reason = format!("Sale {order_number}");
        for line in &draft.lines {
            let applied = apply_stock_delta(
                &mut tx,
                &StockChange {
                    product_id: &line.product_id,
                    delta: -line.quantity,
                    reference_type: ReferenceType::Sale,
                    reference_id: Some(&sale_id),
                    reason: &reason,
                    actor_id: &actor.id,
                },
            )
            .await?;

            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, name_snapshot,
                    quantity, unit_price_cents, line_total_cents, note
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(new_id())
            .bind(&sale_id)
            .bind(&line.product_id)
            .bind(&applied.product_name)
            .bind(line.quantity)
            .bind(line.unit_price.cents())
            .bind(line.line_total.cents())
            .bind(&line.note)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            order_number = %order_number,
            receipt_number = %receipt_number,
            total = %draft.total,
            payment_method = ?draft.payment_method,
            shift_id = ?shift_id,
            "Sale committed"
        );

        Ok(SaleReceipt {
            sale_id,
            order_number,
            receipt_number,
        })
    }

    /// Inserts the sale header, allocating numbers until the UNIQUE
    /// constraints accept them.
    async fn insert_header(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
        actor: &Actor,
        shift_id: Option<&str>,
        draft: &SaleDraft,
        business_date: NaiveDate,
    ) -> DbResult<(String, String)> {
        let existing = count_orders_on(conn, business_date).await?;
        let mut numbers = OrderNumbers::new(
            &self.numbering,
            business_date,
            existing,
            draft.order_number.clone(),
        );
        let now = Utc::now();

        for attempt in 0..self.numbering.attempts() {
            let (order_number, preferred) = numbers.next_candidate();
            if is_held(conn, &order_number).await? {
                if preferred {
                    warn!(order_number = %order_number, "Order number is on a parked cart, allocating a new one");
                } else {
                    debug!(attempt, order_number = %order_number, "Order number parked on a held cart");
                }
                continue;
            }
            let receipt_number = self.numbering.receipt_number(business_date);

            let result = sqlx::query(
                r#"
                INSERT INTO sales (
                    id, order_number, receipt_number, order_type, payment_method,
                    subtotal_cents, discount_cents, delivery_fee_cents, total_cents,
                    amount_received_cents, change_cents,
                    customer_name, customer_phone, customer_address, table_number, notes,
                    shift_id, cashier_id, business_date, is_printed, created_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5,
                    ?6, ?7, ?8, ?9,
                    ?10, ?11,
                    ?12, ?13, ?14, ?15, ?16,
                    ?17, ?18, ?19, 0, ?20
                )
                "#,
            )
            .bind(sale_id)
            .bind(&order_number)
            .bind(&receipt_number)
            .bind(draft.order_type)
            .bind(draft.payment_method)
            .bind(draft.subtotal.cents())
            .bind(draft.discount.cents())
            .bind(draft.delivery_fee.cents())
            .bind(draft.total.cents())
            .bind(draft.amount_received.cents())
            .bind(draft.change.cents())
            .bind(&draft.customer.name)
            .bind(&draft.customer.phone)
            .bind(&draft.customer.address)
            .bind(&draft.table_number)
            .bind(&draft.notes)
            .bind(shift_id)
            .bind(&actor.id)
            .bind(business_date)
            .bind(now)
            .execute(&mut *conn)
            .await;

            match result {
                Ok(_) => return Ok((order_number, receipt_number)),
                Err(e) => {
                    let err = DbError::from(e);
                    if err.is_unique_violation_on("sales.order_number") {
                        if preferred {
                            warn!(
                                order_number = %order_number,
                                "Order number already used, allocating a new one"
                            );
                        } else {
                            debug!(attempt, order_number = %order_number, "Order number collision");
                        }
                    } else if err.is_unique_violation_on("sales.receipt_number") {
                        debug!(attempt, receipt_number = %receipt_number, "Receipt number collision");
                    } else {
                        return Err(err);
                    }
                }
            }
        }

        Err(DbError::TransactionFailed(format!(
            "no free order/receipt number after {} attempts",
            self.numbering.attempts()
        )))
    }

    // =========================================================================
    // Read-back
    // =========================================================================

    /// Gets a sale with its lines.
    pub async fn get(&self, sale_id: &str) -> DbResult<Option<SaleDetail>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let Some(sale) = sqlx::query_as::<_, Sale>(&sql)
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let items = self.get_items(sale_id).await?;
        Ok(Some(SaleDetail { sale, items }))
    }

    /// Gets a sale by its order number.
    pub async fn get_by_order_number(&self, order_number: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE order_number = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Lines of a sale, in cart order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, name_snapshot,
                   quantity, unit_price_cents, line_total_cents, note
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Sales folded into a shift, oldest first.
    pub async fn list_by_shift(&self, shift_id: &str) -> DbResult<Vec<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE shift_id = ?1 ORDER BY created_at, rowid");
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(shift_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Marks the receipt as printed. The only mutation a sale allows.
    pub async fn mark_printed(&self, sale_id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE sales SET is_printed = 1 WHERE id = ?1")
            .bind(sale_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{file_db, seed_product, test_db};
    use mezze_core::{CoreError, CustomerSnapshot, MovementDirection, OrderType, PaymentMethod, ValidationError};

    fn cashier() -> Actor {
        Actor::new("cashier-1")
    }

    fn header(order_type: OrderType, method: PaymentMethod, subtotal: i64) -> SaleHeader {
        SaleHeader {
            order_type: Some(order_type),
            payment_method: Some(method),
            subtotal_cents: Some(subtotal),
            total_cents: Some(subtotal),
            ..SaleHeader::default()
        }
    }

    #[tokio::test]
    async fn test_create_sale_decrements_stock_and_logs() {
        let db = test_db().await;
        let kofta = seed_product(&db, "KOFTA", 10, 1450).await;
        let hummus = seed_product(&db, "HUMMUS", 5, 600).await;

        let items = [CartLine::new(&kofta.id, 2, 1450), CartLine::new(&hummus.id, 1, 600)];
        let receipt = db
            .sales()
            .create_sale(&cashier(), None, &header(OrderType::DineIn, PaymentMethod::Card, 3500), &items)
            .await
            .unwrap();

        assert!(receipt.order_number.starts_with("ORD"));
        assert!(receipt.order_number.ends_with("001"));
        assert!(receipt.receipt_number.starts_with("RC"));

        let detail = db.sales().get(&receipt.sale_id).await.unwrap().unwrap();
        assert_eq!(detail.sale.total_cents, 3500);
        assert_eq!(detail.sale.shift_id, None);
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].name_snapshot, "KOFTA plate");
        assert_eq!(detail.items[0].line_total_cents, 2900);

        let kofta_now = db.products().get_by_id(&kofta.id).await.unwrap().unwrap();
        assert_eq!(kofta_now.quantity_on_hand, 8);

        let movements = db.inventory().movements_for_reference(&receipt.sale_id).await.unwrap();
        assert_eq!(movements.len(), 2);
        assert!(movements
            .iter()
            .all(|m| m.direction == MovementDirection::Out && m.reference_type == ReferenceType::Sale));

        assert!(db.inventory().audit(&kofta.id).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_order_numbers_follow_daily_sequence() {
        let db = test_db().await;
        let p = seed_product(&db, "TEA", 100, 150).await;
        let items = [CartLine::new(&p.id, 1, 150)];
        let h = header(OrderType::Takeaway, PaymentMethod::Cash, 150);

        let first = db.sales().create_sale(&cashier(), None, &h, &items).await.unwrap();
        let second = db.sales().create_sale(&cashier(), None, &h, &items).await.unwrap();

        assert!(first.order_number.ends_with("001"));
        assert!(second.order_number.ends_with("002"));
        assert_ne!(first.receipt_number, second.receipt_number);
    }

    #[tokio::test]
    async fn test_failing_line_rolls_back_everything() {
        let db = test_db().await;
        let plenty = seed_product(&db, "RICE", 10, 300).await;
        let scarce = seed_product(&db, "LAMB", 1, 2000).await;

        let items = [CartLine::new(&plenty.id, 3, 300), CartLine::new(&scarce.id, 2, 2000)];
        let err = db
            .sales()
            .create_sale(&cashier(), None, &header(OrderType::DineIn, PaymentMethod::Cash, 4900), &items)
            .await
            .unwrap_err();

        match err {
            DbError::Domain(CoreError::InsufficientStock {
                product,
                available,
                requested,
            }) => {
                assert_eq!(product, "LAMB plate");
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let rice = db.products().get_by_id(&plenty.id).await.unwrap().unwrap();
        assert_eq!(rice.quantity_on_hand, 10);
        assert!(db.inventory().movements(&plenty.id).await.unwrap().is_empty());

        let sales: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(sales, 0);
    }

    #[tokio::test]
    async fn test_unknown_product_rolls_back() {
        let db = test_db().await;
        let items = [CartLine::new("ghost", 1, 100)];
        let err = db
            .sales()
            .create_sale(&cashier(), None, &header(OrderType::DineIn, PaymentMethod::Cash, 100), &items)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_validation_failure_writes_nothing() {
        let db = test_db().await;
        let p = seed_product(&db, "SOUP", 5, 500).await;

        let mut h = header(OrderType::DineIn, PaymentMethod::Cash, 500);
        h.payment_method = None;
        let err = db
            .sales()
            .create_sale(&cashier(), None, &h, &[CartLine::new(&p.id, 1, 500)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Required { .. }))
        ));

        let product = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_on_hand, 5);
    }

    #[tokio::test]
    async fn test_sale_updates_exactly_one_shift_bucket() {
        let db = test_db().await;
        let p = seed_product(&db, "WRAP", 20, 1000).await;
        let shift = db.shifts().open("cashier-1", 20_000).await.unwrap();

        let h = SaleHeader {
            discount_cents: Some(500),
            total_cents: Some(4500),
            ..header(OrderType::Delivery, PaymentMethod::CashOnDelivery, 5000)
        };
        db.sales()
            .create_sale(&cashier(), Some(&shift.id), &h, &[CartLine::new(&p.id, 5, 1000)])
            .await
            .unwrap();

        let shift = db.shifts().get(&shift.id).await.unwrap().unwrap();
        assert_eq!(shift.total_sales_cents, 4500);
        assert_eq!(shift.cash_sales_cents, 4500);
        assert_eq!(shift.card_sales_cents, 0);
        assert_eq!(shift.credit_sales_cents, 0);
        assert_eq!(shift.foc_sales_cents, 0);
        assert_eq!(shift.discount_amount_cents, 500);
        assert_eq!(shift.sale_count, 1);
    }

    #[tokio::test]
    async fn test_closed_shift_aborts_sale() {
        let db = test_db().await;
        let p = seed_product(&db, "FRIES", 5, 300).await;
        let shift = db.shifts().open("cashier-1", 0).await.unwrap();
        db.shifts().close(&shift.id, 0, None).await.unwrap();

        let err = db
            .sales()
            .create_sale(
                &cashier(),
                Some(&shift.id),
                &header(OrderType::Takeaway, PaymentMethod::Cash, 300),
                &[CartLine::new(&p.id, 1, 300)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ShiftNotOpen(_))));

        let product = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_on_hand, 5);
    }

    #[tokio::test]
    async fn test_preferred_order_number_replaced_on_collision() {
        let db = test_db().await;
        let p = seed_product(&db, "COLA", 10, 200).await;
        let items = [CartLine::new(&p.id, 1, 200)];

        let first = db
            .sales()
            .create_sale(&cashier(), None, &header(OrderType::Takeaway, PaymentMethod::Cash, 200), &items)
            .await
            .unwrap();

        let reuse = SaleHeader {
            order_number: Some(first.order_number.clone()),
            ..header(OrderType::Takeaway, PaymentMethod::Cash, 200)
        };
        let second = db.sales().create_sale(&cashier(), None, &reuse, &items).await.unwrap();

        assert_ne!(second.order_number, first.order_number);

        let fresh = SaleHeader {
            order_number: Some("TABLE7-A".to_string()),
            ..header(OrderType::Takeaway, PaymentMethod::Cash, 200)
        };
        let third = db.sales().create_sale(&cashier(), None, &fresh, &items).await.unwrap();
        assert_eq!(third.order_number, "TABLE7-A");
    }

    #[tokio::test]
    async fn test_customer_snapshot_and_print_flag() {
        let db = test_db().await;
        let p = seed_product(&db, "PIDE", 4, 1100).await;

        let h = SaleHeader {
            customer: CustomerSnapshot {
                name: Some(" Selin ".to_string()),
                phone: Some("0555 010 2030".to_string()),
                address: Some("  ".to_string()),
            },
            table_number: Some("12".to_string()),
            ..header(OrderType::DineIn, PaymentMethod::Card, 1100)
        };
        let receipt = db
            .sales()
            .create_sale(&cashier(), None, &h, &[CartLine::new(&p.id, 1, 1100)])
            .await
            .unwrap();

        db.sales().mark_printed(&receipt.sale_id).await.unwrap();

        let sale = db
            .sales()
            .get_by_order_number(&receipt.order_number)
            .await
            .unwrap()
            .unwrap();
        assert!(sale.is_printed);
        assert_eq!(sale.customer_name.as_deref(), Some("Selin"));
        assert_eq!(sale.customer_address, None);
        assert_eq!(sale.table_number.as_deref(), Some("12"));

        assert!(matches!(
            db.sales().mark_printed("missing").await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_of_different_products_all_commit() {
        let (db, _dir) = file_db().await;
        let mut products = Vec::new();
        for i in 0..8 {
            products.push(seed_product(&db, &format!("DISH-{i}"), 10, 500).await);
        }

        let mut handles = Vec::new();
        for p in products.clone() {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.sales()
                    .create_sale(
                        &cashier(),
                        None,
                        &header(OrderType::Takeaway, PaymentMethod::Cash, 500),
                        &[CartLine::new(&p.id, 1, 500)],
                    )
                    .await
            }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().order_number);
        }
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 8);

        for p in &products {
            let product = db.products().get_by_id(&p.id).await.unwrap().unwrap();
            assert_eq!(product.quantity_on_hand, 9);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_of_last_portion_sell_once() {
        let (db, _dir) = file_db().await;
        let last = seed_product(&db, "LAST-BAKLAVA", 1, 700).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            let product_id = last.id.clone();
            handles.push(tokio::spawn(async move {
                db.sales()
                    .create_sale(
                        &cashier(),
                        None,
                        &header(OrderType::Takeaway, PaymentMethod::Cash, 700),
                        &[CartLine::new(&product_id, 1, 700)],
                    )
                    .await
            }));
        }

        let mut sold = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => sold += 1,
                Err(DbError::Domain(CoreError::InsufficientStock { available, .. })) => {
                    assert_eq!(available, 0)
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(sold, 1);

        let product = db.products().get_by_id(&last.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_on_hand, 0);
        assert!(db.inventory().audit(&last.id).await.unwrap().is_consistent());
    }
}
