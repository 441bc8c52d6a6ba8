//! # Purchase Repository
//!
//! Supplier invoices: stock comes IN, money goes out in one or more payments.
//!
//! ## Invoice Settlement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_purchase                                                        │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │ SINGLE TRANSACTION                                                │ │
//! │  │  INSERT purchases (totals + derived payment_status)               │ │
//! │  │  for each line:                                                   │ │
//! │  │     INSERT purchase_items                                         │ │
//! │  │     stock + qty, IN/PURCHASE movement                             │ │
//! │  │     products.cost_price_cents = unit cost                         │ │
//! │  │  paid > 0:  INSERT purchase_payments                              │ │
//! │  │             cash?  INSERT cash_expenses (drawer outflow)          │ │
//! │  └───────────────────────────────────────────────────────────────────┘ │
//! │                                                                         │
//! │  make_payment                                                           │
//! │  ┌───────────────────────────────────────────────────────────────────┐ │
//! │  │ SINGLE TRANSACTION                                                │ │
//! │  │  new_paid = paid + amount   (rejected past the total)             │ │
//! │  │  UPDATE purchases SET paid_amount_cents, payment_status           │ │
//! │  │    WHERE paid_amount_cents = paid   (0 rows ──▶ abort)            │ │
//! │  │  INSERT purchase_payments  (+ cash_expenses when cash)            │ │
//! │  └───────────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Local, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::inventory::{apply_stock_delta, StockChange};
use crate::repository::{begin_write, new_id};
use crate::repository::shift;
use mezze_core::purchase::{apply_payment, PaymentApplication, PurchaseDraft, PurchaseHeader, PurchaseLine};
use mezze_core::{
    Actor, Money, Purchase, PurchaseDetail, PurchaseItem, PurchasePayment, ReferenceType,
    SupplierPaymentMethod, ValidationError,
};

const PURCHASE_COLUMNS: &str = r#"
    id, supplier_id, invoice_number, purchase_date, subtotal_cents, discount_cents,
    total_cents, paid_amount_cents, payment_status, notes, created_by, created_at
"#;

/// Repository for supplier invoices.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    /// Creates a new PurchaseRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Records a supplier invoice and receives its stock.
    ///
    /// `shift_id` is the drawer an initial cash payment comes out of.
    ///
    /// ## Errors
    /// * `CoreError::Validation` - bad input, or the invoice number is
    ///   already recorded for this supplier
    /// * `CoreError::Overpayment` - initial payment above the total
    /// * `CoreError::ProductNotFound` - a line names an unknown product
    pub async fn create_purchase(
        &self,
        actor: &Actor,
        shift_id: Option<&str>,
        header: &PurchaseHeader,
        items: &[PurchaseLine],
    ) -> DbResult<PurchaseDetail> {
        let draft = PurchaseDraft::build(header, items, Local::now().date_naive())?;
        let now = Utc::now();

        let purchase = Purchase {
            id: new_id(),
            supplier_id: draft.supplier_id.clone(),
            invoice_number: draft.invoice_number.clone(),
            purchase_date: draft.purchase_date,
            subtotal_cents: draft.subtotal.cents(),
            discount_cents: draft.discount.cents(),
            total_cents: draft.total.cents(),
            paid_amount_cents: draft.paid.cents(),
            payment_status: draft.payment_status,
            notes: draft.notes.clone(),
            created_by: actor.id.clone(),
            created_at: now,
        };

        debug!(
            purchase_id = %purchase.id,
            invoice_number = %purchase.invoice_number,
            lines = draft.lines.len(),
            "Recording purchase"
        );

        let mut tx = begin_write(&self.pool).await?;

        let sql = format!(
            "INSERT INTO purchases ({PURCHASE_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        );
        let inserted = sqlx::query(&sql)
            .bind(&purchase.id)
            .bind(&purchase.supplier_id)
            .bind(&purchase.invoice_number)
            .bind(purchase.purchase_date)
            .bind(purchase.subtotal_cents)
            .bind(purchase.discount_cents)
            .bind(purchase.total_cents)
            .bind(purchase.paid_amount_cents)
            .bind(purchase.payment_status)
            .bind(&purchase.notes)
            .bind(&purchase.created_by)
            .bind(purchase.created_at)
            .execute(&mut *tx)
            .await;

        if let Err(e) = inserted {
            let err = DbError::from(e);
            if err.is_unique_violation_on("purchases.invoice_number") {
                return Err(ValidationError::Duplicate {
                    field: "invoice_number".to_string(),
                    value: purchase.invoice_number,
                }
                .into());
            }
            return Err(err);
        }

        let reason = format!("Purchase {}", purchase.invoice_number);
        let mut saved_items = Vec::with_capacity(draft.lines.len());

        for line in &draft.lines {
            apply_stock_delta(
                &mut tx,
                &StockChange {
                    product_id: &line.product_id,
                    delta: line.quantity,
                    reference_type: ReferenceType::Purchase,
                    reference_id: Some(&purchase.id),
                    reason: &reason,
                    actor_id: &actor.id,
                },
            )
            .await?;

            sqlx::query("UPDATE products SET cost_price_cents = ?1 WHERE id = ?2")
                .bind(line.unit_cost.cents())
                .bind(&line.product_id)
                .execute(&mut *tx)
                .await?;

            let item = PurchaseItem {
                id: new_id(),
                purchase_id: purchase.id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_cost_cents: line.unit_cost.cents(),
                discount_cents: line.discount.cents(),
                line_total_cents: line.line_total.cents(),
            };

            sqlx::query(
                r#"
                INSERT INTO purchase_items (
                    id, purchase_id, product_id, quantity,
                    unit_cost_cents, discount_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&item.id)
            .bind(&item.purchase_id)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_cost_cents)
            .bind(item.discount_cents)
            .bind(item.line_total_cents)
            .execute(&mut *tx)
            .await?;

            saved_items.push(item);
        }

        if let Some(method) = draft.payment_method.filter(|_| draft.paid.is_positive()) {
            record_payment(
                &mut tx,
                &purchase,
                draft.paid,
                method,
                shift_id,
                &actor.id,
            )
            .await?;
        }

        tx.commit().await?;

        info!(
            purchase_id = %purchase.id,
            invoice_number = %purchase.invoice_number,
            total = %draft.total,
            status = ?purchase.payment_status,
            "Purchase recorded"
        );

        Ok(PurchaseDetail {
            purchase,
            items: saved_items,
        })
    }

    /// Pays (part of) an invoice.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - unknown purchase
    /// * `CoreError::Validation` - amount not positive
    /// * `CoreError::Overpayment` - amount above the outstanding balance
    pub async fn make_payment(
        &self,
        actor: &Actor,
        shift_id: Option<&str>,
        purchase_id: &str,
        amount_cents: i64,
        method: SupplierPaymentMethod,
    ) -> DbResult<PaymentApplication> {
        let mut tx = begin_write(&self.pool).await?;

        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?1");
        let purchase = sqlx::query_as::<_, Purchase>(&sql)
            .bind(purchase_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase", purchase_id))?;

        let application = apply_payment(
            Money::from_cents(purchase.paid_amount_cents),
            Money::from_cents(purchase.total_cents),
            Money::from_cents(amount_cents),
        )?;

        // Compare-and-set against the amount the payment was computed from.
        let updated = sqlx::query(
            r#"
            UPDATE purchases
            SET paid_amount_cents = ?1, payment_status = ?2
            WHERE id = ?3 AND paid_amount_cents = ?4
            "#,
        )
        .bind(application.new_paid.cents())
        .bind(application.status)
        .bind(purchase_id)
        .bind(purchase.paid_amount_cents)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() != 1 {
            return Err(DbError::TransactionFailed(format!(
                "purchase {purchase_id} was paid concurrently"
            )));
        }

        record_payment(
            &mut tx,
            &purchase,
            Money::from_cents(amount_cents),
            method,
            shift_id,
            &actor.id,
        )
        .await?;

        tx.commit().await?;

        info!(
            purchase_id,
            amount = %Money::from_cents(amount_cents),
            new_paid = %application.new_paid,
            remaining = %application.remaining,
            status = ?application.status,
            "Supplier payment recorded"
        );

        Ok(application)
    }

    /// Gets an invoice with its lines.
    pub async fn get(&self, purchase_id: &str) -> DbResult<Option<PurchaseDetail>> {
        let sql = format!("SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?1");
        let Some(purchase) = sqlx::query_as::<_, Purchase>(&sql)
            .bind(purchase_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, PurchaseItem>(
            r#"
            SELECT id, purchase_id, product_id, quantity,
                   unit_cost_cents, discount_cents, line_total_cents
            FROM purchase_items
            WHERE purchase_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(PurchaseDetail { purchase, items }))
    }

    /// Payments made against an invoice, oldest first.
    pub async fn payments(&self, purchase_id: &str) -> DbResult<Vec<PurchasePayment>> {
        let payments = sqlx::query_as::<_, PurchasePayment>(
            r#"
            SELECT id, purchase_id, amount_cents, method, shift_id, actor_id, created_at
            FROM purchase_payments
            WHERE purchase_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Invoices not yet fully paid, oldest first.
    pub async fn list_outstanding(&self) -> DbResult<Vec<Purchase>> {
        let sql = format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases \
             WHERE payment_status <> 'PAID' \
             ORDER BY purchase_date, created_at"
        );
        let purchases = sqlx::query_as::<_, Purchase>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(purchases)
    }
}

/// Inserts a payment row, plus a drawer outflow when paid in cash.
async fn record_payment(
    conn: &mut SqliteConnection,
    purchase: &Purchase,
    amount: Money,
    method: SupplierPaymentMethod,
    shift_id: Option<&str>,
    actor_id: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO purchase_payments (
            id, purchase_id, amount_cents, method, shift_id, actor_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(new_id())
    .bind(&purchase.id)
    .bind(amount.cents())
    .bind(method)
    .bind(shift_id)
    .bind(actor_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if method.is_cash() {
        let description = format!(
            "Supplier payment {} / {}",
            purchase.supplier_id, purchase.invoice_number
        );
        shift::record_cash_expense(conn, shift_id, &purchase.id, amount, &description, actor_id)
            .await?;
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{file_db, seed_product, test_db};
    use mezze_core::{CoreError, MovementDirection, PaymentStatus};

    fn manager() -> Actor {
        Actor::new("manager-1")
    }

    fn header(invoice: &str) -> PurchaseHeader {
        PurchaseHeader {
            supplier_id: Some("sup-bakery".to_string()),
            invoice_number: Some(invoice.to_string()),
            ..PurchaseHeader::default()
        }
    }

    #[tokio::test]
    async fn test_purchase_receives_stock() {
        let db = test_db().await;
        let flour = seed_product(&db, "FLOUR", 5, 300).await;

        let detail = db
            .purchases()
            .create_purchase(&manager(), None, &header("INV-1"), &[PurchaseLine::new(&flour.id, 20, 120)])
            .await
            .unwrap();

        assert_eq!(detail.purchase.total_cents, 2400);
        assert_eq!(detail.purchase.payment_status, PaymentStatus::Unpaid);
        assert_eq!(detail.items.len(), 1);

        let product = db.products().get_by_id(&flour.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_on_hand, 25);
        assert_eq!(product.cost_price_cents, 120);

        let movements = db
            .inventory()
            .movements_for_reference(&detail.purchase.id)
            .await
            .unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].direction, MovementDirection::In);
        assert_eq!(movements[0].reference_type, ReferenceType::Purchase);
        assert!(db.inventory().audit(&flour.id).await.unwrap().is_consistent());

        let fetched = db.purchases().get(&detail.purchase.id).await.unwrap().unwrap();
        assert_eq!(fetched.items[0].line_total_cents, 2400);
    }

    #[tokio::test]
    async fn test_partial_then_full_payment() {
        let db = test_db().await;
        let oil = seed_product(&db, "OIL", 0, 1000).await;

        let detail = db
            .purchases()
            .create_purchase(&manager(), None, &header("INV-2"), &[PurchaseLine::new(&oil.id, 10, 1000)])
            .await
            .unwrap();
        let id = detail.purchase.id;

        let first = db
            .purchases()
            .make_payment(&manager(), None, &id, 4_000, SupplierPaymentMethod::BankTransfer)
            .await
            .unwrap();
        assert_eq!(first.status, PaymentStatus::Partial);
        assert_eq!(first.new_paid.cents(), 4_000);
        assert_eq!(first.remaining.cents(), 6_000);

        let second = db
            .purchases()
            .make_payment(&manager(), None, &id, 6_000, SupplierPaymentMethod::Cheque)
            .await
            .unwrap();
        assert_eq!(second.status, PaymentStatus::Paid);
        assert_eq!(second.remaining, Money::zero());

        assert_eq!(db.purchases().payments(&id).await.unwrap().len(), 2);
        assert!(db.purchases().list_outstanding().await.unwrap().is_empty());

        let err = db
            .purchases()
            .make_payment(&manager(), None, &id, 1, SupplierPaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Overpayment { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_invoice_per_supplier() {
        let db = test_db().await;
        let p = seed_product(&db, "SUGAR", 0, 100).await;
        let lines = [PurchaseLine::new(&p.id, 1, 100)];

        db.purchases()
            .create_purchase(&manager(), None, &header("INV-3"), &lines)
            .await
            .unwrap();

        let err = db
            .purchases()
            .create_purchase(&manager(), None, &header("INV-3"), &lines)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));

        // Same number from another supplier is a different invoice.
        let other = PurchaseHeader {
            supplier_id: Some("sup-dairy".to_string()),
            ..header("INV-3")
        };
        db.purchases()
            .create_purchase(&manager(), None, &other, &lines)
            .await
            .unwrap();

        let product = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_on_hand, 2);
    }

    #[tokio::test]
    async fn test_unknown_product_rolls_back_invoice() {
        let db = test_db().await;
        let p = seed_product(&db, "SALT", 0, 50).await;

        let err = db
            .purchases()
            .create_purchase(
                &manager(),
                None,
                &header("INV-4"),
                &[PurchaseLine::new(&p.id, 5, 50), PurchaseLine::new("ghost", 1, 50)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));

        let product = db.products().get_by_id(&p.id).await.unwrap().unwrap();
        assert_eq!(product.quantity_on_hand, 0);
        assert!(db.purchases().list_outstanding().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_initial_cash_payment_hits_the_drawer() {
        let db = test_db().await;
        let p = seed_product(&db, "LEMONS", 0, 40).await;
        let shift = db.shifts().open("cashier-1", 10_000).await.unwrap();

        let h = PurchaseHeader {
            paid_amount_cents: Some(1_500),
            payment_method: Some(SupplierPaymentMethod::Cash),
            ..header("INV-5")
        };
        let detail = db
            .purchases()
            .create_purchase(&manager(), Some(&shift.id), &h, &[PurchaseLine::new(&p.id, 50, 40)])
            .await
            .unwrap();

        assert_eq!(detail.purchase.payment_status, PaymentStatus::Partial);
        assert_eq!(db.purchases().payments(&detail.purchase.id).await.unwrap().len(), 1);

        let summary = db.shifts().summary(&shift.id).await.unwrap();
        assert_eq!(summary.cash_out.cents(), 1_500);
        assert_eq!(summary.expected_cash.cents(), 8_500);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_payments_never_exceed_total() {
        let (db, _dir) = file_db().await;
        let flour = seed_product(&db, "FLOUR", 0, 1000).await;

        let detail = db
            .purchases()
            .create_purchase(&manager(), None, &header("INV-9"), &[PurchaseLine::new(&flour.id, 10, 1000)])
            .await
            .unwrap();
        let id = detail.purchase.id;

        let mut handles = Vec::new();
        for _ in 0..4 {
            let db = db.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                db.purchases()
                    .make_payment(&manager(), None, &id, 4_000, SupplierPaymentMethod::BankTransfer)
                    .await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(DbError::Domain(CoreError::Overpayment { .. })) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(accepted, 2);

        let fetched = db.purchases().get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.purchase.paid_amount_cents, 8_000);
        assert_eq!(fetched.purchase.payment_status, PaymentStatus::Partial);
        assert_eq!(db.purchases().payments(&id).await.unwrap().len(), 2);
    }
}
