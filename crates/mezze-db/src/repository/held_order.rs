//! # Held-Order Store
//!
//! Parked carts. Holding, listing, resuming and discarding never touch
//! stock or shift totals; the cart only becomes a sale when the resumed
//! request is sent to sale settlement.
//!
//! ```text
//! hold ──▶ held_orders row (items as JSON) ──▶ resume ──▶ HeldOrder back to the till
//!                                         └──▶ delete ──▶ gone
//! ```

use chrono::{DateTime, Local, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, new_id};
use crate::repository::numbering::{count_orders_on, is_sold, NumberingConfig, OrderNumbers};
use mezze_core::sale::HeldCart;
use mezze_core::validation::optional_text;
use mezze_core::{Actor, CartLine, CustomerSnapshot, HeldOrder, OrderType};

const HELD_COLUMNS: &str = r#"
    id, order_number, order_type, customer_name, customer_phone, customer_address,
    table_number, notes, items, subtotal_cents, discount_cents, delivery_fee_cents,
    total_cents, held_by, held_at
"#;

/// Row shape of `held_orders`; `items` is still JSON text.
#[derive(Debug, sqlx::FromRow)]
struct HeldOrderRow {
    id: String,
    order_number: String,
    order_type: OrderType,
    customer_name: Option<String>,
    customer_phone: Option<String>,
    customer_address: Option<String>,
    table_number: Option<String>,
    notes: Option<String>,
    items: String,
    subtotal_cents: i64,
    discount_cents: i64,
    delivery_fee_cents: i64,
    total_cents: i64,
    held_by: String,
    held_at: DateTime<Utc>,
}

impl TryFrom<HeldOrderRow> for HeldOrder {
    type Error = DbError;

    fn try_from(row: HeldOrderRow) -> DbResult<Self> {
        let items: Vec<CartLine> = serde_json::from_str(&row.items)?;

        Ok(HeldOrder {
            id: row.id,
            order_number: row.order_number,
            order_type: row.order_type,
            customer: CustomerSnapshot {
                name: row.customer_name,
                phone: row.customer_phone,
                address: row.customer_address,
            },
            table_number: row.table_number,
            notes: row.notes,
            items,
            subtotal_cents: row.subtotal_cents,
            discount_cents: row.discount_cents,
            delivery_fee_cents: row.delivery_fee_cents,
            total_cents: row.total_cents,
            held_by: row.held_by,
            held_at: row.held_at,
        })
    }
}

/// Repository for parked carts.
#[derive(Debug, Clone)]
pub struct HeldOrderRepository {
    pool: SqlitePool,
    numbering: NumberingConfig,
}

impl HeldOrderRepository {
    /// Creates a new HeldOrderRepository.
    pub fn new(pool: SqlitePool, numbering: NumberingConfig) -> Self {
        HeldOrderRepository { pool, numbering }
    }

    /// Parks a cart.
    ///
    /// Keeps a supplied order number when it is free, otherwise allocates one
    /// from the day's sequence.
    pub async fn hold(&self, actor: &Actor, cart: &HeldCart) -> DbResult<HeldOrder> {
        let (order_type, totals) = cart.validate()?;
        let items = serde_json::to_string(&cart.items)?;
        let customer = cart.customer.normalized();
        let table_number = optional_text(cart.table_number.as_deref());
        let notes = optional_text(cart.notes.as_deref());
        let preferred = optional_text(cart.order_number.as_deref());

        let id = new_id();
        let held_at = Utc::now();
        let business_date = Local::now().date_naive();

        let mut tx = begin_write(&self.pool).await?;
        let existing = count_orders_on(&mut tx, business_date).await?;
        let mut numbers = OrderNumbers::new(&self.numbering, business_date, existing, preferred);

        let mut allocated = None;
        for attempt in 0..self.numbering.attempts() {
            let (order_number, preferred) = numbers.next_candidate();
            if is_sold(&mut tx, &order_number).await? {
                if preferred {
                    warn!(order_number = %order_number, "Order number already settled, allocating a new one");
                } else {
                    debug!(attempt, order_number = %order_number, "Order number already on a sale");
                }
                continue;
            }

            let sql = format!(
                "INSERT INTO held_orders ({HELD_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
            );
            let result = sqlx::query(&sql)
                .bind(&id)
                .bind(&order_number)
                .bind(order_type)
                .bind(&customer.name)
                .bind(&customer.phone)
                .bind(&customer.address)
                .bind(&table_number)
                .bind(&notes)
                .bind(&items)
                .bind(totals.subtotal.cents())
                .bind(totals.discount.cents())
                .bind(totals.delivery_fee.cents())
                .bind(totals.total.cents())
                .bind(&actor.id)
                .bind(held_at)
                .execute(&mut *tx)
                .await;

            match result {
                Ok(_) => {
                    allocated = Some(order_number);
                    break;
                }
                Err(e) => {
                    let err = DbError::from(e);
                    if !err.is_unique_violation_on("held_orders.order_number") {
                        return Err(err);
                    }
                    if preferred {
                        warn!(order_number = %order_number, "Held order number taken, allocating a new one");
                    } else {
                        debug!(attempt, order_number = %order_number, "Held order number collision");
                    }
                }
            }
        }

        let order_number = allocated.ok_or_else(|| {
            DbError::TransactionFailed(format!(
                "no free order number after {} attempts",
                self.numbering.attempts()
            ))
        })?;

        tx.commit().await?;

        info!(held_id = %id, order_number = %order_number, lines = cart.items.len(), "Order held");

        Ok(HeldOrder {
            id,
            order_number,
            order_type,
            customer,
            table_number,
            notes,
            items: cart.items.clone(),
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            delivery_fee_cents: totals.delivery_fee.cents(),
            total_cents: totals.total.cents(),
            held_by: actor.id.clone(),
            held_at,
        })
    }

    /// All parked carts, oldest first, optionally only those held by `owner`.
    pub async fn list(&self, owner: Option<&str>) -> DbResult<Vec<HeldOrder>> {
        let sql = format!(
            "SELECT {HELD_COLUMNS} FROM held_orders \
             WHERE (?1 IS NULL OR held_by = ?1) \
             ORDER BY held_at, rowid"
        );
        let rows = sqlx::query_as::<_, HeldOrderRow>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(HeldOrder::try_from).collect()
    }

    /// Gets one parked cart.
    pub async fn get(&self, held_id: &str) -> DbResult<Option<HeldOrder>> {
        let sql = format!("SELECT {HELD_COLUMNS} FROM held_orders WHERE id = ?1");
        let row = sqlx::query_as::<_, HeldOrderRow>(&sql)
            .bind(held_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(HeldOrder::try_from).transpose()
    }

    /// Takes a cart off hold: returns it and deletes the record atomically.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no such held order (already resumed or deleted)
    pub async fn resume(&self, held_id: &str) -> DbResult<HeldOrder> {
        let mut tx = begin_write(&self.pool).await?;

        let sql = format!("SELECT {HELD_COLUMNS} FROM held_orders WHERE id = ?1");
        let row = sqlx::query_as::<_, HeldOrderRow>(&sql)
            .bind(held_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Held order", held_id))?;

        sqlx::query("DELETE FROM held_orders WHERE id = ?1")
            .bind(held_id)
            .execute(&mut *tx)
            .await?;

        let order = HeldOrder::try_from(row)?;
        tx.commit().await?;

        info!(held_id, order_number = %order.order_number, "Held order resumed");
        Ok(order)
    }

    /// Discards a parked cart. Returns whether anything was deleted.
    pub async fn delete(&self, held_id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM held_orders WHERE id = ?1")
            .bind(held_id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        debug!(held_id, deleted, "Held order delete");
        Ok(deleted)
    }
}

// =============================================================================
// Tests
// =============================================================================
