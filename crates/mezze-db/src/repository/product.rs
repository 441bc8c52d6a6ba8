//! # Product Repository
//!
//! The menu / stock-item catalogue.
//!
//! Creating a product sets both `initial_stock` and `quantity_on_hand`; from
//! then on quantity only changes through the inventory ledger, so this
//! repository has no stock setters.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use mezze_core::validation::{
    validate_non_negative, validate_product_code, validate_product_name, validate_stock_level,
};
use mezze_core::{NewProduct, Product, ValidationError};

pub(crate) const PRODUCT_COLUMNS: &str = r#"
    id, code, name, quantity_on_hand, initial_stock, reorder_level,
    cost_price_cents, sell_price_cents, is_active, created_at, updated_at
"#;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::Domain(..Duplicate..))` - Code already exists
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_product_code(&new.code)?;
        validate_product_name(&new.name)?;
        validate_stock_level(new.initial_stock)?;
        validate_non_negative("reorder_level", new.reorder_level)?;
        validate_non_negative("cost_price", new.cost_price_cents)?;
        validate_non_negative("sell_price", new.sell_price_cents)?;

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            code: new.code.trim().to_string(),
            name: new.name.trim().to_string(),
            quantity_on_hand: new.initial_stock,
            initial_stock: new.initial_stock,
            reorder_level: new.reorder_level,
            cost_price_cents: new.cost_price_cents,
            sell_price_cents: new.sell_price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(code = %product.code, "Inserting product");

        let result = sqlx::query(
            r#"
            INSERT INTO products (
                id, code, name, quantity_on_hand, initial_stock, reorder_level,
                cost_price_cents, sell_price_cents, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(product.quantity_on_hand)
        .bind(product.initial_stock)
        .bind(product.reorder_level)
        .bind(product.cost_price_cents)
        .bind(product.sell_price_cents)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(product),
            Err(e) => {
                let err = DbError::from(e);
                if err.is_unique_violation_on("products.code") {
                    Err(ValidationError::Duplicate {
                        field: "code".to_string(),
                        value: product.code,
                    }
                    .into())
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its business code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
