//! # Stock Repository
//!
//! Quantity of each product per warehouse. Every change goes through
//! [`adjust`], which refuses to take a row below zero.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{product, require, warehouse};
use crate::error::DbResult;
use tradedesk_core::input::StockTransfer;
use tradedesk_core::{CoreError, Product, Stock};

/// Both sides of a completed transfer.
#[derive(Debug, Clone, Serialize)]
pub struct TransferResult {
    pub from: Stock,
    pub to: Stock,
}

#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Stock rows of one product across warehouses.
    pub async fn for_product(&self, product_id: &str) -> DbResult<Vec<Stock>> {
        let rows = sqlx::query_as::<_, Stock>(
            "SELECT * FROM stock WHERE product_id = ?1 ORDER BY warehouse_id",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn for_warehouse(&self, warehouse_id: &str) -> DbResult<Vec<Stock>> {
        let rows = sqlx::query_as::<_, Stock>(
            "SELECT * FROM stock WHERE warehouse_id = ?1 ORDER BY product_id",
        )
        .bind(warehouse_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Quantity on hand; 0 when no row exists.
    pub async fn quantity(&self, product_id: &str, warehouse_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        current(&mut conn, product_id, warehouse_id).await
    }

    /// Moves units between two warehouses atomically.
    pub async fn transfer(&self, input: &StockTransfer) -> DbResult<TransferResult> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;

        let product = require(
            product::fetch(&mut tx, &input.product_id).await?,
            "Product",
            &input.product_id,
        )?;
        for id in [&input.from_warehouse_id, &input.to_warehouse_id] {
            require(warehouse::fetch(&mut tx, id).await?, "Warehouse", id)?;
        }

        let now = Utc::now();
        let from = adjust(&mut tx, &product, &input.from_warehouse_id, -input.quantity, now).await?;
        let to = adjust(&mut tx, &product, &input.to_warehouse_id, input.quantity, now).await?;

        tx.commit().await?;

        info!(
            sku = %product.sku,
            from = %input.from_warehouse_id,
            to = %input.to_warehouse_id,
            quantity = input.quantity,
            "Stock transferred"
        );
        Ok(TransferResult { from, to })
    }
}

async fn current(conn: &mut SqliteConnection, product_id: &str, warehouse_id: &str) -> DbResult<i64> {
    let quantity = sqlx::query_scalar::<_, i64>(
        "SELECT quantity FROM stock WHERE product_id = ?1 AND warehouse_id = ?2",
    )
    .bind(product_id)
    .bind(warehouse_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(quantity.unwrap_or(0))
}

/// Adds `delta` (negative to remove) to a stock row, creating it if needed.
///
/// ## Errors
/// `CoreError::InsufficientStock` when the result would be negative.
pub(crate) async fn adjust(
    conn: &mut SqliteConnection,
    product: &Product,
    warehouse_id: &str,
    delta: i64,
    at: DateTime<Utc>,
) -> DbResult<Stock> {
    let available = current(conn, &product.id, warehouse_id).await?;
    let quantity = available + delta;
    if quantity < 0 {
        return Err(CoreError::InsufficientStock {
            sku: product.sku.clone(),
            available,
            requested: -delta,
        }
        .into());
    }

    debug!(sku = %product.sku, warehouse_id, delta, quantity, "Adjusting stock");

    sqlx::query(
        r#"
        INSERT INTO stock (product_id, warehouse_id, quantity, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (product_id, warehouse_id)
        DO UPDATE SET quantity = excluded.quantity, updated_at = excluded.updated_at
        "#,
    )
    .bind(&product.id)
    .bind(warehouse_id)
    .bind(quantity)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    Ok(Stock {
        product_id: product.id.clone(),
        warehouse_id: warehouse_id.to_string(),
        quantity,
        updated_at: at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};
    use tradedesk_core::input::{NewProduct, NewWarehouse};

    async fn setup() -> (Database, Product, String, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db
            .products()
            .create(&NewProduct {
                sku: "OIL-5L".to_string(),
                name: "Cooking oil 5L".to_string(),
                unit: "can".to_string(),
                purchase_price_cents: 900,
                sale_price_cents: 1_100,
                agency_id: None,
            })
            .await
            .unwrap();
        let mut ids = Vec::new();
        for name in ["Depot", "Shop"] {
            let wh = db
                .warehouses()
                .create(&NewWarehouse {
                    name: name.to_string(),
                    agency_id: None,
                })
                .await
                .unwrap();
            ids.push(wh.id);
        }
        let shop = ids.pop().unwrap();
        let depot = ids.pop().unwrap();
        (db, product, depot, shop)
    }

    async fn put(db: &Database, product: &Product, warehouse_id: &str, qty: i64) {
        let mut conn = db.pool().acquire().await.unwrap();
        adjust(&mut conn, product, warehouse_id, qty, Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn test_transfer_moves_units() {
        let (db, product, depot, shop) = setup().await;
        put(&db, &product, &depot, 10).await;

        let result = db
            .stock()
            .transfer(&StockTransfer {
                product_id: product.id.clone(),
                from_warehouse_id: depot.clone(),
                to_warehouse_id: shop.clone(),
                quantity: 4,
            })
            .await
            .unwrap();

        assert_eq!(result.from.quantity, 6);
        assert_eq!(result.to.quantity, 4);
        assert_eq!(db.stock().quantity(&product.id, &depot).await.unwrap(), 6);
        assert_eq!(db.stock().for_product(&product.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_transfer_beyond_stock_rolls_back() {
        let (db, product, depot, shop) = setup().await;
        put(&db, &product, &depot, 3).await;

        let err = db
            .stock()
            .transfer(&StockTransfer {
                product_id: product.id.clone(),
                from_warehouse_id: depot.clone(),
                to_warehouse_id: shop.clone(),
                quantity: 5,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 3, requested: 5, .. })
        ));
        assert_eq!(db.stock().quantity(&product.id, &depot).await.unwrap(), 3);
        assert_eq!(db.stock().quantity(&product.id, &shop).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transfer_to_unknown_warehouse() {
        let (db, product, depot, _) = setup().await;
        put(&db, &product, &depot, 3).await;
        let err = db
            .stock()
            .transfer(&StockTransfer {
                product_id: product.id.clone(),
                from_warehouse_id: depot,
                to_warehouse_id: "nowhere".to_string(),
                quantity: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
