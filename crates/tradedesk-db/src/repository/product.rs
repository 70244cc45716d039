//! # Product Repository
//!
//! Catalogue of sellable products. Quantities live in `stock`, see
//! [`StockRepository`](super::stock::StockRepository).

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::new_id;
use crate::error::DbResult;
use tradedesk_core::input::NewProduct;
use tradedesk_core::Product;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let product = db.products().create(&input).await?;
/// let same = db.products().get_by_sku("RICE-25KG").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product. SKUs are stored upper-cased and must be unique.
    pub async fn create(&self, input: &NewProduct) -> DbResult<Product> {
        input.validate()?;

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            agency_id: input.agency_id.clone(),
            sku: input.sku.trim().to_uppercase(),
            name: input.name.trim().to_string(),
            unit: input.unit.trim().to_string(),
            purchase_price_cents: input.purchase_price_cents,
            sale_price_cents: input.sale_price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, agency_id, sku, name, unit,
                purchase_price_cents, sale_price_cents,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.agency_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.unit)
        .bind(product.purchase_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE sku = ?1")
            .bind(sku.trim().to_uppercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Lists products. Catalogue-wide products (no agency) are included in
    /// every agency's list.
    pub async fn list(&self, agency_id: Option<&str>, include_inactive: bool) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE (?1 IS NULL OR agency_id = ?1 OR agency_id IS NULL)
              AND (?2 OR is_active = 1)
            ORDER BY name
            "#,
        )
        .bind(agency_id)
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Hides a product from sale forms. History keeps referencing it.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<bool> {
        let result = sqlx::query("UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Gets total product count.
    pub async fn count(&self) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};

    fn rice() -> NewProduct {
        NewProduct {
            sku: "rice-25kg".to_string(),
            name: "Rice 25kg".to_string(),
            unit: "bag".to_string(),
            purchase_price_cents: 150_000,
            sale_price_cents: 180_000,
            agency_id: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().create(&rice()).await.unwrap();

        assert_eq!(product.sku, "RICE-25KG");
        let by_sku = db.products().get_by_sku("Rice-25kg").await.unwrap().unwrap();
        assert_eq!(by_sku.id, product.id);
        assert_eq!(by_sku.sale_price().cents(), 180_000);
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_sku() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().create(&rice()).await.unwrap();
        let err = db.products().create(&rice()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_inactive_products_hidden_by_default() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().create(&rice()).await.unwrap();
        assert!(db.products().set_active(&product.id, false).await.unwrap());

        assert!(db.products().list(None, false).await.unwrap().is_empty());
        assert_eq!(db.products().list(None, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_price_rejected_before_insert() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut input = rice();
        input.sale_price_cents = -1;
        assert!(matches!(
            db.products().create(&input).await,
            Err(DbError::Core(_))
        ));
        assert_eq!(db.products().count().await.unwrap(), 0);
    }
}
