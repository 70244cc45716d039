//! # Customer & Supplier Repositories
//!
//! Debt is never stored; [`CustomerRepository::debt`] and
//! [`SupplierRepository::debt`] rebuild it from the party's transactions.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::{new_id, require};
use crate::error::DbResult;
use tradedesk_core::input::NewParty;
use tradedesk_core::reports::{customer_statement, supplier_statement, DebtStatement};
use tradedesk_core::{Customer, Supplier, Transaction};

// =============================================================================
// Customers
// =============================================================================

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn create(&self, input: &NewParty) -> DbResult<Customer> {
        input.validate()?;
        let customer = Customer {
            id: new_id(),
            agency_id: input.agency_id.clone(),
            name: input.name.trim().to_string(),
            phone: input.phone.clone(),
            address: input.address.clone(),
            created_at: Utc::now(),
        };

        debug!(id = %customer.id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, agency_id, name, phone, address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.agency_id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch_customer(&mut conn, id).await
    }

    pub async fn list(&self, agency_id: Option<&str>) -> DbResult<Vec<Customer>> {
        let rows = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE (?1 IS NULL OR agency_id = ?1) ORDER BY name",
        )
        .bind(agency_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Σ sale.remaining − Σ collection.paid − Σ return.remaining
    pub async fn debt(&self, id: &str) -> DbResult<DebtStatement> {
        let mut conn = self.pool.acquire().await?;
        let customer = require(fetch_customer(&mut conn, id).await?, "Customer", id)?;
        let transactions = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE customer_id = ?1",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(customer_statement(&customer, &transactions))
    }
}

pub(crate) async fn fetch_customer(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Customer>> {
    let row = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

// =============================================================================
// Suppliers
// =============================================================================

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn create(&self, input: &NewParty) -> DbResult<Supplier> {
        input.validate()?;
        let supplier = Supplier {
            id: new_id(),
            agency_id: input.agency_id.clone(),
            name: input.name.trim().to_string(),
            phone: input.phone.clone(),
            address: input.address.clone(),
            created_at: Utc::now(),
        };

        debug!(id = %supplier.id, "Inserting supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, agency_id, name, phone, address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.agency_id)
        .bind(&supplier.name)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await?;

        Ok(supplier)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        let mut conn = self.pool.acquire().await?;
        fetch_supplier(&mut conn, id).await
    }

    pub async fn list(&self, agency_id: Option<&str>) -> DbResult<Vec<Supplier>> {
        let rows = sqlx::query_as::<_, Supplier>(
            "SELECT * FROM suppliers WHERE (?1 IS NULL OR agency_id = ?1) ORDER BY name",
        )
        .bind(agency_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Σ purchase.remaining − Σ supply_payment.paid
    pub async fn debt(&self, id: &str) -> DbResult<DebtStatement> {
        let mut conn = self.pool.acquire().await?;
        let supplier = require(fetch_supplier(&mut conn, id).await?, "Supplier", id)?;
        let transactions = sqlx::query_as::<_, Transaction>(
            "SELECT * FROM transactions WHERE supplier_id = ?1",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(supplier_statement(&supplier, &transactions))
    }
}

pub(crate) async fn fetch_supplier(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Supplier>> {
    let row = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};

    fn party(name: &str) -> NewParty {
        NewParty {
            name: name.to_string(),
            agency_id: None,
            phone: None,
            address: Some("Shar-e-Naw".to_string()),
        }
    }

    #[tokio::test]
    async fn test_new_parties_owe_nothing() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db.customers().create(&party("Baqal Store")).await.unwrap();
        let supplier = db.suppliers().create(&party("Mill Co")).await.unwrap();

        let debt = db.customers().debt(&customer.id).await.unwrap();
        assert!(debt.balance.is_zero());
        assert_eq!(debt.name, "Baqal Store");
        assert!(db.suppliers().debt(&supplier.id).await.unwrap().balance.is_zero());
        assert_eq!(db.customers().list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_debt_of_unknown_party() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(matches!(
            db.customers().debt("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
