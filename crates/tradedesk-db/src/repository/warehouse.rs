//! # Warehouse Repository
//!
//! ```text
//! MAIN     one or more per agency, created here
//! VIRTUAL  one per sales rep, created by UserRepository::create with
//!          id = owner_user_id = user id
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::new_id;
use crate::error::DbResult;
use tradedesk_core::input::NewWarehouse;
use tradedesk_core::{Warehouse, WarehouseKind};

#[derive(Debug, Clone)]
pub struct WarehouseRepository {
    pool: SqlitePool,
}

impl WarehouseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        WarehouseRepository { pool }
    }

    /// Creates a MAIN warehouse.
    pub async fn create(&self, input: &NewWarehouse) -> DbResult<Warehouse> {
        input.validate()?;
        let warehouse = Warehouse {
            id: new_id(),
            agency_id: input.agency_id.clone(),
            name: input.name.trim().to_string(),
            kind: WarehouseKind::Main,
            owner_user_id: None,
            created_at: Utc::now(),
        };
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, &warehouse).await?;
        Ok(warehouse)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Warehouse>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Lists warehouses, optionally only those of one agency.
    pub async fn list(&self, agency_id: Option<&str>) -> DbResult<Vec<Warehouse>> {
        let rows = sqlx::query_as::<_, Warehouse>(
            r#"
            SELECT * FROM warehouses
            WHERE (?1 IS NULL OR agency_id = ?1)
            ORDER BY kind, name
            "#,
        )
        .bind(agency_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Warehouse>> {
    let warehouse = sqlx::query_as::<_, Warehouse>("SELECT * FROM warehouses WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(warehouse)
}

/// Inserts the virtual warehouse of a sales rep, keyed by the user id.
pub(crate) async fn insert_virtual(
    conn: &mut SqliteConnection,
    user_id: &str,
    user_name: &str,
    agency_id: Option<&str>,
    at: DateTime<Utc>,
) -> DbResult<Warehouse> {
    let warehouse = Warehouse {
        id: user_id.to_string(),
        agency_id: agency_id.map(str::to_string),
        name: format!("{user_name} (van)"),
        kind: WarehouseKind::Virtual,
        owner_user_id: Some(user_id.to_string()),
        created_at: at,
    };
    insert(conn, &warehouse).await?;
    Ok(warehouse)
}

async fn insert(conn: &mut SqliteConnection, warehouse: &Warehouse) -> DbResult<()> {
    debug!(id = %warehouse.id, kind = %warehouse.kind, "Inserting warehouse");

    sqlx::query(
        r#"
        INSERT INTO warehouses (id, agency_id, name, kind, owner_user_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&warehouse.id)
    .bind(&warehouse.agency_id)
    .bind(&warehouse.name)
    .bind(warehouse.kind)
    .bind(&warehouse.owner_user_id)
    .bind(warehouse.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_main_warehouse() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let wh = db
            .warehouses()
            .create(&NewWarehouse {
                name: "Depot".to_string(),
                agency_id: None,
            })
            .await
            .unwrap();

        assert_eq!(wh.kind, WarehouseKind::Main);
        assert!(wh.is_consistent());
        let listed = db.warehouses().list(None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(db.warehouses().list(Some("other")).await.unwrap().is_empty());
    }
}
