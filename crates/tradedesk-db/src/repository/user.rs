//! # User Repository
//!
//! ## Sales Rep Creation
//! ```text
//! BEGIN
//!   INSERT users       (warehouse_id NULL)
//!   INSERT warehouses  (id = user.id, kind VIRTUAL, owner_user_id = user.id)
//!   UPDATE users SET warehouse_id = user.id
//! COMMIT
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{new_id, warehouse};
use crate::error::DbResult;
use tradedesk_core::input::NewUser;
use tradedesk_core::{User, UserRole};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates a user; a SALES_REP also gets its virtual warehouse.
    pub async fn create(&self, input: &NewUser) -> DbResult<User> {
        input.validate()?;

        let now = Utc::now();
        let mut user = User {
            id: new_id(),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            role: input.role,
            agency_id: input.agency_id.clone(),
            warehouse_id: None,
            created_at: now,
        };

        debug!(id = %user.id, role = %user.role, "Inserting user");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, role, agency_id, warehouse_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6)
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role)
        .bind(&user.agency_id)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await?;

        if user.role == UserRole::SalesRep {
            let van =
                warehouse::insert_virtual(&mut tx, &user.id, &user.name, user.agency_id.as_deref(), now)
                    .await?;
            sqlx::query("UPDATE users SET warehouse_id = ?2 WHERE id = ?1")
                .bind(&user.id)
                .bind(&van.id)
                .execute(&mut *tx)
                .await?;
            user.warehouse_id = Some(van.id);
        }

        tx.commit().await?;

        info!(id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn list(&self, agency_id: Option<&str>) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE (?1 IS NULL OR agency_id = ?1) ORDER BY name",
        )
        .bind(agency_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tradedesk_core::input::NewAgency;
    use tradedesk_core::WarehouseKind;

    async fn setup() -> (Database, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let agency = db
            .agencies()
            .create(&NewAgency {
                name: "Herat".to_string(),
                code: "HRT".to_string(),
                address: None,
                phone: None,
            })
            .await
            .unwrap();
        (db, agency.id)
    }

    #[tokio::test]
    async fn test_sales_rep_gets_virtual_warehouse_with_same_id() {
        let (db, agency_id) = setup().await;
        let rep = db
            .users()
            .create(&NewUser {
                name: "Rahim".to_string(),
                email: "Rahim@Herat.af".to_string(),
                role: UserRole::SalesRep,
                agency_id: Some(agency_id.clone()),
            })
            .await
            .unwrap();

        assert_eq!(rep.email, "rahim@herat.af");
        assert_eq!(rep.warehouse_id.as_deref(), Some(rep.id.as_str()));

        let van = db.warehouses().get_by_id(&rep.id).await.unwrap().unwrap();
        assert_eq!(van.kind, WarehouseKind::Virtual);
        assert_eq!(van.owner_user_id.as_deref(), Some(rep.id.as_str()));
        assert_eq!(van.agency_id.as_deref(), Some(agency_id.as_str()));

        let stored = db.users().get_by_id(&rep.id).await.unwrap().unwrap();
        assert_eq!(stored.warehouse_id, rep.warehouse_id);
    }

    #[tokio::test]
    async fn test_manager_has_no_warehouse() {
        let (db, agency_id) = setup().await;
        let manager = db
            .users()
            .create(&NewUser {
                name: "Laila".to_string(),
                email: "laila@herat.af".to_string(),
                role: UserRole::AgencyManager,
                agency_id: Some(agency_id),
            })
            .await
            .unwrap();

        assert!(manager.warehouse_id.is_none());
        assert!(db.warehouses().list(None).await.unwrap().is_empty());
    }
}
