//! # Agency Repository

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::new_id;
use crate::error::DbResult;
use tradedesk_core::input::NewAgency;
use tradedesk_core::Agency;

#[derive(Debug, Clone)]
pub struct AgencyRepository {
    pool: SqlitePool,
}

impl AgencyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AgencyRepository { pool }
    }

    /// Creates an agency. The code is stored trimmed and upper-cased.
    pub async fn create(&self, input: &NewAgency) -> DbResult<Agency> {
        input.validate()?;

        let agency = Agency {
            id: new_id(),
            name: input.name.trim().to_string(),
            code: input.code.trim().to_uppercase(),
            address: input.address.clone(),
            phone: input.phone.clone(),
            is_active: true,
            created_at: Utc::now(),
        };

        debug!(id = %agency.id, code = %agency.code, "Inserting agency");

        sqlx::query(
            r#"
            INSERT INTO agencies (id, name, code, address, phone, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&agency.id)
        .bind(&agency.name)
        .bind(&agency.code)
        .bind(&agency.address)
        .bind(&agency.phone)
        .bind(agency.is_active)
        .bind(agency.created_at)
        .execute(&self.pool)
        .await?;

        Ok(agency)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Agency>> {
        let agency = sqlx::query_as::<_, Agency>("SELECT * FROM agencies WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(agency)
    }

    pub async fn list(&self) -> DbResult<Vec<Agency>> {
        let agencies = sqlx::query_as::<_, Agency>("SELECT * FROM agencies ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(agencies)
    }

    /// Ids of every agency, used to enumerate treasury scopes.
    pub async fn ids(&self) -> DbResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM agencies ORDER BY code")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};

    fn kabul() -> NewAgency {
        NewAgency {
            name: "Kabul Central".to_string(),
            code: " kbl-01 ".to_string(),
            address: None,
            phone: Some("+93 700 000 000".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let agency = db.agencies().create(&kabul()).await.unwrap();

        assert_eq!(agency.code, "KBL-01");
        assert!(agency.is_active);
        let fetched = db.agencies().get_by_id(&agency.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Kabul Central");
        assert_eq!(db.agencies().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.agencies().create(&kabul()).await.unwrap();
        let err = db.agencies().create(&kabul()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
