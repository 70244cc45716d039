//! # Account Repository
//!
//! Income and expense records. Besides manual entries, the transaction
//! repository writes EXPENSE rows here for refunds and supplier payments,
//! inside its own database transaction.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use super::new_id;
use crate::error::DbResult;
use tradedesk_core::input::NewAccountRecord;
use tradedesk_core::reports::DateRange;
use tradedesk_core::{AccountRecord, AccountRecordKind};

#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub kind: Option<AccountRecordKind>,
    pub agency_id: Option<String>,
    pub range: DateRange,
}

#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AccountRepository { pool }
    }

    pub async fn create(&self, input: &NewAccountRecord) -> DbResult<AccountRecord> {
        input.validate()?;
        let now = Utc::now();
        let record = AccountRecord {
            id: new_id(),
            kind: input.kind,
            agency_id: input.agency_id.clone(),
            customer_id: input.customer_id.clone(),
            supplier_id: input.supplier_id.clone(),
            category: input.category.trim().to_lowercase(),
            amount_cents: input.amount_cents,
            description: input.description.clone(),
            occurred_at: input.occurred_at.unwrap_or(now),
            created_at: now,
        };
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, &record).await?;
        Ok(record)
    }

    /// Records matching the filter, oldest first.
    pub async fn list(&self, filter: &AccountFilter) -> DbResult<Vec<AccountRecord>> {
        let mut rows = sqlx::query_as::<_, AccountRecord>(
            r#"
            SELECT * FROM account_records
            WHERE (?1 IS NULL OR kind = ?1)
              AND (?2 IS NULL OR agency_id = ?2)
            ORDER BY occurred_at, id
            "#,
        )
        .bind(filter.kind)
        .bind(&filter.agency_id)
        .fetch_all(&self.pool)
        .await?;
        rows.retain(|r| filter.range.contains(r.occurred_at));
        Ok(rows)
    }
}

/// Builds the EXPENSE row that carries the cash side of a refund or a
/// supplier payment.
pub(crate) fn expense_for(
    category: &str,
    amount_cents: i64,
    agency_id: Option<String>,
    customer_id: Option<String>,
    supplier_id: Option<String>,
    description: String,
    occurred_at: DateTime<Utc>,
) -> AccountRecord {
    AccountRecord {
        id: new_id(),
        kind: AccountRecordKind::Expense,
        agency_id,
        customer_id,
        supplier_id,
        category: category.to_string(),
        amount_cents,
        description: Some(description),
        occurred_at,
        created_at: Utc::now(),
    }
}

pub(crate) async fn insert(conn: &mut SqliteConnection, record: &AccountRecord) -> DbResult<()> {
    debug!(
        id = %record.id,
        kind = %record.kind,
        category = %record.category,
        amount_cents = record.amount_cents,
        "Inserting account record"
    );

    sqlx::query(
        r#"
        INSERT INTO account_records (
            id, kind, agency_id, customer_id, supplier_id,
            category, amount_cents, description, occurred_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&record.id)
    .bind(record.kind)
    .bind(&record.agency_id)
    .bind(&record.customer_id)
    .bind(&record.supplier_id)
    .bind(&record.category)
    .bind(record.amount_cents)
    .bind(&record.description)
    .bind(record.occurred_at)
    .bind(record.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::TimeZone;

    fn record(kind: AccountRecordKind, category: &str, amount: i64, day: u32) -> NewAccountRecord {
        NewAccountRecord {
            kind,
            category: category.to_string(),
            amount_cents: amount,
            agency_id: None,
            customer_id: None,
            supplier_id: None,
            description: None,
            occurred_at: Some(Utc.with_ymd_and_hms(2026, 4, day, 8, 0, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_create_and_filter() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.accounts().create(&record(AccountRecordKind::Expense, "Rent", 5_000, 1)).await.unwrap();
        db.accounts().create(&record(AccountRecordKind::Income, "commission", 700, 2)).await.unwrap();
        db.accounts().create(&record(AccountRecordKind::Expense, "fuel", 300, 3)).await.unwrap();

        let all = db.accounts().list(&AccountFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].category, "rent");

        let expenses = db
            .accounts()
            .list(&AccountFilter {
                kind: Some(AccountRecordKind::Expense),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(expenses.len(), 2);

        let range = DateRange::new(
            Some(Utc.with_ymd_and_hms(2026, 4, 2, 0, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2026, 4, 3, 0, 0, 0).unwrap()),
        )
        .unwrap();
        let day_two = db
            .accounts()
            .list(&AccountFilter {
                range,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(day_two.len(), 1);
        assert_eq!(day_two[0].kind, AccountRecordKind::Income);
    }

    #[tokio::test]
    async fn test_zero_amount_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db
            .accounts()
            .create(&record(AccountRecordKind::Income, "misc", 0, 1))
            .await
            .is_err());
    }
}
