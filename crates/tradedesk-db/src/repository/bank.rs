//! # Bank Repository
//!
//! Banks keep a materialized `balance_cents` next to an append-only list of
//! bank transactions. [`record_movement`] is the only writer of both, so the
//! balance always equals the signed sum of the rows. [`BankRepository::reconcile`]
//! repairs banks where that no longer holds.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::{new_id, require};
use crate::error::DbResult;
use tradedesk_core::audit::BankCorrection;
use tradedesk_core::input::{BankMovement, NewBank};
use tradedesk_core::{Bank, BankTransaction, BankTransactionKind, CoreError, Money};

#[derive(Debug, Clone)]
pub struct BankRepository {
    pool: SqlitePool,
}

impl BankRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BankRepository { pool }
    }

    /// Creates a bank. A non-zero opening balance is booked as an opening
    /// deposit so the ledger explains it.
    pub async fn create(&self, input: &NewBank) -> DbResult<Bank> {
        input.validate()?;
        let now = Utc::now();
        let bank = Bank {
            id: new_id(),
            name: input.name.trim().to_string(),
            account_number: input.account_number.clone(),
            balance_cents: 0,
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        debug!(id = %bank.id, name = %bank.name, "Inserting bank");
        sqlx::query(
            r#"
            INSERT INTO banks (id, name, account_number, balance_cents, created_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            "#,
        )
        .bind(&bank.id)
        .bind(&bank.name)
        .bind(&bank.account_number)
        .bind(bank.created_at)
        .execute(&mut *tx)
        .await?;

        if input.opening_balance_cents > 0 {
            record_movement(
                &mut tx,
                &bank.id,
                BankTransactionKind::Deposit,
                input.opening_balance_cents,
                MovementLink::default(),
                Some("Opening balance".to_string()),
                now,
            )
            .await?;
        }

        let bank = require(fetch(&mut tx, &bank.id).await?, "Bank", &bank.id)?;
        tx.commit().await?;

        info!(id = %bank.id, balance_cents = bank.balance_cents, "Bank created");
        Ok(bank)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bank>> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    pub async fn list(&self) -> DbResult<Vec<Bank>> {
        let rows = sqlx::query_as::<_, Bank>("SELECT * FROM banks ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn deposit(&self, bank_id: &str, input: &BankMovement) -> DbResult<BankTransaction> {
        self.manual_movement(bank_id, BankTransactionKind::Deposit, input).await
    }

    /// ## Errors
    /// `CoreError::InsufficientFunds` when the amount exceeds the balance.
    pub async fn withdraw(&self, bank_id: &str, input: &BankMovement) -> DbResult<BankTransaction> {
        self.manual_movement(bank_id, BankTransactionKind::Withdrawal, input).await
    }

    async fn manual_movement(
        &self,
        bank_id: &str,
        kind: BankTransactionKind,
        input: &BankMovement,
    ) -> DbResult<BankTransaction> {
        input.validate()?;
        let mut tx = self.pool.begin().await?;
        let movement = record_movement(
            &mut tx,
            bank_id,
            kind,
            input.amount_cents,
            MovementLink::default(),
            input.description.clone(),
            input.occurred_at.unwrap_or_else(Utc::now),
        )
        .await?;
        tx.commit().await?;

        info!(bank_id, kind = %kind, amount_cents = input.amount_cents, "Bank movement recorded");
        Ok(movement)
    }

    /// Ledger of one bank, oldest first.
    pub async fn transactions(&self, bank_id: &str) -> DbResult<Vec<BankTransaction>> {
        let mut conn = self.pool.acquire().await?;
        require(fetch(&mut conn, bank_id).await?, "Bank", bank_id)?;
        let rows = sqlx::query_as::<_, BankTransaction>(
            "SELECT * FROM bank_transactions WHERE bank_id = ?1 ORDER BY occurred_at, created_at, id",
        )
        .bind(bank_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Σ deposits − Σ withdrawals for one bank.
    pub async fn signed_sum(&self, bank_id: &str) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;
        signed_sum(&mut conn, bank_id).await
    }

    /// Resets every drifted `balance_cents` to its signed transaction sum.
    /// Returns one correction per bank that changed.
    pub async fn reconcile(&self) -> DbResult<Vec<BankCorrection>> {
        let mut tx = self.pool.begin().await?;
        let banks = sqlx::query_as::<_, Bank>("SELECT * FROM banks ORDER BY name")
            .fetch_all(&mut *tx)
            .await?;

        let mut corrections = Vec::new();
        for bank in banks {
            let sum = signed_sum(&mut tx, &bank.id).await?;
            if sum.cents() == bank.balance_cents {
                continue;
            }
            warn!(
                bank_id = %bank.id,
                stored = bank.balance_cents,
                corrected = sum.cents(),
                "Bank balance drifted, correcting"
            );
            sqlx::query("UPDATE banks SET balance_cents = ?2 WHERE id = ?1")
                .bind(&bank.id)
                .bind(sum.cents())
                .execute(&mut *tx)
                .await?;
            corrections.push(BankCorrection {
                bank_id: bank.id,
                bank_name: bank.name,
                stored: Money::from_cents(bank.balance_cents),
                corrected: sum,
            });
        }
        tx.commit().await?;

        info!(corrected = corrections.len(), "Bank reconciliation complete");
        Ok(corrections)
    }
}

/// Loan references carried by a bank movement.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MovementLink<'a> {
    pub loan_id: Option<&'a str>,
    pub installment_id: Option<&'a str>,
}

pub(crate) async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Bank>> {
    let row = sqlx::query_as::<_, Bank>("SELECT * FROM banks WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

pub(crate) async fn signed_sum(conn: &mut SqliteConnection, bank_id: &str) -> DbResult<Money> {
    let cents = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COALESCE(SUM(CASE kind WHEN 'DEPOSIT' THEN amount_cents ELSE -amount_cents END), 0)
        FROM bank_transactions WHERE bank_id = ?1
        "#,
    )
    .bind(bank_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(Money::from_cents(cents))
}

/// Appends a bank transaction and moves the stored balance with it.
///
/// ## Errors
/// * `DbError::NotFound` - unknown bank
/// * `CoreError::InsufficientFunds` - withdrawal larger than the balance
pub(crate) async fn record_movement(
    conn: &mut SqliteConnection,
    bank_id: &str,
    kind: BankTransactionKind,
    amount_cents: i64,
    link: MovementLink<'_>,
    description: Option<String>,
    occurred_at: DateTime<Utc>,
) -> DbResult<BankTransaction> {
    let bank = require(fetch(conn, bank_id).await?, "Bank", bank_id)?;
    if kind == BankTransactionKind::Withdrawal && amount_cents > bank.balance_cents {
        return Err(CoreError::InsufficientFunds {
            bank_id: bank.id,
            balance_cents: bank.balance_cents,
            requested_cents: amount_cents,
        }
        .into());
    }

    let movement = BankTransaction {
        id: new_id(),
        bank_id: bank.id.clone(),
        kind,
        amount_cents,
        loan_id: link.loan_id.map(str::to_string),
        installment_id: link.installment_id.map(str::to_string),
        description,
        occurred_at,
        created_at: Utc::now(),
    };

    debug!(bank_id, kind = %kind, amount_cents, "Inserting bank transaction");

    sqlx::query(
        r#"
        INSERT INTO bank_transactions (
            id, bank_id, kind, amount_cents, loan_id, installment_id,
            description, occurred_at, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.bank_id)
    .bind(movement.kind)
    .bind(movement.amount_cents)
    .bind(&movement.loan_id)
    .bind(&movement.installment_id)
    .bind(&movement.description)
    .bind(movement.occurred_at)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    sqlx::query("UPDATE banks SET balance_cents = balance_cents + ?2 WHERE id = ?1")
        .bind(&bank.id)
        .bind(movement.signed_amount().cents())
        .execute(&mut *conn)
        .await?;

    Ok(movement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig, DbError};

    fn movement(amount: i64) -> BankMovement {
        BankMovement {
            amount_cents: amount,
            description: None,
            occurred_at: None,
        }
    }

    async fn bank(db: &Database, opening: i64) -> Bank {
        db.banks()
            .create(&NewBank {
                name: "Azizi Bank".to_string(),
                account_number: Some("001-22".to_string()),
                opening_balance_cents: opening,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_opening_balance_is_a_deposit() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let bank = bank(&db, 10_000).await;
        assert_eq!(bank.balance_cents, 10_000);

        let ledger = db.banks().transactions(&bank.id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, BankTransactionKind::Deposit);
        assert_eq!(db.banks().signed_sum(&bank.id).await.unwrap().cents(), 10_000);
    }

    #[tokio::test]
    async fn test_balance_follows_movements() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let bank = bank(&db, 0).await;
        assert!(db.banks().transactions(&bank.id).await.unwrap().is_empty());

        db.banks().deposit(&bank.id, &movement(5_000)).await.unwrap();
        db.banks().withdraw(&bank.id, &movement(1_200)).await.unwrap();
        db.banks().deposit(&bank.id, &movement(300)).await.unwrap();

        let stored = db.banks().get_by_id(&bank.id).await.unwrap().unwrap();
        assert_eq!(stored.balance_cents, 4_100);
        assert_eq!(db.banks().signed_sum(&bank.id).await.unwrap().cents(), 4_100);
    }

    #[tokio::test]
    async fn test_overdraw_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let bank = bank(&db, 1_000).await;
        let err = db.banks().withdraw(&bank.id, &movement(1_001)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientFunds { balance_cents: 1_000, .. })
        ));
        assert_eq!(db.banks().transactions(&bank.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_fixes_drift() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let bank = bank(&db, 2_500).await;
        sqlx::query("UPDATE banks SET balance_cents = 9 WHERE id = ?1")
            .bind(&bank.id)
            .execute(db.pool())
            .await
            .unwrap();

        let corrections = db.banks().reconcile().await.unwrap();
        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections[0].stored.cents(), 9);
        assert_eq!(corrections[0].corrected.cents(), 2_500);
        assert!(db.banks().reconcile().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_movement_on_unknown_bank() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.banks().deposit("missing", &movement(1)).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
