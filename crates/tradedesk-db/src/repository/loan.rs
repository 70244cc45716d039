//! # Loan Repository
//!
//! ## Lifecycle
//! ```text
//!  create ──► amortize(principal, rate, term)           (tradedesk-core)
//!         ──► INSERT loan (ACTIVE) + N installments (PENDING)
//!         ──► bank DEPOSIT of the principal
//!
//!  pay_installment ──► bank WITHDRAWAL of the installment amount
//!                  ──► installment PAID
//!                  ──► loan PAID once nothing is pending
//! ```
//! Every step of a lifecycle arrow runs inside one database transaction.

use chrono::{NaiveTime, TimeZone, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::bank::{self, MovementLink};
use super::{new_id, require};
use crate::error::DbResult;
use tradedesk_core::input::NewLoan;
use tradedesk_core::loan::{amortize, is_settled};
use tradedesk_core::types::InterestRate;
use tradedesk_core::{
    BankTransactionKind, CoreError, Installment, InstallmentStatus, Loan, LoanDetail, LoanStatus, Money,
};

#[derive(Debug, Clone)]
pub struct LoanRepository {
    pool: SqlitePool,
}

impl LoanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LoanRepository { pool }
    }

    /// Takes out a loan: schedules its installments and deposits the
    /// principal into the lending bank.
    pub async fn create(&self, input: &NewLoan) -> DbResult<LoanDetail> {
        input.validate()?;
        let schedule = amortize(
            Money::from_cents(input.principal_cents),
            InterestRate::from_bps(input.interest_rate_bps),
            input.term_months,
            input.start_date,
        )?;

        let now = Utc::now();
        let loan = Loan {
            id: new_id(),
            bank_id: input.bank_id.clone(),
            principal_cents: schedule.principal.cents(),
            interest_rate_bps: i64::from(input.interest_rate_bps),
            interest_cents: schedule.interest.cents(),
            total_cents: schedule.total.cents(),
            term_months: i64::from(schedule.term_months()),
            start_date: input.start_date,
            status: LoanStatus::Active,
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;
        require(bank::fetch(&mut tx, &loan.bank_id).await?, "Bank", &loan.bank_id)?;

        debug!(id = %loan.id, bank_id = %loan.bank_id, total_cents = loan.total_cents, "Inserting loan");
        sqlx::query(
            r#"
            INSERT INTO loans (
                id, bank_id, principal_cents, interest_rate_bps, interest_cents,
                total_cents, term_months, start_date, status, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&loan.id)
        .bind(&loan.bank_id)
        .bind(loan.principal_cents)
        .bind(loan.interest_rate_bps)
        .bind(loan.interest_cents)
        .bind(loan.total_cents)
        .bind(loan.term_months)
        .bind(loan.start_date)
        .bind(loan.status)
        .bind(loan.created_at)
        .execute(&mut *tx)
        .await?;

        let mut installments = Vec::with_capacity(schedule.installments.len());
        for scheduled in &schedule.installments {
            let installment = Installment {
                id: new_id(),
                loan_id: loan.id.clone(),
                sequence: i64::from(scheduled.sequence),
                amount_cents: scheduled.amount.cents(),
                due_date: scheduled.due_date,
                status: InstallmentStatus::Pending,
                paid_at: None,
            };
            sqlx::query(
                r#"
                INSERT INTO installments (id, loan_id, sequence, amount_cents, due_date, status, paid_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)
                "#,
            )
            .bind(&installment.id)
            .bind(&installment.loan_id)
            .bind(installment.sequence)
            .bind(installment.amount_cents)
            .bind(installment.due_date)
            .bind(installment.status)
            .execute(&mut *tx)
            .await?;
            installments.push(installment);
        }

        bank::record_movement(
            &mut tx,
            &loan.bank_id,
            BankTransactionKind::Deposit,
            loan.principal_cents,
            MovementLink {
                loan_id: Some(&loan.id),
                installment_id: None,
            },
            Some("Loan principal".to_string()),
            Utc.from_utc_datetime(&input.start_date.and_time(NaiveTime::MIN)),
        )
        .await?;

        tx.commit().await?;

        info!(
            id = %loan.id,
            principal_cents = loan.principal_cents,
            interest_cents = loan.interest_cents,
            term_months = loan.term_months,
            "Loan created"
        );
        Ok(LoanDetail { loan, installments })
    }

    pub async fn get_detail(&self, id: &str) -> DbResult<Option<LoanDetail>> {
        let mut conn = self.pool.acquire().await?;
        let Some(loan) = fetch(&mut conn, id).await? else {
            return Ok(None);
        };
        let installments = installments_of(&mut conn, id).await?;
        Ok(Some(LoanDetail { loan, installments }))
    }

    /// Loans, optionally restricted to one bank, newest first.
    pub async fn list(&self, bank_id: Option<&str>) -> DbResult<Vec<Loan>> {
        let rows = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE (?1 IS NULL OR bank_id = ?1) ORDER BY created_at DESC, id",
        )
        .bind(bank_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Every installment of every loan, by loan then sequence.
    pub async fn all_installments(&self) -> DbResult<Vec<Installment>> {
        let rows = sqlx::query_as::<_, Installment>("SELECT * FROM installments ORDER BY loan_id, sequence")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Pays one installment out of the loan's bank.
    ///
    /// ## Errors
    /// * `CoreError::InstallmentAlreadyPaid` - installment is not pending
    /// * `CoreError::InsufficientFunds` - bank balance below the amount
    pub async fn pay_installment(&self, installment_id: &str) -> DbResult<LoanDetail> {
        let mut tx = self.pool.begin().await?;

        let installment = require(
            sqlx::query_as::<_, Installment>("SELECT * FROM installments WHERE id = ?1")
                .bind(installment_id)
                .fetch_optional(&mut *tx)
                .await?,
            "Installment",
            installment_id,
        )?;
        if installment.status == InstallmentStatus::Paid {
            return Err(CoreError::InstallmentAlreadyPaid(installment.id).into());
        }
        let mut loan = require(fetch(&mut tx, &installment.loan_id).await?, "Loan", &installment.loan_id)?;

        let now = Utc::now();
        bank::record_movement(
            &mut tx,
            &loan.bank_id,
            BankTransactionKind::Withdrawal,
            installment.amount_cents,
            MovementLink {
                loan_id: Some(&loan.id),
                installment_id: Some(&installment.id),
            },
            Some(format!("Installment {} of {}", installment.sequence, loan.term_months)),
            now,
        )
        .await?;

        debug!(id = %installment.id, loan_id = %loan.id, "Marking installment paid");
        sqlx::query("UPDATE installments SET status = ?2, paid_at = ?3 WHERE id = ?1")
            .bind(&installment.id)
            .bind(InstallmentStatus::Paid)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let installments = installments_of(&mut tx, &loan.id).await?;
        if is_settled(&installments) {
            sqlx::query("UPDATE loans SET status = ?2 WHERE id = ?1")
                .bind(&loan.id)
                .bind(LoanStatus::Paid)
                .execute(&mut *tx)
                .await?;
            loan.status = LoanStatus::Paid;
        }

        tx.commit().await?;

        info!(
            loan_id = %loan.id,
            sequence = installment.sequence,
            amount_cents = installment.amount_cents,
            loan_status = %loan.status,
            "Installment paid"
        );
        Ok(LoanDetail { loan, installments })
    }
}

async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Loan>> {
    let row = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row)
}

async fn installments_of(conn: &mut SqliteConnection, loan_id: &str) -> DbResult<Vec<Installment>> {
    let rows = sqlx::query_as::<_, Installment>(
        "SELECT * FROM installments WHERE loan_id = ?1 ORDER BY sequence",
    )
    .bind(loan_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}
