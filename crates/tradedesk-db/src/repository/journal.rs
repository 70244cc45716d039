//! # Journal Repository
//!
//! The journal is a materialized copy of every treasury movement, one row
//! per source transaction or account record. It is rebuilt wholesale by
//! [`JournalRepository::sync`] and compared against the live formula by
//! [`JournalRepository::audit`].
//!
//! ## Sync
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SINGLE TRANSACTION                             │
//! │                                                                         │
//! │  1. movements = treasury formula rows (general scope)                   │
//! │  2. DELETE FROM journal_entries                                         │
//! │  3. INSERT one entry per movement                                       │
//! │                                                                         │
//! │  Readers see the old journal or the new one, never a mix.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Audit
//! Treasury vs journal for the general scope and each agency, then the
//! stored-value checks: bank balances, transaction amounts, line totals,
//! loan schedules, virtual warehouses and stock levels.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::{bank, new_id, treasury};
use crate::error::DbResult;
use tradedesk_core::audit::{
    check_bank, check_loan, check_scope, check_stock, check_transaction, check_transaction_items,
    check_warehouse, journal_balance, journal_entry, AuditReport, JournalSync,
};
use tradedesk_core::treasury::TreasuryBreakdown;
use tradedesk_core::{
    Bank, Installment, JournalEntry, Loan, Money, Stock, Transaction, TransactionItem, TreasuryScope, Warehouse,
};

#[derive(Debug, Clone)]
pub struct JournalRepository {
    pool: SqlitePool,
}

impl JournalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        JournalRepository { pool }
    }

    /// Replaces the journal with the current treasury movements.
    pub async fn sync(&self) -> DbResult<JournalSync> {
        let synced_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        let movements = treasury::movements(&mut tx, &TreasuryScope::General).await?;

        let removed = sqlx::query("DELETE FROM journal_entries")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        debug!(removed, "Cleared journal");

        let mut balance = Money::zero();
        for movement in &movements {
            let entry = journal_entry(movement, new_id(), synced_at);
            sqlx::query(
                r#"
                INSERT INTO journal_entries (
                    id, source_kind, source_id, agency_id, amount_cents, occurred_at, synced_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&entry.id)
            .bind(&entry.source_kind)
            .bind(&entry.source_id)
            .bind(&entry.agency_id)
            .bind(entry.amount_cents)
            .bind(entry.occurred_at)
            .bind(entry.synced_at)
            .execute(&mut *tx)
            .await?;
            balance += movement.amount;
        }

        tx.commit().await?;

        let sync = JournalSync {
            entries: movements.len() as u32,
            balance,
            synced_at,
        };
        info!(entries = sync.entries, balance_cents = balance.cents(), "Journal synced");
        Ok(sync)
    }

    pub async fn entries(&self) -> DbResult<Vec<JournalEntry>> {
        let rows = sqlx::query_as::<_, JournalEntry>(
            "SELECT * FROM journal_entries ORDER BY occurred_at, source_id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Runs every drift check. Read-only; use `sync` and bank `reconcile`
    /// to repair what it finds.
    ///
    /// All reads share one transaction, so a write committed mid-audit is
    /// either fully visible or not at all.
    pub async fn audit(&self) -> DbResult<AuditReport> {
        let mut tx = self.pool.begin().await?;
        let mut findings = Vec::new();

        // Treasury vs journal, general scope first.
        let movements = treasury::movements(&mut tx, &TreasuryScope::General).await?;
        let journal = sqlx::query_as::<_, JournalEntry>("SELECT * FROM journal_entries")
            .fetch_all(&mut *tx)
            .await?;
        let agency_ids = sqlx::query_scalar::<_, String>("SELECT id FROM agencies ORDER BY code")
            .fetch_all(&mut *tx)
            .await?;

        let mut scopes = Vec::with_capacity(agency_ids.len() + 1);
        for scope in std::iter::once(TreasuryScope::General).chain(agency_ids.into_iter().map(TreasuryScope::Agency)) {
            let treasury = TreasuryBreakdown::from_movements(
                movements.iter().filter(|m| scope.matches(m.agency_id.as_deref())),
            )
            .balance;
            let journal = journal_balance(&journal, &scope);
            let (check, finding) = check_scope(scope, treasury, journal);
            scopes.push(check);
            findings.extend(finding);
        }

        let banks = sqlx::query_as::<_, Bank>("SELECT * FROM banks ORDER BY name")
            .fetch_all(&mut *tx)
            .await?;
        for b in &banks {
            let sum = bank::signed_sum(&mut tx, &b.id).await?;
            findings.extend(check_bank(b, sum));
        }

        let transactions = sqlx::query_as::<_, Transaction>("SELECT * FROM transactions ORDER BY occurred_at, id")
            .fetch_all(&mut *tx)
            .await?;
        let mut items: HashMap<String, Vec<TransactionItem>> = HashMap::new();
        for item in sqlx::query_as::<_, TransactionItem>("SELECT * FROM transaction_items")
            .fetch_all(&mut *tx)
            .await?
        {
            items.entry(item.transaction_id.clone()).or_default().push(item);
        }
        for t in &transactions {
            findings.extend(check_transaction(t));
            let lines = items.get(&t.id).map(Vec::as_slice).unwrap_or_default();
            findings.extend(check_transaction_items(t, lines));
        }

        let loans = sqlx::query_as::<_, Loan>("SELECT * FROM loans")
            .fetch_all(&mut *tx)
            .await?;
        let mut schedules: HashMap<String, Vec<Installment>> = HashMap::new();
        for inst in sqlx::query_as::<_, Installment>("SELECT * FROM installments")
            .fetch_all(&mut *tx)
            .await?
        {
            schedules.entry(inst.loan_id.clone()).or_default().push(inst);
        }
        for loan in &loans {
            let rows = schedules.get(&loan.id).map(Vec::as_slice).unwrap_or_default();
            findings.extend(check_loan(loan, rows));
        }

        let warehouses = sqlx::query_as::<_, Warehouse>("SELECT * FROM warehouses")
            .fetch_all(&mut *tx)
            .await?;
        findings.extend(warehouses.iter().filter_map(check_warehouse));

        let stock = sqlx::query_as::<_, Stock>("SELECT * FROM stock")
            .fetch_all(&mut *tx)
            .await?;
        findings.extend(stock.iter().filter_map(check_stock));
        tx.rollback().await?;

        let report = AuditReport {
            generated_at: Utc::now(),
            scopes,
            findings,
        };
        if report.is_clean() {
            info!(scopes = report.scopes.len(), "Audit clean");
        } else {
            warn!(findings = report.findings.len(), "Audit found drift");
        }
        Ok(report)
    }
}
