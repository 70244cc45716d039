//! # Treasury Repository
//!
//! The treasury balance is never stored. It is rebuilt on every read from
//! transactions and account records:
//!
//! ```text
//! balance = Σ sale.paid − Σ purchase.paid + Σ collection.paid
//!         + Σ income − Σ expense
//! ```
//!
//! Returns and supplier payments reach it through their EXPENSE records.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use tradedesk_core::reports::DateRange;
use tradedesk_core::treasury::{
    collect_movements, period_ledger, summarize_period, CashMovement, PeriodLedger, TreasuryBreakdown,
    TreasurySummary,
};
use tradedesk_core::{AccountRecord, Transaction, TreasuryScope};

#[derive(Debug, Clone)]
pub struct TreasuryRepository {
    pool: SqlitePool,
}

impl TreasuryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TreasuryRepository { pool }
    }

    /// Every cash movement in scope, unsorted.
    pub async fn movements(&self, scope: &TreasuryScope) -> DbResult<Vec<CashMovement>> {
        let mut conn = self.pool.acquire().await?;
        movements(&mut conn, scope).await
    }

    /// All-time balance with its five terms.
    pub async fn breakdown(&self, scope: &TreasuryScope) -> DbResult<TreasuryBreakdown> {
        let movements = self.movements(scope).await?;
        Ok(TreasuryBreakdown::from_movements(&movements))
    }

    /// Opening balance, period terms and closing balance for `range`.
    pub async fn summary(&self, scope: TreasuryScope, range: DateRange) -> DbResult<TreasurySummary> {
        let movements = self.movements(&scope).await?;
        Ok(summarize_period(&movements, scope, range.from, range.to))
    }

    /// Chronological ledger with a running balance.
    pub async fn ledger(&self, scope: TreasuryScope, range: DateRange) -> DbResult<PeriodLedger> {
        let movements = self.movements(&scope).await?;
        Ok(period_ledger(movements, scope, range.from, range.to))
    }
}

/// Loads the source rows for `scope` and classifies them.
pub(crate) async fn movements(conn: &mut SqliteConnection, scope: &TreasuryScope) -> DbResult<Vec<CashMovement>> {
    let agency_id = scope.agency_id();
    let transactions = sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE kind IN ('SALE', 'PURCHASE', 'COLLECTION')
          AND paid_cents > 0
          AND (?1 IS NULL OR agency_id = ?1)
        "#,
    )
    .bind(agency_id)
    .fetch_all(&mut *conn)
    .await?;
    let records = sqlx::query_as::<_, AccountRecord>(
        "SELECT * FROM account_records WHERE (?1 IS NULL OR agency_id = ?1)",
    )
    .bind(agency_id)
    .fetch_all(&mut *conn)
    .await?;

    let movements = collect_movements(&transactions, &records, scope);
    debug!(scope = ?scope, movements = movements.len(), "Loaded treasury movements");
    Ok(movements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::{TimeZone, Utc};
    use tradedesk_core::input::{LineInput, NewAccountRecord, NewAgency, NewInvoice, NewParty, NewPayment, NewProduct, NewWarehouse};
    use tradedesk_core::AccountRecordKind;

    struct World {
        db: Database,
        agency_id: String,
        warehouse_id: String,
        product_id: String,
        customer_id: String,
        supplier_id: String,
    }

    async fn world() -> World {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let agency_id = db
            .agencies()
            .create(&NewAgency {
                name: "Herat".to_string(),
                code: "HRT".to_string(),
                address: None,
                phone: None,
            })
            .await
            .unwrap()
            .id;
        let warehouse_id = db
            .warehouses()
            .create(&NewWarehouse {
                name: "Herat depot".to_string(),
                agency_id: Some(agency_id.clone()),
            })
            .await
            .unwrap()
            .id;
        let product_id = db
            .products()
            .create(&NewProduct {
                sku: "TEA-500G".to_string(),
                name: "Green tea".to_string(),
                unit: "box".to_string(),
                purchase_price_cents: 400,
                sale_price_cents: 500,
                agency_id: None,
            })
            .await
            .unwrap()
            .id;
        let party = |name: &str| NewParty {
            name: name.to_string(),
            agency_id: None,
            phone: None,
            address: None,
        };
        let customer_id = db.customers().create(&party("Tea House")).await.unwrap().id;
        let supplier_id = db.suppliers().create(&party("Tea Importer")).await.unwrap().id;
        World {
            db,
            agency_id,
            warehouse_id,
            product_id,
            customer_id,
            supplier_id,
        }
    }

    fn invoice(w: &World, qty: i64, paid: i64, day: u32) -> NewInvoice {
        NewInvoice {
            agency_id: None,
            warehouse_id: w.warehouse_id.clone(),
            customer_id: Some(w.customer_id.clone()),
            supplier_id: Some(w.supplier_id.clone()),
            items: vec![LineInput {
                product_id: w.product_id.clone(),
                quantity: qty,
                unit_price_cents: None,
            }],
            paid_cents: paid,
            note: None,
            occurred_at: Some(Utc.with_ymd_and_hms(2026, 5, day, 10, 0, 0).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_balance_follows_formula() {
        let w = world().await;
        let t = w.db.transactions();
        t.create_purchase(&invoice(&w, 10, 3_000, 1)).await.unwrap();
        t.create_sale(&invoice(&w, 4, 1_500, 2)).await.unwrap();
        t.create_return(&invoice(&w, 1, 200, 3)).await.unwrap();
        t.create_collection(&NewPayment {
            agency_id: None,
            party_id: w.customer_id.clone(),
            amount_cents: 400,
            note: None,
            occurred_at: Some(Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap()),
        })
        .await
        .unwrap();
        t.create_supply_payment(&NewPayment {
            agency_id: None,
            party_id: w.supplier_id.clone(),
            amount_cents: 700,
            note: None,
            occurred_at: Some(Utc.with_ymd_and_hms(2026, 5, 5, 10, 0, 0).unwrap()),
        })
        .await
        .unwrap();
        w.db.accounts()
            .create(&NewAccountRecord {
                kind: AccountRecordKind::Income,
                category: "commission".to_string(),
                amount_cents: 50,
                agency_id: None,
                customer_id: None,
                supplier_id: None,
                description: None,
                occurred_at: Some(Utc.with_ymd_and_hms(2026, 5, 6, 10, 0, 0).unwrap()),
            })
            .await
            .unwrap();

        let general = w.db.treasury().breakdown(&TreasuryScope::General).await.unwrap();
        assert_eq!(general.sales_paid.cents(), 1_500);
        assert_eq!(general.purchases_paid.cents(), 3_000);
        assert_eq!(general.collections.cents(), 400);
        assert_eq!(general.income.cents(), 50);
        assert_eq!(general.expense.cents(), 200 + 700);
        assert_eq!(general.balance.cents(), 1_500 - 3_000 + 400 + 50 - 900);

        // Invoices inherit the warehouse agency; payments and the manual record do not.
        let agency = w
            .db
            .treasury()
            .breakdown(&TreasuryScope::Agency(w.agency_id.clone()))
            .await
            .unwrap();
        assert_eq!(agency.balance.cents(), 1_500 - 3_000 - 200);
    }

    #[tokio::test]
    async fn test_oversized_records_rejected_and_stored_extremes_saturate() {
        let w = world().await;
        let income = |amount_cents: i64| NewAccountRecord {
            kind: AccountRecordKind::Income,
            category: "commission".to_string(),
            amount_cents,
            agency_id: None,
            customer_id: None,
            supplier_id: None,
            description: None,
            occurred_at: None,
        };
        let err = w.db.accounts().create(&income(i64::MAX)).await.unwrap_err();
        assert!(matches!(err, crate::DbError::Core(tradedesk_core::CoreError::Validation(_))));
        w.db.accounts().create(&income(tradedesk_core::MAX_AMOUNT_CENTS)).await.unwrap();

        // Rows written around the repository still have to load.
        for id in ["raw-1", "raw-2"] {
            sqlx::query(
                "INSERT INTO account_records (id, kind, category, amount_cents, occurred_at, created_at) \
                 VALUES (?, 'INCOME', 'raw', ?, ?, ?)",
            )
            .bind(id)
            .bind(i64::MAX)
            .bind(Utc::now())
            .bind(Utc::now())
            .execute(w.db.pool())
            .await
            .unwrap();
        }
        let general = w.db.treasury().breakdown(&TreasuryScope::General).await.unwrap();
        assert_eq!(general.income.cents(), i64::MAX);
        assert_eq!(general.balance.cents(), i64::MAX);
    }

    #[tokio::test]
    async fn test_period_ledger_opens_with_prior_balance() {
        let w = world().await;
        let t = w.db.transactions();
        t.create_purchase(&invoice(&w, 10, 0, 1)).await.unwrap();
        t.create_sale(&invoice(&w, 1, 500, 2)).await.unwrap();
        t.create_sale(&invoice(&w, 2, 1_000, 10)).await.unwrap();
        t.create_sale(&invoice(&w, 1, 300, 20)).await.unwrap();

        let range = DateRange::new(
            Some(Utc.with_ymd_and_hms(2026, 5, 5, 0, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2026, 5, 20, 0, 0, 0).unwrap()),
        )
        .unwrap();
        let ledger = w.db.treasury().ledger(TreasuryScope::General, range).await.unwrap();
        assert_eq!(ledger.opening_balance.cents(), 500);
        assert_eq!(ledger.lines.len(), 1);
        assert_eq!(ledger.closing_balance.cents(), 1_500);

        let summary = w.db.treasury().summary(TreasuryScope::General, range).await.unwrap();
        assert_eq!(summary.period.sales_paid.cents(), 1_000);
        assert_eq!(summary.closing_balance, ledger.closing_balance);
    }
}
