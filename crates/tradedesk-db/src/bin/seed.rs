//! # Demo Data Seeder
//!
//! Fills an empty database with a small trading network: two agencies with
//! a depot each, a sales rep (and their van), a catalogue, customers,
//! suppliers, a few weeks of purchases and sales, a bank and a loan. Ends
//! with a journal sync so the first audit is clean.
//!
//! ## Usage
//! ```bash
//! cargo run -p tradedesk-db --bin seed
//! cargo run -p tradedesk-db --bin seed -- --db ./data/tradedesk.db --days 30
//! ```

use std::env;

use anyhow::{bail, Context};
use chrono::{Duration, NaiveDate, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tradedesk_core::input::{
    LineInput, NewAccountRecord, NewAgency, NewBank, NewInvoice, NewLoan, NewParty, NewPayment, NewProduct,
    NewUser, NewWarehouse,
};
use tradedesk_core::{AccountRecordKind, TreasuryScope, UserRole};
use tradedesk_db::{Database, DbConfig};

/// (sku, name, unit, purchase cents, sale cents)
const CATALOGUE: &[(&str, &str, &str, i64, i64)] = &[
    ("RICE-25KG", "Basmati rice 25kg", "bag", 150_000, 180_000),
    ("FLOUR-50KG", "Wheat flour 50kg", "bag", 210_000, 245_000),
    ("OIL-5L", "Cooking oil 5L", "can", 9_000, 11_000),
    ("SUGAR-1KG", "White sugar 1kg", "pack", 800, 1_000),
    ("TEA-500G", "Green tea 500g", "box", 4_000, 5_200),
    ("SALT-1KG", "Iodized salt 1kg", "pack", 300, 450),
];

const CUSTOMERS: &[&str] = &["Corner Grocery", "Bakery Nawroz", "Hotel Park", "Market Stall 14"];
const SUPPLIERS: &[&str] = &["Northern Mills", "Gulf Oil Traders", "Tea Importers Co"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./tradedesk_dev.db");
    let mut days: i64 = 14;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if let Some(value) = args.get(i + 1) {
                    db_path = value.clone();
                    i += 1;
                }
            }
            "--days" => {
                if let Some(value) = args.get(i + 1) {
                    days = value.parse().with_context(|| format!("invalid --days value: {value}"))?;
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tradedesk Demo Data Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tradedesk_dev.db)");
                println!("      --days <N>     Days of trading history (default: 14)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
        i += 1;
    }
    if !(1..=365).contains(&days) {
        bail!("--days must be between 1 and 365");
    }

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;
    info!(path = %db_path, "Connected, migrations applied");

    if db.products().count().await? > 0 {
        warn!("Database already has products; delete the file to reseed");
        return Ok(());
    }

    // Agencies, depots, a sales rep.
    let mut depots = Vec::new();
    for (name, code) in [("Kabul Central", "KBL"), ("Herat West", "HRT")] {
        let agency = db
            .agencies()
            .create(&NewAgency {
                name: name.to_string(),
                code: code.to_string(),
                address: None,
                phone: None,
            })
            .await?;
        let depot = db
            .warehouses()
            .create(&NewWarehouse {
                name: format!("{name} depot"),
                agency_id: Some(agency.id.clone()),
            })
            .await?;
        depots.push((agency, depot));
    }
    let (first_agency, _) = &depots[0];
    let rep = db
        .users()
        .create(&NewUser {
            name: "Farid Rahimi".to_string(),
            email: "farid@tradedesk.local".to_string(),
            role: UserRole::SalesRep,
            agency_id: Some(first_agency.id.clone()),
        })
        .await?;
    info!(agencies = depots.len(), rep = %rep.name, "Agencies and warehouses created");

    let mut products = Vec::new();
    for (sku, name, unit, purchase, sale) in CATALOGUE {
        products.push(
            db.products()
                .create(&NewProduct {
                    sku: sku.to_string(),
                    name: name.to_string(),
                    unit: unit.to_string(),
                    purchase_price_cents: *purchase,
                    sale_price_cents: *sale,
                    agency_id: None,
                })
                .await?,
        );
    }

    let party = |name: &str, agency_id: &str| NewParty {
        name: name.to_string(),
        agency_id: Some(agency_id.to_string()),
        phone: None,
        address: None,
    };
    let mut customers = Vec::new();
    for (n, name) in CUSTOMERS.iter().enumerate() {
        let (agency, _) = &depots[n % depots.len()];
        customers.push(db.customers().create(&party(name, &agency.id)).await?);
    }
    let mut suppliers = Vec::new();
    for (n, name) in SUPPLIERS.iter().enumerate() {
        let (agency, _) = &depots[n % depots.len()];
        suppliers.push(db.suppliers().create(&party(name, &agency.id)).await?);
    }

    // Trading history.
    let start = Utc::now() - Duration::days(days);
    for (n, (_, depot)) in depots.iter().enumerate() {
        let supplier = &suppliers[n % suppliers.len()];
        let lines = products
            .iter()
            .map(|p| LineInput {
                product_id: p.id.clone(),
                quantity: days * 8,
                unit_price_cents: None,
            })
            .collect::<Vec<_>>();
        let purchase = db
            .transactions()
            .create_purchase(&NewInvoice {
                agency_id: None,
                warehouse_id: depot.id.clone(),
                customer_id: None,
                supplier_id: Some(supplier.id.clone()),
                items: lines,
                paid_cents: 0,
                note: Some("Opening stock".to_string()),
                occurred_at: Some(start),
            })
            .await?;
        db.transactions()
            .create_supply_payment(&NewPayment {
                agency_id: None,
                party_id: supplier.id.clone(),
                amount_cents: purchase.transaction.total_cents / 2,
                note: None,
                occurred_at: Some(start + Duration::days(1)),
            })
            .await?;
    }

    let mut sales = 0;
    for day in 1..days {
        let at = start + Duration::days(day);
        for (n, customer) in customers.iter().enumerate() {
            let depot = &depots[n % depots.len()].1;
            let product = &products[(day as usize + n) % products.len()];
            let quantity = 1 + (day + n as i64) % 4;
            let total = product.sale_price_cents * quantity;
            db.transactions()
                .create_sale(&NewInvoice {
                    agency_id: None,
                    warehouse_id: depot.id.clone(),
                    customer_id: Some(customer.id.clone()),
                    supplier_id: None,
                    items: vec![LineInput {
                        product_id: product.id.clone(),
                        quantity,
                        unit_price_cents: None,
                    }],
                    paid_cents: if day % 3 == 0 { total } else { total / 2 },
                    note: None,
                    occurred_at: Some(at),
                })
                .await?;
            sales += 1;
        }
        if day % 7 == 0 {
            for customer in &customers {
                let debt = db.customers().debt(&customer.id).await?;
                if debt.balance.is_positive() {
                    db.transactions()
                        .create_collection(&NewPayment {
                            agency_id: None,
                            party_id: customer.id.clone(),
                            amount_cents: debt.balance.cents(),
                            note: Some("Weekly collection".to_string()),
                            occurred_at: Some(at),
                        })
                        .await?;
                }
            }
        }
    }
    info!(sales, days, "Trading history created");

    for (agency, _) in &depots {
        db.accounts()
            .create(&NewAccountRecord {
                kind: AccountRecordKind::Expense,
                category: "rent".to_string(),
                amount_cents: 25_000,
                agency_id: Some(agency.id.clone()),
                customer_id: None,
                supplier_id: None,
                description: Some("Monthly depot rent".to_string()),
                occurred_at: Some(start),
            })
            .await?;
    }

    let bank = db
        .banks()
        .create(&NewBank {
            name: "Da Afghanistan Bank".to_string(),
            account_number: Some("0101-445566".to_string()),
            opening_balance_cents: 5_000_000,
        })
        .await?;
    let loan = db
        .loans()
        .create(&NewLoan {
            bank_id: bank.id.clone(),
            principal_cents: 1_200_000,
            interest_rate_bps: 800,
            term_months: 12,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 15).context("invalid loan start date")?,
        })
        .await?;
    if let Some(first) = loan.installments.first() {
        db.loans().pay_installment(&first.id).await?;
    }

    let sync = db.journal().sync().await?;
    let treasury = db.treasury().breakdown(&TreasuryScope::General).await?;
    let audit = db.journal().audit().await?;
    info!(
        journal_entries = sync.entries,
        treasury = %treasury.balance,
        audit_clean = audit.is_clean(),
        "Seed complete"
    );
    Ok(())
}
