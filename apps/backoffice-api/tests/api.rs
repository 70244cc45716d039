//! Drives the router in-process against an in-memory database.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use backoffice_api::{build_router, AppState};
use tradedesk_db::{Database, DbConfig};

async fn app() -> Router {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    build_router(Arc::new(AppState::new(db)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Some(body)).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, None).await
}

/// Agency, depot, product, customer and supplier ids.
struct Fixture {
    agency: String,
    depot: String,
    product: String,
    customer: String,
    supplier: String,
}

async fn fixture(app: &Router) -> Fixture {
    let (status, agency) = post(app, "/agencies", json!({ "name": "Kabul Central", "code": "KBL" })).await;
    assert_eq!(status, StatusCode::CREATED);
    let agency = agency["id"].as_str().unwrap().to_string();
    let (_, depot) = post(app, "/warehouses", json!({ "name": "KBL depot", "agency_id": agency })).await;
    let (_, product) = post(
        app,
        "/products",
        json!({ "sku": "OIL-5L", "name": "Cooking oil 5L", "purchase_price_cents": 3000, "sale_price_cents": 3700 }),
    )
    .await;
    let (_, customer) = post(app, "/customers", json!({ "name": "Corner Grocery" })).await;
    let (_, supplier) = post(app, "/suppliers", json!({ "name": "Gulf Oil Traders" })).await;
    Fixture {
        agency,
        depot: depot["id"].as_str().unwrap().to_string(),
        product: product["id"].as_str().unwrap().to_string(),
        customer: customer["id"].as_str().unwrap().to_string(),
        supplier: supplier["id"].as_str().unwrap().to_string(),
    }
}

#[tokio::test]
async fn health_reports_database() {
    let app = app().await;
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn trading_moves_stock_debt_and_treasury() {
    let app = app().await;
    let f = fixture(&app).await;

    let (status, purchase) = post(
        &app,
        "/purchases",
        json!({
            "warehouse_id": f.depot,
            "supplier_id": f.supplier,
            "items": [{ "product_id": f.product, "quantity": 10 }],
            "paid_cents": 10000
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(purchase["total_cents"], 30000);
    assert_eq!(purchase["remaining_cents"], 20000);
    assert_eq!(purchase["agency_id"], f.agency.as_str());

    let (status, sale) = post(
        &app,
        "/sales",
        json!({
            "warehouse_id": f.depot,
            "customer_id": f.customer,
            "items": [{ "product_id": f.product, "quantity": 4 }],
            "paid_cents": 5000
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sale["total_cents"], 14800);
    assert_eq!(sale["items"].as_array().unwrap().len(), 1);

    let (_, stock) = get(&app, &format!("/products/{}/stock", f.product)).await;
    let depot_row = stock
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["warehouse_id"] == f.depot.as_str())
        .unwrap();
    assert_eq!(depot_row["quantity"], 6);

    let (_, debt) = get(&app, &format!("/customers/{}/debt", f.customer)).await;
    assert_eq!(debt["balance"], 9800);
    let (_, debt) = get(&app, &format!("/suppliers/{}/debt", f.supplier)).await;
    assert_eq!(debt["balance"], 20000);

    let (status, treasury) = get(&app, &format!("/treasury?agency_id={}", f.agency)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(treasury["closing_balance"], 5000 - 10000);

    let (_, sales) = get(&app, "/transactions?kind=SALE").await;
    assert_eq!(sales.as_array().unwrap().len(), 1);
    let id = sale["id"].as_str().unwrap();
    let (status, detail) = get(&app, &format!("/transactions/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["reference"], sale["reference"]);
}

#[tokio::test]
async fn business_rule_violations_map_to_status_codes() {
    let app = app().await;
    let f = fixture(&app).await;

    let (status, body) = post(
        &app,
        "/sales",
        json!({
            "warehouse_id": f.depot,
            "customer_id": f.customer,
            "items": [{ "product_id": f.product, "quantity": 50 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let (status, body) = post(&app, "/banks", json!({ "name": "Maiwand Bank", "opening_balance_cents": 10000 })).await;
    assert_eq!(status, StatusCode::CREATED);
    let bank = body["id"].as_str().unwrap().to_string();
    let (status, body) = post(&app, &format!("/banks/{bank}/withdraw"), json!({ "amount_cents": 20000 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_FUNDS");

    let (status, body) = get(&app, "/transactions/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (status, body) = get(&app, "/treasury?from=2026-03-01T00:00:00Z&to=2026-02-01T00:00:00Z").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = post(&app, "/agencies", json!({ "name": "Kabul East", "code": "KBL" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "code already exists in agencies");

    let (status, body) = post(&app, "/agencies", json!({ "name": "  ", "code": "X" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = post(
        &app,
        "/account-records",
        json!({ "kind": "INCOME", "category": "windfall", "amount_cents": i64::MAX }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    let (status, _) = get(&app, "/treasury").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn loan_lifecycle_over_http() {
    let app = app().await;
    let (_, bank) = post(&app, "/banks", json!({ "name": "Da Afghanistan Bank" })).await;
    let bank = bank["id"].as_str().unwrap().to_string();

    let (status, loan) = post(
        &app,
        "/loans",
        json!({
            "bank_id": bank,
            "principal_cents": 100000,
            "interest_rate_bps": 1000,
            "term_months": 3,
            "start_date": "2026-01-15"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["total_cents"], 110000);
    let installments = loan["installments"].as_array().unwrap();
    let amounts: Vec<i64> = installments.iter().map(|i| i["amount_cents"].as_i64().unwrap()).collect();
    assert_eq!(amounts, vec![36666, 36666, 36668]);

    let first = installments[0]["id"].as_str().unwrap().to_string();
    let (status, paid) = post(&app, &format!("/installments/{first}/pay"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["installments"][0]["status"], "PAID");
    assert_eq!(paid["status"], "ACTIVE");

    let (status, body) = post(&app, &format!("/installments/{first}/pay"), json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "BUSINESS_LOGIC");

    let (_, banks) = get(&app, "/banks").await;
    assert_eq!(banks[0]["balance_cents"], 100000 - 36666);
    let (_, movements) = get(&app, &format!("/banks/{bank}/transactions")).await;
    assert_eq!(movements.as_array().unwrap().len(), 2);

    let (_, exposure) = get(&app, "/reports/loans").await;
    assert_eq!(exposure.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn journal_sync_then_clean_audit() {
    let app = app().await;
    let f = fixture(&app).await;
    post(
        &app,
        "/account-records",
        json!({ "kind": "INCOME", "category": "transport", "amount_cents": 1250, "agency_id": f.agency }),
    )
    .await;
    post(
        &app,
        "/collections",
        json!({ "party_id": f.customer, "amount_cents": 500 }),
    )
    .await;

    let (status, sync) = post(&app, "/journal/sync", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sync["entries"], 2);
    assert_eq!(sync["balance"], 1750);

    let (status, audit) = get(&app, "/audit").await;
    assert_eq!(status, StatusCode::OK);
    assert!(audit["findings"].as_array().unwrap().is_empty(), "{audit}");

    let (_, records) = get(&app, &format!("/account-records?kind=INCOME&agency_id={}", f.agency)).await;
    assert_eq!(records.as_array().unwrap().len(), 1);
    let (_, journal) = get(&app, "/journal").await;
    assert_eq!(journal.as_array().unwrap().len(), 2);
}
