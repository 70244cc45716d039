//! Customers and suppliers, with their running debt.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use tradedesk_core::input::NewParty;
use tradedesk_core::reports::DebtStatement;
use tradedesk_core::{Customer, Supplier};

use super::AgencyQuery;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route("/customers/:id/debt", get(customer_debt))
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route("/suppliers/:id/debt", get(supplier_debt))
}

async fn create_customer(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewParty>,
) -> Result<(StatusCode, Json<Customer>), ApiError> {
    let customer = state.db.customers().create(&input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn list_customers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgencyQuery>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    Ok(Json(state.db.customers().list(query.agency()).await?))
}

/// Positive balance: the customer owes us.
async fn customer_debt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DebtStatement>, ApiError> {
    Ok(Json(state.db.customers().debt(&id).await?))
}

async fn create_supplier(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewParty>,
) -> Result<(StatusCode, Json<Supplier>), ApiError> {
    let supplier = state.db.suppliers().create(&input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

async fn list_suppliers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgencyQuery>,
) -> Result<Json<Vec<Supplier>>, ApiError> {
    Ok(Json(state.db.suppliers().list(query.agency()).await?))
}

/// Positive balance: we owe the supplier.
async fn supplier_debt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DebtStatement>, ApiError> {
    Ok(Json(state.db.suppliers().debt(&id).await?))
}
