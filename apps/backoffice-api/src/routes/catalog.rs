//! Agencies, warehouses, users, products and stock.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tradedesk_core::input::{NewAgency, NewProduct, NewUser, NewWarehouse, StockTransfer};
use tradedesk_core::{Agency, Product, Stock, User, Warehouse};
use tradedesk_db::TransferResult;

use super::AgencyQuery;
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/agencies", get(list_agencies).post(create_agency))
        .route("/warehouses", get(list_warehouses).post(create_warehouse))
        .route("/warehouses/:id/stock", get(warehouse_stock))
        .route("/users", get(list_users).post(create_user))
        .route("/products", get(list_products).post(create_product))
        .route("/products/:id/stock", get(product_stock))
        .route("/stock/transfer", post(transfer_stock))
}

async fn create_agency(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewAgency>,
) -> Result<(StatusCode, Json<Agency>), ApiError> {
    let agency = state.db.agencies().create(&input).await?;
    Ok((StatusCode::CREATED, Json(agency)))
}

async fn list_agencies(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Agency>>, ApiError> {
    Ok(Json(state.db.agencies().list().await?))
}

/// Physical warehouses only. Virtual (van) warehouses are created with sales reps.
async fn create_warehouse(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewWarehouse>,
) -> Result<(StatusCode, Json<Warehouse>), ApiError> {
    let warehouse = state.db.warehouses().create(&input).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

async fn list_warehouses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgencyQuery>,
) -> Result<Json<Vec<Warehouse>>, ApiError> {
    Ok(Json(state.db.warehouses().list(query.agency()).await?))
}

async fn warehouse_stock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Stock>>, ApiError> {
    if state.db.warehouses().get_by_id(&id).await?.is_none() {
        return Err(ApiError::not_found("Warehouse", &id));
    }
    Ok(Json(state.db.stock().for_warehouse(&id).await?))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.db.users().create(&input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AgencyQuery>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.db.users().list(query.agency()).await?))
}

#[derive(Debug, Default, Deserialize)]
struct ProductQuery {
    agency_id: Option<String>,
    #[serde(default)]
    include_inactive: bool,
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.db.products().create(&input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let agency = query.agency_id.as_deref().filter(|a| !a.is_empty());
    Ok(Json(state.db.products().list(agency, query.include_inactive).await?))
}

async fn product_stock(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Stock>>, ApiError> {
    if state.db.products().get_by_id(&id).await?.is_none() {
        return Err(ApiError::not_found("Product", &id));
    }
    Ok(Json(state.db.stock().for_product(&id).await?))
}

async fn transfer_stock(
    State(state): State<Arc<AppState>>,
    Json(input): Json<StockTransfer>,
) -> Result<Json<TransferResult>, ApiError> {
    Ok(Json(state.db.stock().transfer(&input).await?))
}
