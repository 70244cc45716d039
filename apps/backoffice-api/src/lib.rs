//! # Tradedesk Back-office API
//!
//! JSON over HTTP for the back-office dashboard. Handlers are thin wrappers
//! around `tradedesk-db` repositories; all balance rules live below them.
//!
//! ## Routes
//! ```text
//! GET  /health
//! /agencies /warehouses /users /products /stock/transfer      catalog
//! /customers /suppliers (+ /:id/debt)                         parties
//! /sales /purchases /returns /collections /supply-payments    trading
//! /transactions (+ /:id)                                      trading
//! /account-records                                            accounts
//! /treasury /treasury/ledger                                  treasury
//! /banks /loans /installments/:id/pay                         banks
//! /reports/{sales,accounts,products,debts,loans}              reports
//! /journal /journal/sync /audit                               journal
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ErrorCode};
pub use state::AppState;

/// Assembles every route over shared state, wrapped in request tracing.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::catalog::routes())
        .merge(routes::parties::routes())
        .merge(routes::trading::routes())
        .merge(routes::accounts::routes())
        .merge(routes::treasury::routes())
        .merge(routes::banks::routes())
        .merge(routes::reports::routes())
        .merge(routes::journal::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    database: bool,
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Health>) {
    let database = state.db.health_check().await;
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(Health {
            status: if database { "ok" } else { "degraded" },
            database,
        }),
    )
}
