//! Journal rebuild and the drift audit.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tradedesk_core::audit::{AuditReport, JournalSync};
use tradedesk_core::JournalEntry;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/journal", get(entries))
        .route("/journal/sync", post(sync))
        .route("/audit", get(audit))
}

async fn entries(State(state): State<Arc<AppState>>) -> Result<Json<Vec<JournalEntry>>, ApiError> {
    Ok(Json(state.db.journal().entries().await?))
}

async fn sync(State(state): State<Arc<AppState>>) -> Result<Json<JournalSync>, ApiError> {
    Ok(Json(state.db.journal().sync().await?))
}

/// Always 200; drift shows up as findings in the body.
async fn audit(State(state): State<Arc<AppState>>) -> Result<Json<AuditReport>, ApiError> {
    let report = state.db.journal().audit().await?;
    if !report.is_clean() {
        tracing::warn!(findings = report.findings.len(), "Audit found drift");
    }
    Ok(Json(report))
}
