//! History and dashboard handlers.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use crib_store::HistoryEntry;

use super::AppState;
use crate::{dashboard::DashboardSummary, error::CribResult, ledger::HistoryFilter};

pub async fn history(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<HistoryFilter>,
) -> CribResult<Json<Vec<HistoryEntry>>> {
    Ok(Json(state.ledger.list(&filter).await?))
}

pub async fn dashboard(State(state): State<Arc<AppState>>) -> CribResult<Json<DashboardSummary>> {
    Ok(Json(state.dashboard.summary().await?))
}
