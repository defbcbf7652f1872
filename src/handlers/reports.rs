//! Reporting handlers. Read-only consumers of the ledger.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde_json::json;

use crate::dtos::{AsOfQuery, OverdueTenantsQuery};
use crate::error::AppError;
use crate::startup::AppState;

/// Totals billed/collected/outstanding and collection efficiency.
///
/// GET /reports/collection-summary
#[tracing::instrument(skip(state))]
pub async fn collection_summary(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let summary = state.db.collection_summary().await?;
    Ok(Json(json!({ "summary": summary })))
}

/// Outstanding balances bucketed by days past due.
///
/// GET /reports/aging
#[tracing::instrument(skip(state))]
pub async fn aging_report(
    State(state): State<AppState>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let report = state.db.aging_report(as_of).await?;
    Ok(Json(json!({ "as_of": as_of, "aging": report })))
}

/// Top tenants by overdue balance.
///
/// GET /reports/overdue-tenants
#[tracing::instrument(skip(state))]
pub async fn overdue_tenants(
    State(state): State<AppState>,
    Query(query): Query<OverdueTenantsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let tenants = state.db.overdue_tenants(as_of, query.limit).await?;
    Ok(Json(json!({ "as_of": as_of, "overdue_tenants": tenants })))
}
