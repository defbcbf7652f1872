//! Bill generation and bill query handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{GenerateBillsRequest, GenerateBillsResponse, ListBillsQuery};
use crate::error::AppError;
use crate::models::{BillStatus, GenerateBills, ListBillsFilter};
use crate::startup::AppState;

/// Generate rent bills for a billing period.
///
/// POST /billing/generate
#[tracing::instrument(skip(state, payload), fields(period_key = %payload.period_key))]
pub async fn generate_bills(
    State(state): State<AppState>,
    Json(payload): Json<GenerateBillsRequest>,
) -> Result<(StatusCode, Json<GenerateBillsResponse>), AppError> {
    payload.validate()?;

    let as_of = payload.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let input = GenerateBills {
        period_key: payload.period_key,
        due_date: payload.due_date,
        tenant_ids: payload.tenant_ids,
        as_of,
        actor_id: payload.actor_id,
    };

    let outcome = state.db.generate_bills(&input).await?;

    state
        .events
        .publish(
            "bills_generated",
            json!({
                "period_key": outcome.period_key,
                "bills_created": outcome.bills_created.len(),
                "total_amount_billed": outcome.total_amount_billed,
            }),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(GenerateBillsResponse {
            period_key: outcome.period_key,
            bills_created: outcome.bills_created.len(),
            skipped_tenant_ids: outcome.skipped_tenant_ids,
            total_amount_billed: outcome.total_amount_billed,
            bills: outcome.bills_created,
        }),
    ))
}

/// List billing periods.
///
/// GET /billing/periods
#[tracing::instrument(skip(state))]
pub async fn list_periods(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let periods = state.db.list_periods(100).await?;
    Ok(Json(json!({ "periods": periods })))
}

/// List bills with optional filters.
///
/// GET /bills
#[tracing::instrument(skip(state))]
pub async fn list_bills(
    State(state): State<AppState>,
    Query(query): Query<ListBillsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(BillStatus::from_str(s).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Unknown bill status '{}'", s))
        })?),
        None => None,
    };

    let filter = ListBillsFilter {
        tenant_id: query.tenant_id,
        period_key: query.period_key,
        status,
        limit: query.limit,
    };
    let bills = state.db.list_bills(&filter).await?;
    Ok(Json(json!({ "bills": bills })))
}

/// Get one bill.
///
/// GET /bills/{bill_id}
#[tracing::instrument(skip(state), fields(bill_id = %bill_id))]
pub async fn get_bill(
    State(state): State<AppState>,
    Path(bill_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let bill = state
        .db
        .get_bill(bill_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Bill not found")))?;
    Ok(Json(json!({ "bill": bill })))
}

/// Delete a bill that has no recorded payments.
///
/// DELETE /bills/{bill_id}
#[tracing::instrument(skip(state), fields(bill_id = %bill_id))]
pub async fn delete_bill(
    State(state): State<AppState>,
    Path(bill_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.db.delete_bill(bill_id, None).await?;
    Ok(StatusCode::NO_CONTENT)
}
