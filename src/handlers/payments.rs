//! Payment recording and invoice query handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::dtos::{
    AsOfQuery, ListInvoicesQuery, RecordPaymentRequest, TenantPaymentStateResponse,
};
use crate::error::AppError;
use crate::models::{ListInvoicesFilter, PaymentTarget, RecordPayment};
use crate::startup::AppState;

/// Record a payment and allocate it across outstanding bills.
///
/// POST /payments
#[tracing::instrument(skip(state, payload), fields(tenant_id = %payload.tenant_id, amount = %payload.amount))]
pub async fn record_payment(
    State(state): State<AppState>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let as_of = payload.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let input = RecordPayment {
        tenant_id: payload.tenant_id,
        amount: payload.amount,
        settlement_date: payload.settlement_date,
        payment_method: payload.payment_method,
        reference_number: payload.reference_number,
        target: match payload.bill_id {
            Some(bill_id) => PaymentTarget::Bill(bill_id),
            None => PaymentTarget::OldestOutstanding,
        },
        as_of,
        actor_id: payload.actor_id,
    };

    let outcome = state.db.record_payment(&input).await?;

    state
        .events
        .publish(
            "payment_recorded",
            json!({
                "invoice_id": outcome.invoice.invoice_id,
                "tenant_id": outcome.invoice.tenant_id,
                "amount": outcome.invoice.amount,
                "payment_method": outcome.invoice.payment_method,
                "bills_settled": outcome.bills_settled,
            }),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "invoice": outcome.invoice,
            "allocations": outcome.allocations,
            "bills_settled": outcome.bills_settled,
            "bills_partially_settled": outcome.bills_partially_settled,
        })),
    ))
}

/// List invoices with optional filters.
///
/// GET /invoices
#[tracing::instrument(skip(state))]
pub async fn list_invoices(
    State(state): State<AppState>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let filter = ListInvoicesFilter {
        tenant_id: query.tenant_id,
        start_date: query.start_date,
        end_date: query.end_date,
        limit: query.limit,
    };
    let invoices = state.db.list_invoices(&filter).await?;
    Ok(Json(json!({ "invoices": invoices })))
}

/// Get one invoice with its allocations.
///
/// GET /invoices/{invoice_id}
#[tracing::instrument(skip(state), fields(invoice_id = %invoice_id))]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let invoice = state
        .db
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
    let allocations = state.db.list_allocations(invoice_id).await?;
    Ok(Json(json!({ "invoice": invoice, "allocations": allocations })))
}

/// Derive a tenant's overall payment state.
///
/// GET /tenants/{tenant_id}/payment-state
#[tracing::instrument(skip(state), fields(tenant_id = %tenant_id))]
pub async fn tenant_payment_state(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<TenantPaymentStateResponse>, AppError> {
    state
        .db
        .get_tenant(tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Tenant not found")))?;

    let as_of = query.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let payment_state = state.db.tenant_payment_state(tenant_id, as_of).await?;

    Ok(Json(TenantPaymentStateResponse {
        tenant_id,
        as_of,
        state: payment_state,
    }))
}
