//! Tenant, apartment, and lease handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{CreateApartmentRequest, CreateLeaseRequest, CreateTenantRequest, ListQuery};
use crate::error::AppError;
use crate::models::{CreateApartment, CreateLease, CreateTenant, TenantStatus};
use crate::startup::AppState;

/// Create a tenant.
///
/// POST /tenants
#[tracing::instrument(skip(state, payload))]
pub async fn create_tenant(
    State(state): State<AppState>,
    Json(payload): Json<CreateTenantRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    payload.validate()?;

    let input = CreateTenant {
        full_name: payload.full_name,
        email: payload.email,
        phone: payload.phone,
        status: payload.status.unwrap_or(TenantStatus::Active),
    };
    let tenant = state.db.create_tenant(&input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "tenant": tenant }))))
}

/// Get one tenant.
///
/// GET /tenants/{tenant_id}
#[tracing::instrument(skip(state), fields(tenant_id = %tenant_id))]
pub async fn get_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tenant = state
        .db
        .get_tenant(tenant_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Tenant not found")))?;
    Ok(Json(json!({ "tenant": tenant })))
}

/// List tenants.
///
/// GET /tenants
#[tracing::instrument(skip(state))]
pub async fn list_tenants(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let status = match query.status.as_deref() {
        Some(s) => Some(TenantStatus::from_str(s).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Unknown tenant status '{}'", s))
        })?),
        None => None,
    };
    let tenants = state.db.list_tenants(status, query.limit).await?;
    Ok(Json(json!({ "tenants": tenants })))
}

/// Remove a tenant. Refused while the tenant has an unpaid balance or an
/// active lease.
///
/// DELETE /tenants/{tenant_id}
#[tracing::instrument(skip(state), fields(tenant_id = %tenant_id))]
pub async fn delete_tenant(
    State(state): State<AppState>,
    Path(tenant_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let as_of = Utc::now().date_naive();
    let removal = state.db.delete_tenant(tenant_id, as_of, None).await?;
    Ok(Json(json!({ "tenant_id": tenant_id, "outcome": removal })))
}

/// Create an apartment.
///
/// POST /apartments
#[tracing::instrument(skip(state, payload))]
pub async fn create_apartment(
    State(state): State<AppState>,
    Json(payload): Json<CreateApartmentRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    payload.validate()?;

    let input = CreateApartment {
        unit_label: payload.unit_label,
        floor: payload.floor,
        monthly_rent_default: payload.monthly_rent_default,
    };
    let apartment = state.db.create_apartment(&input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "apartment": apartment }))))
}

/// List apartments.
///
/// GET /apartments
#[tracing::instrument(skip(state))]
pub async fn list_apartments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let apartments = state.db.list_apartments(query.limit).await?;
    Ok(Json(json!({ "apartments": apartments })))
}

/// Create a lease.
///
/// POST /leases
#[tracing::instrument(skip(state, payload), fields(tenant_id = %payload.tenant_id))]
pub async fn create_lease(
    State(state): State<AppState>,
    Json(payload): Json<CreateLeaseRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let input = CreateLease {
        tenant_id: payload.tenant_id,
        apartment_id: payload.apartment_id,
        start_date: payload.start_date,
        end_date: payload.end_date,
        monthly_rent: payload.monthly_rent,
        deposit: payload.deposit.unwrap_or(Decimal::ZERO),
        late_fee_rate: payload.late_fee_rate,
    };
    let lease = state.db.create_lease(&input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "lease": lease }))))
}

/// List leases.
///
/// GET /leases
#[tracing::instrument(skip(state))]
pub async fn list_leases(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let leases = state.db.list_leases(query.tenant_id, query.limit).await?;
    Ok(Json(json!({ "leases": leases })))
}
