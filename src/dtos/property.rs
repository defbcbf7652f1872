//! Tenant, apartment, and lease DTOs.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::models::TenantStatus;

/// Request to create a tenant.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTenantRequest {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub status: Option<TenantStatus>,
}

/// Request to create an apartment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateApartmentRequest {
    #[validate(length(min = 1, max = 32))]
    pub unit_label: String,
    pub floor: Option<i32>,
    pub monthly_rent_default: Option<Decimal>,
}

/// Request to create a lease.
#[derive(Debug, Deserialize)]
pub struct CreateLeaseRequest {
    pub tenant_id: Uuid,
    pub apartment_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub deposit: Option<Decimal>,
    pub late_fee_rate: Option<Decimal>,
}

/// Generic list query with a clamped limit.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub tenant_id: Option<Uuid>,
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}
