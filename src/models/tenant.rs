//! Tenant and apartment models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Tenant status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Inactive,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(TenantStatus::Active),
            "inactive" => Some(TenantStatus::Inactive),
            _ => None,
        }
    }
}

/// Tenant identity. A tenant owes rent only through a lease.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tenant {
    pub tenant_id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a tenant.
#[derive(Debug, Clone)]
pub struct CreateTenant {
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: TenantStatus,
}

/// Apartment unit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Apartment {
    pub apartment_id: Uuid,
    pub unit_label: String,
    pub floor: Option<i32>,
    pub monthly_rent_default: Option<Decimal>,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating an apartment.
#[derive(Debug, Clone)]
pub struct CreateApartment {
    pub unit_label: String,
    pub floor: Option<i32>,
    pub monthly_rent_default: Option<Decimal>,
}
