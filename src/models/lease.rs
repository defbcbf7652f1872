//! Lease model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Contractual binding of a tenant to an apartment for a date range at a
/// given monthly rent. No two leases for the same apartment may overlap.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lease {
    pub lease_id: Uuid,
    pub tenant_id: Uuid,
    pub apartment_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub deposit: Decimal,
    pub late_fee_rate: Option<Decimal>,
    pub created_utc: DateTime<Utc>,
}

/// Input for creating a lease.
#[derive(Debug, Clone)]
pub struct CreateLease {
    pub tenant_id: Uuid,
    pub apartment_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub deposit: Decimal,
    pub late_fee_rate: Option<Decimal>,
}
