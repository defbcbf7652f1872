//! Billing DTOs.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::Bill;

/// Request to generate rent bills for one period.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateBillsRequest {
    /// Target period, `YYYY-MM`.
    #[validate(length(equal = 7, message = "period_key must be YYYY-MM"))]
    pub period_key: String,
    /// Due date stamped on every generated bill.
    pub due_date: NaiveDate,
    /// Explicit tenant selection; omitted bills every tenant with an active
    /// lease.
    pub tenant_ids: Option<Vec<Uuid>>,
    /// Explicit "now"; defaults to today. Lease active-ness and the generated
    /// date key off this.
    pub as_of: Option<NaiveDate>,
    pub actor_id: Option<Uuid>,
}

/// Outcome of a bill-generation run.
#[derive(Debug, Serialize)]
pub struct GenerateBillsResponse {
    pub period_key: String,
    pub bills_created: usize,
    pub skipped_tenant_ids: Vec<Uuid>,
    pub total_amount_billed: Decimal,
    pub bills: Vec<Bill>,
}

/// Query params for listing bills.
#[derive(Debug, Deserialize)]
pub struct ListBillsQuery {
    pub tenant_id: Option<Uuid>,
    pub period_key: Option<String>,
    pub status: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Query params carrying an explicit as-of date.
#[derive(Debug, Deserialize)]
pub struct AsOfQuery {
    pub as_of: Option<NaiveDate>,
}

fn default_limit() -> i64 {
    100
}
