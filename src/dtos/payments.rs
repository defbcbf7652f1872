//! Payment DTOs.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::PaymentMethod;
use crate::services::settlement::TenantPaymentState;

/// Request to record one payment.
#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub tenant_id: Uuid,
    pub amount: Decimal,
    pub settlement_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub reference_number: Option<String>,
    /// Allocate against this bill only; omitted pays down the
    /// oldest-outstanding queue.
    pub bill_id: Option<Uuid>,
    /// Explicit "now"; defaults to today. Future settlement dates are
    /// rejected against this.
    pub as_of: Option<NaiveDate>,
    pub actor_id: Option<Uuid>,
}

/// Query params for listing invoices.
#[derive(Debug, Deserialize)]
pub struct ListInvoicesQuery {
    pub tenant_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Query params for the overdue-tenants report.
#[derive(Debug, Deserialize)]
pub struct OverdueTenantsQuery {
    pub as_of: Option<NaiveDate>,
    #[serde(default = "default_overdue_limit")]
    pub limit: i64,
}

/// A tenant's derived payment state.
#[derive(Debug, Serialize)]
pub struct TenantPaymentStateResponse {
    pub tenant_id: Uuid,
    pub as_of: NaiveDate,
    pub state: TenantPaymentState,
}

fn default_limit() -> i64 {
    100
}

fn default_overdue_limit() -> i64 {
    10
}
