//! Bill model and bill-generation types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Bill settlement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Unpaid,
    Partial,
    Paid,
}

impl BillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Unpaid => "unpaid",
            BillStatus::Partial => "partial",
            BillStatus::Paid => "paid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(BillStatus::Unpaid),
            "partial" => Some(BillStatus::Partial),
            "paid" => Some(BillStatus::Paid),
            _ => None,
        }
    }
}

/// Bill type. Late fees chain to the rent bill they penalize via
/// `parent_bill_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillType {
    Rent,
    LateFee,
    Other,
}

impl BillType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillType::Rent => "rent",
            BillType::LateFee => "late_fee",
            BillType::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "rent" => Some(BillType::Rent),
            "late_fee" => Some(BillType::LateFee),
            "other" => Some(BillType::Other),
            _ => None,
        }
    }
}

/// One charge instance for one tenant for one billing period.
///
/// `amount_paid` is a cached projection of the allocation ledger; every
/// transaction that allocates against a bill recomputes it from
/// `payment_allocations` before trusting it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bill {
    pub bill_id: Uuid,
    pub tenant_id: Uuid,
    pub apartment_id: Uuid,
    pub lease_id: Uuid,
    pub period_id: Uuid,
    pub bill_type: String,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
    pub status: String,
    pub due_date: NaiveDate,
    pub generated_date: NaiveDate,
    pub settled_date: Option<NaiveDate>,
    pub parent_bill_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
}

/// Input for a bill-generation run.
#[derive(Debug, Clone)]
pub struct GenerateBills {
    /// Target period key, `YYYY-MM`.
    pub period_key: String,
    /// Due date assigned to every generated bill.
    pub due_date: NaiveDate,
    /// Explicit tenant selection; `None` bills every tenant with a lease
    /// active as of `as_of`.
    pub tenant_ids: Option<Vec<Uuid>>,
    /// Explicit "now" for lease active-ness and the generated date.
    pub as_of: NaiveDate,
    pub actor_id: Option<Uuid>,
}

/// Outcome of a bill-generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateBillsOutcome {
    pub period_key: String,
    pub bills_created: Vec<Bill>,
    pub skipped_tenant_ids: Vec<Uuid>,
    pub total_amount_billed: Decimal,
}

/// Filter parameters for listing bills.
#[derive(Debug, Clone, Default)]
pub struct ListBillsFilter {
    pub tenant_id: Option<Uuid>,
    pub period_key: Option<String>,
    pub status: Option<BillStatus>,
    pub limit: i64,
}
