//! Invoice (payment event) and allocation models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    MobileMoney,
    Cheque,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::MobileMoney => "mobile_money",
            PaymentMethod::Cheque => "cheque",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "bank_transfer" => Some(PaymentMethod::BankTransfer),
            "card" => Some(PaymentMethod::Card),
            "mobile_money" => Some(PaymentMethod::MobileMoney),
            "cheque" => Some(PaymentMethod::Cheque),
            _ => None,
        }
    }
}

/// One payment transaction. Append-only: an invoice is never mutated after
/// the recording transaction commits.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub invoice_id: Uuid,
    pub tenant_id: Uuid,
    pub amount: Decimal,
    pub payment_method: String,
    pub reference_number: Option<String>,
    pub settlement_date: NaiveDate,
    pub created_utc: DateTime<Utc>,
}

/// The amount of one invoice applied to one specific bill. Append-only; the
/// sum of a bill's allocations is the authoritative paid amount.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentAllocation {
    pub allocation_id: Uuid,
    pub invoice_id: Uuid,
    pub bill_id: Uuid,
    pub amount_applied: Decimal,
    pub created_utc: DateTime<Utc>,
}

/// Allocation scope for a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTarget {
    /// Allocate against this one bill only.
    Bill(Uuid),
    /// Allocate across all outstanding bills, earliest due date first.
    OldestOutstanding,
}

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct RecordPayment {
    pub tenant_id: Uuid,
    pub amount: Decimal,
    pub settlement_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub reference_number: Option<String>,
    pub target: PaymentTarget,
    /// Explicit "now" for the future-settlement-date check.
    pub as_of: NaiveDate,
    pub actor_id: Option<Uuid>,
}

/// Outcome of recording a payment.
#[derive(Debug, Clone, Serialize)]
pub struct RecordPaymentOutcome {
    pub invoice: Invoice,
    pub allocations: Vec<PaymentAllocation>,
    pub bills_settled: u32,
    pub bills_partially_settled: u32,
}

/// Filter parameters for listing invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub tenant_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: i64,
}
