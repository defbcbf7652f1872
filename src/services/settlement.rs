//! Settlement planning: the pure core of payment allocation.
//!
//! Given a tenant's outstanding bills (balances recomputed from the
//! allocation ledger) and a payment amount, the planner decides how the
//! payment is split across bills, earliest due date first. It performs no
//! I/O; the database layer executes the resulting plan inside one
//! transaction. Every time-sensitive decision takes an explicit as-of date,
//! so the same inputs always produce the same plan.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::BillStatus;

/// Maximum unallocatable remainder a payment may carry before it is rejected
/// as an over-allocation. Covers rounding differences between a recorded
/// amount and the ledger's outstanding sum.
pub fn allocation_tolerance() -> Decimal {
    Decimal::new(1, 2) // 0.01
}

/// A bill as seen by the planner. `amount_settled` must come from
/// `SUM(payment_allocations.amount_applied)`, not the cached column.
#[derive(Debug, Clone)]
pub struct OutstandingBill {
    pub bill_id: Uuid,
    pub due_date: NaiveDate,
    pub amount_due: Decimal,
    pub amount_settled: Decimal,
}

impl OutstandingBill {
    pub fn remaining(&self) -> Decimal {
        let remaining = self.amount_due - self.amount_settled;
        if remaining < Decimal::ZERO {
            Decimal::ZERO
        } else {
            remaining
        }
    }
}

/// One planned allocation against one bill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAllocation {
    pub bill_id: Uuid,
    pub amount: Decimal,
    /// The bill's paid amount after this allocation.
    pub new_amount_paid: Decimal,
    pub new_status: BillStatus,
    /// True when this allocation brings the bill to full settlement. The
    /// settled date is set only on this transition, never overwritten.
    pub settles_bill: bool,
}

/// The full plan for one payment.
#[derive(Debug, Clone)]
pub struct SettlementPlan {
    pub allocations: Vec<PlannedAllocation>,
    pub amount_allocated: Decimal,
    /// Unallocated remainder, always within tolerance.
    pub leftover: Decimal,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettlementError {
    #[error("Payment amount must be positive")]
    NonPositiveAmount,

    #[error("Selected bills have no outstanding balance")]
    NothingOutstanding,

    #[error(
        "Payment of {requested} exceeds the outstanding balance of {outstanding} for the selected bills"
    )]
    OverAllocation {
        requested: Decimal,
        outstanding: Decimal,
    },
}

/// Plan the distribution of `amount` across `bills`, oldest due date first.
///
/// Bills are walked in ascending due-date order (ties broken by bill id so
/// the walk is deterministic); each bill absorbs
/// `min(amount_left, remaining)`. Fully settled bills absorb nothing. A
/// remainder above `tolerance` fails the whole plan; nothing is partially
/// applied because the caller only persists a returned plan.
pub fn plan_settlement(
    bills: &[OutstandingBill],
    amount: Decimal,
    tolerance: Decimal,
) -> Result<SettlementPlan, SettlementError> {
    if amount <= Decimal::ZERO {
        return Err(SettlementError::NonPositiveAmount);
    }

    let mut ordered: Vec<&OutstandingBill> = bills.iter().collect();
    ordered.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.bill_id.cmp(&b.bill_id))
    });

    let outstanding: Decimal = ordered.iter().map(|b| b.remaining()).sum();
    if outstanding <= Decimal::ZERO {
        return Err(SettlementError::NothingOutstanding);
    }

    let mut left = amount;
    let mut allocations = Vec::new();

    for bill in ordered {
        if left <= Decimal::ZERO {
            break;
        }
        let remaining = bill.remaining();
        if remaining <= Decimal::ZERO {
            continue;
        }

        let apply = if left < remaining { left } else { remaining };
        let new_amount_paid = bill.amount_settled + apply;
        let fully_settled = new_amount_paid >= bill.amount_due;

        allocations.push(PlannedAllocation {
            bill_id: bill.bill_id,
            amount: apply,
            new_amount_paid,
            new_status: if fully_settled {
                BillStatus::Paid
            } else {
                BillStatus::Partial
            },
            settles_bill: fully_settled,
        });

        left -= apply;
    }

    if left > tolerance {
        return Err(SettlementError::OverAllocation {
            requested: amount,
            outstanding,
        });
    }

    Ok(SettlementPlan {
        amount_allocated: amount - left,
        allocations,
        leftover: left,
    })
}

/// Bill status as a function of amounts alone.
pub fn derive_bill_status(amount_due: Decimal, amount_paid: Decimal) -> BillStatus {
    if amount_paid >= amount_due {
        BillStatus::Paid
    } else if amount_paid > Decimal::ZERO {
        BillStatus::Partial
    } else {
        BillStatus::Unpaid
    }
}

/// A tenant's overall payment state. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantPaymentState {
    Overdue,
    Paid,
    Partial,
    Unpaid,
}

impl TenantPaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantPaymentState::Overdue => "overdue",
            TenantPaymentState::Paid => "paid",
            TenantPaymentState::Partial => "partial",
            TenantPaymentState::Unpaid => "unpaid",
        }
    }
}

/// Derive a tenant's overall payment state from their bill set.
///
/// Precedence: any not-fully-settled bill past its due date makes the tenant
/// `Overdue`; otherwise a non-empty, fully settled bill set is `Paid`; any
/// partial settlement is `Partial`; everything else (including an empty bill
/// set) is `Unpaid`. Pure function of (bills, as_of).
pub fn derive_tenant_payment_state(
    bills: &[OutstandingBill],
    as_of: NaiveDate,
) -> TenantPaymentState {
    let any_overdue = bills
        .iter()
        .any(|b| b.remaining() > Decimal::ZERO && b.due_date < as_of);
    if any_overdue {
        return TenantPaymentState::Overdue;
    }

    if !bills.is_empty() && bills.iter().all(|b| b.remaining() <= Decimal::ZERO) {
        return TenantPaymentState::Paid;
    }

    if bills
        .iter()
        .any(|b| b.amount_settled > Decimal::ZERO && b.remaining() > Decimal::ZERO)
    {
        return TenantPaymentState::Partial;
    }

    TenantPaymentState::Unpaid
}
