//! Domain models for rentroll-service.

mod bill;
mod invoice;
mod lease;
mod period;
mod tenant;

pub use bill::{
    Bill, BillStatus, BillType, GenerateBills, GenerateBillsOutcome, ListBillsFilter,
};
pub use invoice::{
    Invoice, ListInvoicesFilter, PaymentAllocation, PaymentMethod, PaymentTarget, RecordPayment,
    RecordPaymentOutcome,
};
pub use lease::{CreateLease, Lease};
pub use period::BillingPeriod;
pub use tenant::{Apartment, CreateApartment, CreateTenant, Tenant, TenantStatus};
