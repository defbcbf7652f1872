//! Request/response types for the HTTP surface.

mod billing;
mod payments;
mod property;

pub use billing::{AsOfQuery, GenerateBillsRequest, GenerateBillsResponse, ListBillsQuery};
pub use payments::{
    ListInvoicesQuery, OverdueTenantsQuery, RecordPaymentRequest, TenantPaymentStateResponse,
};
pub use property::{CreateApartmentRequest, CreateLeaseRequest, CreateTenantRequest, ListQuery};
