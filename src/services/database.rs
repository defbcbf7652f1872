//! Database service for rentroll-service.
//!
//! Owns the connection pool and every query. The bill generator and the
//! payment allocator run as single transactions: state that decides
//! idempotence or money (already-billed tenant sets, allocation sums) is
//! re-read after the transaction begins, never carried in from outside it.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    Apartment, Bill, BillStatus, BillType, BillingPeriod, CreateApartment, CreateLease,
    CreateTenant, GenerateBills, GenerateBillsOutcome, Invoice, Lease, ListBillsFilter,
    ListInvoicesFilter, PaymentAllocation, PaymentTarget, RecordPayment, RecordPaymentOutcome,
    Tenant, TenantStatus,
};
use crate::services::audit::{record_audit, AuditEvent, ListAuditEventsFilter};
use crate::services::metrics::{
    BILLED_AMOUNT_TOTAL, BILLS_TOTAL, DB_QUERY_DURATION, INVOICES_TOTAL, PAYMENT_AMOUNT_TOTAL,
};
use crate::services::settlement::{
    allocation_tolerance, derive_tenant_payment_state, plan_settlement, OutstandingBill,
    SettlementError, TenantPaymentState,
};

const TENANT_COLUMNS: &str = "tenant_id, full_name, email, phone, status, created_utc";
const APARTMENT_COLUMNS: &str = "apartment_id, unit_label, floor, monthly_rent_default, created_utc";
const LEASE_COLUMNS: &str =
    "lease_id, tenant_id, apartment_id, start_date, end_date, monthly_rent, deposit, late_fee_rate, created_utc";
const PERIOD_COLUMNS: &str = "period_id, period_key, month_name, year, created_utc";
const BILL_COLUMNS: &str = "bill_id, tenant_id, apartment_id, lease_id, period_id, bill_type, amount_due, amount_paid, status, due_date, generated_date, settled_date, parent_bill_id, created_utc";
const INVOICE_COLUMNS: &str =
    "invoice_id, tenant_id, amount, payment_method, reference_number, settlement_date, created_utc";
const ALLOCATION_COLUMNS: &str =
    "allocation_id, invoice_id, bill_id, amount_applied, created_utc";

/// Totals billed/collected/outstanding and collection efficiency.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionSummary {
    pub total_billed: Decimal,
    pub total_collected: Decimal,
    pub total_outstanding: Decimal,
    /// Collected / billed, percent, two decimals. Zero when nothing billed.
    pub collection_efficiency_pct: Decimal,
}

/// Outstanding balances bucketed by days past due.
#[derive(Debug, Clone, Serialize)]
pub struct AgingReport {
    /// Outstanding on bills not yet due.
    pub current: Decimal,
    pub days_1_30: Decimal,
    pub days_31_60: Decimal,
    pub days_61_90: Decimal,
    pub days_over_90: Decimal,
}

/// One row of the top-overdue-tenants report.
#[derive(Debug, Clone, Serialize)]
pub struct OverdueTenant {
    pub tenant_id: Uuid,
    pub full_name: String,
    pub overdue_amount: Decimal,
    pub oldest_due_date: NaiveDate,
}

/// What happened to a tenant on deletion: ledger history forces a
/// deactivate-in-place instead of a hard delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantRemoval {
    Deleted,
    Deactivated,
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "rentroll-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Tenant Operations
    // -------------------------------------------------------------------------

    /// Create a new tenant.
    #[instrument(skip(self, input))]
    pub async fn create_tenant(&self, input: &CreateTenant) -> Result<Tenant, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_tenant"])
            .start_timer();

        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            r#"
            INSERT INTO tenants (tenant_id, full_name, email, phone, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TENANT_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(&input.full_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create tenant: {}", e)))?;

        timer.observe_duration();

        info!(tenant_id = %tenant.tenant_id, "Tenant created");

        Ok(tenant)
    }

    /// Get a tenant by ID.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn get_tenant(&self, tenant_id: Uuid) -> Result<Option<Tenant>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_tenant"])
            .start_timer();

        let tenant = sqlx::query_as::<_, Tenant>(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants WHERE tenant_id = $1",
        ))
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get tenant: {}", e)))?;

        timer.observe_duration();

        Ok(tenant)
    }

    /// List tenants, optionally by status.
    #[instrument(skip(self))]
    pub async fn list_tenants(
        &self,
        status: Option<TenantStatus>,
        limit: i64,
    ) -> Result<Vec<Tenant>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_tenants"])
            .start_timer();

        let tenants = sqlx::query_as::<_, Tenant>(&format!(
            r#"
            SELECT {TENANT_COLUMNS}
            FROM tenants
            WHERE ($1::varchar IS NULL OR status = $1)
            ORDER BY full_name
            LIMIT $2
            "#,
        ))
        .bind(status.map(|s| s.as_str().to_string()))
        .bind(limit.clamp(1, 1000))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list tenants: {}", e)))?;

        timer.observe_duration();

        Ok(tenants)
    }

    /// Remove a tenant.
    ///
    /// Refused while the tenant has an unpaid balance or a lease active as of
    /// `as_of`. A tenant that passes the guards but carries ledger history
    /// (bills or invoices) is deactivated in place rather than deleted, so
    /// settled bills stay attributable.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn delete_tenant(
        &self,
        tenant_id: Uuid,
        as_of: NaiveDate,
        actor_id: Option<Uuid>,
    ) -> Result<TenantRemoval, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_tenant"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT tenant_id FROM tenants WHERE tenant_id = $1 FOR UPDATE")
                .bind(tenant_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to get tenant: {}", e))
                })?;
        if exists.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!("Tenant not found")));
        }

        let has_active_lease: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM leases WHERE tenant_id = $1 AND end_date >= $2)",
        )
        .bind(tenant_id)
        .bind(as_of)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to check leases: {}", e)))?;

        if has_active_lease {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Tenant has an active lease and cannot be removed"
            )));
        }

        let has_unpaid_balance: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM bills b
                LEFT JOIN (
                    SELECT bill_id, SUM(amount_applied) AS paid
                    FROM payment_allocations
                    GROUP BY bill_id
                ) a ON a.bill_id = b.bill_id
                WHERE b.tenant_id = $1 AND b.amount_due > COALESCE(a.paid, 0)
            )
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to check bills: {}", e)))?;

        if has_unpaid_balance {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Tenant has bills with an unpaid balance and cannot be removed"
            )));
        }

        let has_ledger_history: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM bills WHERE tenant_id = $1)
                OR EXISTS(SELECT 1 FROM invoices WHERE tenant_id = $1)
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to check history: {}", e)))?;

        let removal = if has_ledger_history {
            sqlx::query("UPDATE tenants SET status = 'inactive' WHERE tenant_id = $1")
                .bind(tenant_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to deactivate tenant: {}", e))
                })?;
            TenantRemoval::Deactivated
        } else {
            sqlx::query("DELETE FROM leases WHERE tenant_id = $1")
                .bind(tenant_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to delete leases: {}", e))
                })?;
            sqlx::query("DELETE FROM tenants WHERE tenant_id = $1")
                .bind(tenant_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to delete tenant: {}", e))
                })?;
            TenantRemoval::Deleted
        };

        let detail = match removal {
            TenantRemoval::Deleted => "Tenant deleted",
            TenantRemoval::Deactivated => "Tenant deactivated (ledger history retained)",
        };
        record_audit(
            &mut *tx,
            "delete_tenant",
            "tenant",
            Some(tenant_id),
            actor_id,
            detail,
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(tenant_id = %tenant_id, outcome = ?removal, "Tenant removed");

        Ok(removal)
    }

    // -------------------------------------------------------------------------
    // Apartment Operations
    // -------------------------------------------------------------------------

    /// Create a new apartment.
    #[instrument(skip(self, input))]
    pub async fn create_apartment(&self, input: &CreateApartment) -> Result<Apartment, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_apartment"])
            .start_timer();

        let apartment = sqlx::query_as::<_, Apartment>(&format!(
            r#"
            INSERT INTO apartments (apartment_id, unit_label, floor, monthly_rent_default)
            VALUES ($1, $2, $3, $4)
            RETURNING {APARTMENT_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(&input.unit_label)
        .bind(input.floor)
        .bind(input.monthly_rent_default)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Apartment unit '{}' already exists",
                    input.unit_label
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create apartment: {}", e)),
        })?;

        timer.observe_duration();

        info!(apartment_id = %apartment.apartment_id, unit = %apartment.unit_label, "Apartment created");

        Ok(apartment)
    }

    /// Get an apartment by ID.
    #[instrument(skip(self), fields(apartment_id = %apartment_id))]
    pub async fn get_apartment(&self, apartment_id: Uuid) -> Result<Option<Apartment>, AppError> {
        let apartment = sqlx::query_as::<_, Apartment>(&format!(
            "SELECT {APARTMENT_COLUMNS} FROM apartments WHERE apartment_id = $1",
        ))
        .bind(apartment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get apartment: {}", e)))?;

        Ok(apartment)
    }

    /// List apartments.
    #[instrument(skip(self))]
    pub async fn list_apartments(&self, limit: i64) -> Result<Vec<Apartment>, AppError> {
        let apartments = sqlx::query_as::<_, Apartment>(&format!(
            "SELECT {APARTMENT_COLUMNS} FROM apartments ORDER BY unit_label LIMIT $1",
        ))
        .bind(limit.clamp(1, 1000))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list apartments: {}", e)))?;

        Ok(apartments)
    }

    // -------------------------------------------------------------------------
    // Lease Operations
    // -------------------------------------------------------------------------

    /// Create a lease. Rejects overlapping leases on the same apartment; the
    /// overlap check runs inside the insert transaction so a concurrent
    /// request cannot slip a second lease into the same date range unseen.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, apartment_id = %input.apartment_id))]
    pub async fn create_lease(&self, input: &CreateLease) -> Result<Lease, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_lease"])
            .start_timer();

        if input.end_date < input.start_date {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Lease end date {} is before start date {}",
                input.end_date,
                input.start_date
            )));
        }
        if input.monthly_rent <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Monthly rent must be positive"
            )));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let tenant_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tenants WHERE tenant_id = $1)")
                .bind(input.tenant_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to check tenant: {}", e))
                })?;
        if !tenant_exists {
            return Err(AppError::NotFound(anyhow::anyhow!("Tenant not found")));
        }

        let apartment_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM apartments WHERE apartment_id = $1)")
                .bind(input.apartment_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to check apartment: {}", e))
                })?;
        if !apartment_exists {
            return Err(AppError::NotFound(anyhow::anyhow!("Apartment not found")));
        }

        let overlaps: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM leases
                WHERE apartment_id = $1 AND start_date <= $3 AND end_date >= $2
            )
            "#,
        )
        .bind(input.apartment_id)
        .bind(input.start_date)
        .bind(input.end_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to check overlap: {}", e)))?;

        if overlaps {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Apartment already has a lease overlapping {} to {}",
                input.start_date,
                input.end_date
            )));
        }

        let lease = sqlx::query_as::<_, Lease>(&format!(
            r#"
            INSERT INTO leases (lease_id, tenant_id, apartment_id, start_date, end_date, monthly_rent, deposit, late_fee_rate)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {LEASE_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(input.tenant_id)
        .bind(input.apartment_id)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(input.monthly_rent)
        .bind(input.deposit)
        .bind(input.late_fee_rate)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create lease: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(lease_id = %lease.lease_id, "Lease created");

        Ok(lease)
    }

    /// Get a lease by ID.
    #[instrument(skip(self), fields(lease_id = %lease_id))]
    pub async fn get_lease(&self, lease_id: Uuid) -> Result<Option<Lease>, AppError> {
        let lease = sqlx::query_as::<_, Lease>(&format!(
            "SELECT {LEASE_COLUMNS} FROM leases WHERE lease_id = $1",
        ))
        .bind(lease_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get lease: {}", e)))?;

        Ok(lease)
    }

    /// List leases, optionally for one tenant.
    #[instrument(skip(self))]
    pub async fn list_leases(
        &self,
        tenant_id: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<Lease>, AppError> {
        let leases = sqlx::query_as::<_, Lease>(&format!(
            r#"
            SELECT {LEASE_COLUMNS}
            FROM leases
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
            ORDER BY start_date DESC
            LIMIT $2
            "#,
        ))
        .bind(tenant_id)
        .bind(limit.clamp(1, 1000))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list leases: {}", e)))?;

        Ok(leases)
    }

    // -------------------------------------------------------------------------
    // Billing Period Operations
    // -------------------------------------------------------------------------

    /// Look up or create the billing period for `period_key` inside the
    /// caller's transaction. A concurrent creator is resolved by
    /// `ON CONFLICT DO NOTHING` plus a re-read, never surfaced as an error.
    async fn get_or_create_period(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        period_key: &str,
        month_name: &str,
        year: i32,
    ) -> Result<BillingPeriod, AppError> {
        let existing = sqlx::query_as::<_, BillingPeriod>(&format!(
            "SELECT {PERIOD_COLUMNS} FROM billing_periods WHERE period_key = $1",
        ))
        .bind(period_key)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get period: {}", e)))?;

        if let Some(period) = existing {
            return Ok(period);
        }

        let inserted = sqlx::query_as::<_, BillingPeriod>(&format!(
            r#"
            INSERT INTO billing_periods (period_id, period_key, month_name, year)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (period_key) DO NOTHING
            RETURNING {PERIOD_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(period_key)
        .bind(month_name)
        .bind(year)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create period: {}", e)))?;

        match inserted {
            Some(period) => {
                info!(period_key = %period.period_key, "Billing period created");
                Ok(period)
            }
            // Another request created it between the lookup and the insert.
            None => sqlx::query_as::<_, BillingPeriod>(&format!(
                "SELECT {PERIOD_COLUMNS} FROM billing_periods WHERE period_key = $1",
            ))
            .bind(period_key)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to re-read period: {}", e))
            }),
        }
    }

    /// Get a billing period by key.
    #[instrument(skip(self))]
    pub async fn get_period(&self, period_key: &str) -> Result<Option<BillingPeriod>, AppError> {
        let period = sqlx::query_as::<_, BillingPeriod>(&format!(
            "SELECT {PERIOD_COLUMNS} FROM billing_periods WHERE period_key = $1",
        ))
        .bind(period_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get period: {}", e)))?;

        Ok(period)
    }

    /// List billing periods, newest first.
    #[instrument(skip(self))]
    pub async fn list_periods(&self, limit: i64) -> Result<Vec<BillingPeriod>, AppError> {
        let periods = sqlx::query_as::<_, BillingPeriod>(&format!(
            "SELECT {PERIOD_COLUMNS} FROM billing_periods ORDER BY period_key DESC LIMIT $1",
        ))
        .bind(limit.clamp(1, 1000))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list periods: {}", e)))?;

        Ok(periods)
    }

    // -------------------------------------------------------------------------
    // Bill Generation
    // -------------------------------------------------------------------------

    /// Generate rent bills for one billing period.
    ///
    /// One transaction end to end: candidate leases are resolved first (so a
    /// selection that matches nothing fails before the period row could leak),
    /// the period is resolved or created, the already-billed tenant set is
    /// fetched once inside the transaction, and one bill per remaining tenant
    /// is inserted along with a single audit entry. Re-running for the same
    /// period is safe: already-billed tenants are skipped, not errors.
    #[instrument(skip(self, input), fields(period_key = %input.period_key))]
    pub async fn generate_bills(
        &self,
        input: &GenerateBills,
    ) -> Result<GenerateBillsOutcome, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["generate_bills"])
            .start_timer();

        let (year, month) = BillingPeriod::parse_key(&input.period_key).ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Invalid period key '{}': expected YYYY-MM",
                input.period_key
            ))
        })?;

        if let Some(ids) = &input.tenant_ids {
            if ids.is_empty() {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Tenant selection is empty"
                )));
            }
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let leases = sqlx::query_as::<_, Lease>(
            r#"
            SELECT l.lease_id, l.tenant_id, l.apartment_id, l.start_date, l.end_date,
                   l.monthly_rent, l.deposit, l.late_fee_rate, l.created_utc
            FROM leases l
            JOIN tenants t ON t.tenant_id = l.tenant_id
            WHERE l.end_date >= $1
              AND t.status = 'active'
              AND ($2::uuid[] IS NULL OR l.tenant_id = ANY($2))
            ORDER BY l.start_date, l.lease_id
            "#,
        )
        .bind(input.as_of)
        .bind(&input.tenant_ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch leases: {}", e)))?;

        if leases.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "No active leases matched the selection for period {}",
                input.period_key
            )));
        }

        let period = self
            .get_or_create_period(
                &mut tx,
                &input.period_key,
                BillingPeriod::month_name(month),
                year,
            )
            .await?;

        // One query for the whole already-billed set, re-read inside the
        // transaction.
        let already_billed: Vec<Uuid> = sqlx::query_scalar(
            "SELECT tenant_id FROM bills WHERE period_id = $1 AND bill_type = 'rent'",
        )
        .bind(period.period_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch billed tenants: {}", e))
        })?;
        let already_billed: HashSet<Uuid> = already_billed.into_iter().collect();

        let mut bills_created = Vec::new();
        let mut skipped = Vec::new();
        let mut seen = HashSet::new();
        let mut total = Decimal::ZERO;

        for lease in &leases {
            if already_billed.contains(&lease.tenant_id) || !seen.insert(lease.tenant_id) {
                if !skipped.contains(&lease.tenant_id) {
                    skipped.push(lease.tenant_id);
                }
                continue;
            }

            let result = sqlx::query_as::<_, Bill>(&format!(
                r#"
                INSERT INTO bills (bill_id, tenant_id, apartment_id, lease_id, period_id, bill_type,
                    amount_due, amount_paid, status, due_date, generated_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $10)
                RETURNING {BILL_COLUMNS}
                "#,
            ))
            .bind(Uuid::new_v4())
            .bind(lease.tenant_id)
            .bind(lease.apartment_id)
            .bind(lease.lease_id)
            .bind(period.period_id)
            .bind(BillType::Rent.as_str())
            .bind(lease.monthly_rent)
            .bind(BillStatus::Unpaid.as_str())
            .bind(input.due_date)
            .bind(input.as_of)
            .fetch_one(&mut *tx)
            .await;

            match result {
                Ok(bill) => {
                    total += bill.amount_due;
                    bills_created.push(bill);
                }
                Err(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
                    // A concurrent run billed this tenant after our set was
                    // read; the whole run is rolled back and reported as a
                    // conflict so the caller can retry (the retry will skip).
                    return Err(AppError::Conflict(anyhow::anyhow!(
                        "Bills for period {} were generated concurrently; retry",
                        input.period_key
                    )));
                }
                Err(e) => {
                    return Err(AppError::DatabaseError(anyhow::anyhow!(
                        "Failed to create bill: {}",
                        e
                    )));
                }
            }
        }

        record_audit(
            &mut *tx,
            "generate_bills",
            "billing_period",
            Some(period.period_id),
            input.actor_id,
            &format!(
                "Generated {} rent bills for {} totaling {}",
                bills_created.len(),
                period.period_key,
                total
            ),
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        BILLS_TOTAL
            .with_label_values(&["unpaid"])
            .inc_by(bills_created.len() as f64);
        BILLED_AMOUNT_TOTAL
            .with_label_values(&["rent"])
            .inc_by(total.to_f64().unwrap_or(0.0));

        info!(
            period_key = %period.period_key,
            bills_created = bills_created.len(),
            skipped = skipped.len(),
            total_amount = %total,
            "Bill generation completed"
        );

        Ok(GenerateBillsOutcome {
            period_key: period.period_key,
            bills_created,
            skipped_tenant_ids: skipped,
            total_amount_billed: total,
        })
    }

    /// Get a bill by ID.
    #[instrument(skip(self), fields(bill_id = %bill_id))]
    pub async fn get_bill(&self, bill_id: Uuid) -> Result<Option<Bill>, AppError> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE bill_id = $1",
        ))
        .bind(bill_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get bill: {}", e)))?;

        Ok(bill)
    }

    /// List bills with optional filters.
    #[instrument(skip(self, filter))]
    pub async fn list_bills(&self, filter: &ListBillsFilter) -> Result<Vec<Bill>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_bills"])
            .start_timer();

        let bills = sqlx::query_as::<_, Bill>(&format!(
            r#"
            SELECT b.bill_id, b.tenant_id, b.apartment_id, b.lease_id, b.period_id, b.bill_type,
                   b.amount_due, b.amount_paid, b.status, b.due_date, b.generated_date,
                   b.settled_date, b.parent_bill_id, b.created_utc
            FROM bills b
            JOIN billing_periods p ON p.period_id = b.period_id
            WHERE ($1::uuid IS NULL OR b.tenant_id = $1)
              AND ($2::varchar IS NULL OR p.period_key = $2)
              AND ($3::varchar IS NULL OR b.status = $3)
            ORDER BY b.due_date, b.bill_id
            LIMIT $4
            "#,
        ))
        .bind(filter.tenant_id)
        .bind(&filter.period_key)
        .bind(filter.status.map(|s| s.as_str().to_string()))
        .bind(filter.limit.clamp(1, 1000))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list bills: {}", e)))?;

        timer.observe_duration();

        Ok(bills)
    }

    /// Delete a bill. Refused once any payment has been allocated against it;
    /// the allocation ledger is append-only and must keep every invoice
    /// attributable.
    #[instrument(skip(self), fields(bill_id = %bill_id))]
    pub async fn delete_bill(
        &self,
        bill_id: Uuid,
        actor_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_bill"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT bill_id FROM bills WHERE bill_id = $1 FOR UPDATE")
                .bind(bill_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to get bill: {}", e))
                })?;
        if exists.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!("Bill not found")));
        }

        let has_allocations: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM payment_allocations WHERE bill_id = $1)",
        )
        .bind(bill_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to check allocations: {}", e))
        })?;

        if has_allocations {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Bill has recorded payments and cannot be deleted"
            )));
        }

        sqlx::query("DELETE FROM bills WHERE bill_id = $1")
            .bind(bill_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete bill: {}", e)))?;

        record_audit(
            &mut *tx,
            "delete_bill",
            "bill",
            Some(bill_id),
            actor_id,
            "Bill deleted before any payment was recorded",
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        info!(bill_id = %bill_id, "Bill deleted");

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Payment Recording
    // -------------------------------------------------------------------------

    /// Record a payment and allocate it across the targeted scope.
    ///
    /// One transaction: the in-scope bills are locked, each remaining balance
    /// is recomputed from the allocation ledger (the cached `amount_paid`
    /// column is never trusted across a request boundary), the settlement
    /// plan is computed, and exactly one invoice plus one allocation row per
    /// touched bill is written together with the bill updates and one audit
    /// entry. Any failure rolls the whole payment back.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, amount = %input.amount))]
    pub async fn record_payment(
        &self,
        input: &RecordPayment,
    ) -> Result<RecordPaymentOutcome, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        if input.amount <= Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Payment amount must be positive"
            )));
        }
        if input.settlement_date > input.as_of {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Settlement date {} is in the future",
                input.settlement_date
            )));
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let tenant_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tenants WHERE tenant_id = $1)")
                .bind(input.tenant_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to check tenant: {}", e))
                })?;
        if !tenant_exists {
            return Err(AppError::NotFound(anyhow::anyhow!("Tenant not found")));
        }

        // Lock the allocation scope for the duration of the walk.
        let scope: Vec<(Uuid, NaiveDate, Decimal)> = match input.target {
            PaymentTarget::Bill(bill_id) => {
                let row: Option<(Uuid, NaiveDate, Decimal)> = sqlx::query_as(
                    r#"
                    SELECT bill_id, due_date, amount_due
                    FROM bills
                    WHERE bill_id = $1 AND tenant_id = $2
                    FOR UPDATE
                    "#,
                )
                .bind(bill_id)
                .bind(input.tenant_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to fetch bill: {}", e))
                })?;
                match row {
                    Some(row) => vec![row],
                    None => {
                        return Err(AppError::NotFound(anyhow::anyhow!(
                            "Bill not found for this tenant"
                        )))
                    }
                }
            }
            PaymentTarget::OldestOutstanding => sqlx::query_as(
                r#"
                SELECT bill_id, due_date, amount_due
                FROM bills
                WHERE tenant_id = $1
                ORDER BY due_date, bill_id
                FOR UPDATE
                "#,
            )
            .bind(input.tenant_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to fetch bills: {}", e))
            })?,
        };

        if scope.is_empty() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Tenant has no bills to allocate against"
            )));
        }

        // Authoritative paid amounts come from the allocation ledger.
        let bill_ids: Vec<Uuid> = scope.iter().map(|(id, _, _)| *id).collect();
        let settled_rows: Vec<(Uuid, Decimal)> = sqlx::query_as(
            r#"
            SELECT bill_id, COALESCE(SUM(amount_applied), 0)
            FROM payment_allocations
            WHERE bill_id = ANY($1)
            GROUP BY bill_id
            "#,
        )
        .bind(&bill_ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to sum allocations: {}", e))
        })?;
        let settled: HashMap<Uuid, Decimal> = settled_rows.into_iter().collect();

        let outstanding: Vec<OutstandingBill> = scope
            .iter()
            .map(|(bill_id, due_date, amount_due)| OutstandingBill {
                bill_id: *bill_id,
                due_date: *due_date,
                amount_due: *amount_due,
                amount_settled: settled.get(bill_id).copied().unwrap_or(Decimal::ZERO),
            })
            .collect();

        let plan = plan_settlement(&outstanding, input.amount, allocation_tolerance()).map_err(
            |e| match e {
                SettlementError::NothingOutstanding => AppError::Conflict(anyhow::anyhow!(e)),
                _ => AppError::BadRequest(anyhow::anyhow!(e)),
            },
        )?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (invoice_id, tenant_id, amount, payment_method, reference_number, settlement_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(Uuid::new_v4())
        .bind(input.tenant_id)
        .bind(input.amount)
        .bind(input.payment_method.as_str())
        .bind(&input.reference_number)
        .bind(input.settlement_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)))?;

        let mut allocations = Vec::with_capacity(plan.allocations.len());
        let mut bills_settled = 0u32;
        let mut bills_partially_settled = 0u32;

        for planned in &plan.allocations {
            let allocation = sqlx::query_as::<_, PaymentAllocation>(&format!(
                r#"
                INSERT INTO payment_allocations (allocation_id, invoice_id, bill_id, amount_applied)
                VALUES ($1, $2, $3, $4)
                RETURNING {ALLOCATION_COLUMNS}
                "#,
            ))
            .bind(Uuid::new_v4())
            .bind(invoice.invoice_id)
            .bind(planned.bill_id)
            .bind(planned.amount)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to create allocation: {}", e))
            })?;
            allocations.push(allocation);

            // The settled date is set only on the first full settlement.
            sqlx::query(
                r#"
                UPDATE bills
                SET amount_paid = $2,
                    status = $3,
                    settled_date = CASE
                        WHEN $4 AND settled_date IS NULL THEN $5
                        ELSE settled_date
                    END
                WHERE bill_id = $1
                "#,
            )
            .bind(planned.bill_id)
            .bind(planned.new_amount_paid)
            .bind(planned.new_status.as_str())
            .bind(planned.settles_bill)
            .bind(input.settlement_date)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update bill: {}", e))
            })?;

            match planned.new_status {
                BillStatus::Paid => bills_settled += 1,
                BillStatus::Partial => bills_partially_settled += 1,
                BillStatus::Unpaid => {}
            }
        }

        record_audit(
            &mut *tx,
            "record_payment",
            "invoice",
            Some(invoice.invoice_id),
            input.actor_id,
            &format!(
                "Recorded {} payment of {} across {} bill(s)",
                input.payment_method.as_str(),
                input.amount,
                allocations.len()
            ),
        )
        .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        INVOICES_TOTAL
            .with_label_values(&[input.payment_method.as_str()])
            .inc();
        PAYMENT_AMOUNT_TOTAL
            .with_label_values(&[input.payment_method.as_str()])
            .inc_by(input.amount.to_f64().unwrap_or(0.0));
        if bills_settled > 0 {
            BILLS_TOTAL
                .with_label_values(&["paid"])
                .inc_by(bills_settled as f64);
        }
        if bills_partially_settled > 0 {
            BILLS_TOTAL
                .with_label_values(&["partial"])
                .inc_by(bills_partially_settled as f64);
        }

        info!(
            invoice_id = %invoice.invoice_id,
            amount = %invoice.amount,
            allocations = allocations.len(),
            bills_settled = bills_settled,
            "Payment recorded"
        );

        Ok(RecordPaymentOutcome {
            invoice,
            allocations,
            bills_settled,
            bills_partially_settled,
        })
    }

    /// Get an invoice by ID.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1",
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        Ok(invoice)
    }

    /// List invoices with optional filters.
    #[instrument(skip(self, filter))]
    pub async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE ($1::uuid IS NULL OR tenant_id = $1)
              AND ($2::date IS NULL OR settlement_date >= $2)
              AND ($3::date IS NULL OR settlement_date <= $3)
            ORDER BY settlement_date DESC, invoice_id
            LIMIT $4
            "#,
        ))
        .bind(filter.tenant_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(filter.limit.clamp(1, 1000))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        Ok(invoices)
    }

    /// List the allocations of one invoice.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn list_allocations(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<PaymentAllocation>, AppError> {
        let allocations = sqlx::query_as::<_, PaymentAllocation>(&format!(
            r#"
            SELECT {ALLOCATION_COLUMNS}
            FROM payment_allocations
            WHERE invoice_id = $1
            ORDER BY created_utc, allocation_id
            "#,
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list allocations: {}", e))
        })?;

        Ok(allocations)
    }

    // -------------------------------------------------------------------------
    // Reporting (read-only)
    // -------------------------------------------------------------------------

    /// Totals billed/collected/outstanding and collection efficiency.
    #[instrument(skip(self))]
    pub async fn collection_summary(&self) -> Result<CollectionSummary, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["collection_summary"])
            .start_timer();

        let (total_billed, total_collected): (Decimal, Decimal) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(b.amount_due), 0),
                   COALESCE(SUM(a.paid), 0)
            FROM bills b
            LEFT JOIN (
                SELECT bill_id, SUM(amount_applied) AS paid
                FROM payment_allocations
                GROUP BY bill_id
            ) a ON a.bill_id = b.bill_id
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to compute summary: {}", e))
        })?;

        timer.observe_duration();

        let total_outstanding = total_billed - total_collected;
        let collection_efficiency_pct = if total_billed > Decimal::ZERO {
            (total_collected / total_billed * Decimal::new(100, 0)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        Ok(CollectionSummary {
            total_billed,
            total_collected,
            total_outstanding,
            collection_efficiency_pct,
        })
    }

    /// Outstanding balances bucketed by days past due as of `as_of`.
    #[instrument(skip(self))]
    pub async fn aging_report(&self, as_of: NaiveDate) -> Result<AgingReport, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["aging_report"])
            .start_timer();

        let rows: Vec<(NaiveDate, Decimal)> = sqlx::query_as(
            r#"
            SELECT b.due_date, b.amount_due - COALESCE(a.paid, 0)
            FROM bills b
            LEFT JOIN (
                SELECT bill_id, SUM(amount_applied) AS paid
                FROM payment_allocations
                GROUP BY bill_id
            ) a ON a.bill_id = b.bill_id
            WHERE b.amount_due > COALESCE(a.paid, 0)
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to compute aging report: {}", e))
        })?;

        timer.observe_duration();

        let mut report = AgingReport {
            current: Decimal::ZERO,
            days_1_30: Decimal::ZERO,
            days_31_60: Decimal::ZERO,
            days_61_90: Decimal::ZERO,
            days_over_90: Decimal::ZERO,
        };

        for (due_date, remaining) in rows {
            let days_past_due = (as_of - due_date).num_days();
            let bucket = match days_past_due {
                d if d <= 0 => &mut report.current,
                1..=30 => &mut report.days_1_30,
                31..=60 => &mut report.days_31_60,
                61..=90 => &mut report.days_61_90,
                _ => &mut report.days_over_90,
            };
            *bucket += remaining;
        }

        Ok(report)
    }

    /// Top tenants by overdue balance as of `as_of`.
    #[instrument(skip(self))]
    pub async fn overdue_tenants(
        &self,
        as_of: NaiveDate,
        limit: i64,
    ) -> Result<Vec<OverdueTenant>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["overdue_tenants"])
            .start_timer();

        let rows: Vec<(Uuid, String, Decimal, NaiveDate)> = sqlx::query_as(
            r#"
            SELECT b.tenant_id, t.full_name,
                   SUM(b.amount_due - COALESCE(a.paid, 0)) AS overdue_amount,
                   MIN(b.due_date) AS oldest_due_date
            FROM bills b
            JOIN tenants t ON t.tenant_id = b.tenant_id
            LEFT JOIN (
                SELECT bill_id, SUM(amount_applied) AS paid
                FROM payment_allocations
                GROUP BY bill_id
            ) a ON a.bill_id = b.bill_id
            WHERE b.due_date < $1 AND b.amount_due > COALESCE(a.paid, 0)
            GROUP BY b.tenant_id, t.full_name
            ORDER BY overdue_amount DESC
            LIMIT $2
            "#,
        )
        .bind(as_of)
        .bind(limit.clamp(1, 100))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list overdue tenants: {}", e))
        })?;

        timer.observe_duration();

        Ok(rows
            .into_iter()
            .map(
                |(tenant_id, full_name, overdue_amount, oldest_due_date)| OverdueTenant {
                    tenant_id,
                    full_name,
                    overdue_amount,
                    oldest_due_date,
                },
            )
            .collect())
    }

    /// Derive a tenant's overall payment state from their bill set. Read-only;
    /// balances come from the allocation ledger.
    #[instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn tenant_payment_state(
        &self,
        tenant_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<TenantPaymentState, AppError> {
        let rows: Vec<(Uuid, NaiveDate, Decimal, Decimal)> = sqlx::query_as(
            r#"
            SELECT b.bill_id, b.due_date, b.amount_due, COALESCE(a.paid, 0)
            FROM bills b
            LEFT JOIN (
                SELECT bill_id, SUM(amount_applied) AS paid
                FROM payment_allocations
                GROUP BY bill_id
            ) a ON a.bill_id = b.bill_id
            WHERE b.tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch tenant bills: {}", e))
        })?;

        let bills: Vec<OutstandingBill> = rows
            .into_iter()
            .map(|(bill_id, due_date, amount_due, amount_settled)| OutstandingBill {
                bill_id,
                due_date,
                amount_due,
                amount_settled,
            })
            .collect();

        Ok(derive_tenant_payment_state(&bills, as_of))
    }

    // -------------------------------------------------------------------------
    // Audit Operations
    // -------------------------------------------------------------------------

    /// List audit events with filters and pagination.
    #[instrument(skip(self, filter))]
    pub async fn list_audit_events(
        &self,
        filter: &ListAuditEventsFilter,
    ) -> Result<Vec<AuditEvent>, AppError> {
        let events = sqlx::query_as::<_, AuditEvent>(
            r#"
            SELECT audit_id, action, entity_type, entity_id, actor_id, detail, created_utc
            FROM audit_log
            WHERE ($1::varchar IS NULL OR action = $1)
              AND ($2::varchar IS NULL OR entity_type = $2)
              AND ($3::uuid IS NULL OR entity_id = $3)
            ORDER BY created_utc DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(&filter.action)
        .bind(&filter.entity_type)
        .bind(filter.entity_id)
        .bind(filter.limit.clamp(1, 1000))
        .bind(filter.offset.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to list audit events: {}", e))
        })?;

        Ok(events)
    }
}
