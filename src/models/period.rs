//! Billing period model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One calendar month of billing, identified by its `YYYY-MM` key.
/// Immutable once created; looked up by key and created on demand the first
/// time bills are generated for that month.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BillingPeriod {
    pub period_id: Uuid,
    pub period_key: String,
    pub month_name: String,
    pub year: i32,
    pub created_utc: DateTime<Utc>,
}

impl BillingPeriod {
    /// Parse a `YYYY-MM` key into (year, month). Returns `None` for anything
    /// that is not a four-digit year, a dash, and a month in 01..=12.
    pub fn parse_key(key: &str) -> Option<(i32, u32)> {
        let (year_part, month_part) = key.split_once('-')?;
        if year_part.len() != 4 || month_part.len() != 2 {
            return None;
        }
        let year: i32 = year_part.parse().ok()?;
        let month: u32 = month_part.parse().ok()?;
        if !(1..=12).contains(&month) {
            return None;
        }
        Some((year, month))
    }

    /// English month name for a 1-based month number.
    pub fn month_name(month: u32) -> &'static str {
        match month {
            1 => "January",
            2 => "February",
            3 => "March",
            4 => "April",
            5 => "May",
            6 => "June",
            7 => "July",
            8 => "August",
            9 => "September",
            10 => "October",
            11 => "November",
            12 => "December",
            _ => "Unknown",
        }
    }
}
