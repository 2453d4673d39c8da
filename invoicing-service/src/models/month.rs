//! Calendar month used as the billing period for company invoices.

use anyhow::anyhow;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use service_core::error::AppError;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// A calendar month, the billing period for company-monthly invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BillingMonth {
    year: i32,
    month: u32,
}

impl BillingMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, AppError> {
        if !(1..=12).contains(&month) {
            return Err(AppError::BadRequest(anyhow!(
                "month {} is out of range 1-12",
                month
            )));
        }
        Ok(Self { year, month })
    }

    /// Parse a `YYYY-MM` label.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let (year, month) = raw
            .split_once('-')
            .ok_or_else(|| AppError::BadRequest(anyhow!("expected YYYY-MM, got '{}'", raw)))?;
        let year = year
            .parse()
            .map_err(|_| AppError::BadRequest(anyhow!("invalid year in '{}'", raw)))?;
        let month = month
            .parse()
            .map_err(|_| AppError::BadRequest(anyhow!("invalid month in '{}'", raw)))?;
        Self::new(year, month)
    }

    pub fn from_datetime(at: &DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Display label, e.g. `"March 2024"`.
    pub fn label(&self) -> String {
        format!("{} {}", MONTH_NAMES[self.month as usize - 1], self.year)
    }

    /// Sortable key, e.g. `"2024-03"`.
    pub fn key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    /// Last calendar day of the month.
    pub fn last_day(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .expect("first day of a valid month")
            .pred_opt()
            .expect("every month has a last day")
    }

    /// The timestamp stamped onto a company-monthly invoice: the last
    /// calendar day of the month, so the invoice date always falls
    /// inside its billing period.
    pub fn stamp(&self) -> DateTime<Utc> {
        self.last_day().and_time(NaiveTime::MIN).and_utc()
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        Self::from_datetime(at) == *self
    }
}
