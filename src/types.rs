use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::LedgerError;

/// unique identifier for a rental application
pub type RentalId = Uuid;

/// unique identifier for a user account
pub type UserId = Uuid;

/// rental application lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleStatus {
    /// submitted, awaiting verification
    Pending,
    /// documents verified by an administrator
    Verified,
    /// rental in force, installments being collected
    Active,
    /// fully wound down
    Closed,
    /// verification refused
    Rejected,
    /// administratively suspended
    InActive,
}

impl LifecycleStatus {
    /// closed and rejected applications never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleStatus::Closed | LifecycleStatus::Rejected)
    }
}

/// per-installment status, derived from its due date and payment events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallmentStatus {
    /// due in a future month
    Scheduled,
    /// due in the current calendar month
    DueThisMonth,
    /// payment recorded; terminal, never recomputed
    Paid,
    /// due month has passed without payment
    Overdue,
}

impl FromStr for InstallmentStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scheduled" => Ok(InstallmentStatus::Scheduled),
            "due-this-month" => Ok(InstallmentStatus::DueThisMonth),
            "paid" => Ok(InstallmentStatus::Paid),
            "overdue" => Ok(InstallmentStatus::Overdue),
            other => Err(LedgerError::Validation {
                message: format!("unknown installment status: {}", other),
            }),
        }
    }
}

/// property owner verification status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationStatus {
    Verified,
    Unverified,
}

impl Default for VerificationStatus {
    fn default() -> Self {
        VerificationStatus::Unverified
    }
}

/// counterparty who owns the rented property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyOwner {
    pub full_name: String,
    pub phone: String,
    pub email: Option<String>,
    #[serde(default)]
    pub verification_status: VerificationStatus,
}

/// where the rented property sits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub neighborhood: String,
}

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

/// calendar month + year selector, e.g. "August 2025"
///
/// matching against an installment's due instant is exact on month and
/// year, case-insensitive on the month name. substring matching is
/// deliberately not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthYear {
    /// 1-based calendar month
    pub month: u32,
    pub year: i32,
}

impl MonthYear {
    pub fn new(month: u32, year: i32) -> Result<Self, LedgerError> {
        if !(1..=12).contains(&month) {
            return Err(LedgerError::InvalidMonthYear {
                input: format!("{} {}", month, year),
            });
        }
        Ok(Self { month, year })
    }

    /// selector for the calendar month containing an instant
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self {
            month: instant.month(),
            year: instant.year(),
        }
    }

    /// english month name
    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    /// true when the instant falls inside this calendar month
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant.month() == self.month && instant.year() == self.year
    }
}

impl fmt::Display for MonthYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.month_name(), self.year)
    }
}

impl FromStr for MonthYear {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::InvalidMonthYear {
            input: s.to_string(),
        };

        let mut parts = s.split_whitespace();
        let name = parts.next().ok_or_else(invalid)?;
        let year = parts
            .next()
            .ok_or_else(invalid)?
            .parse::<i32>()
            .map_err(|_| invalid())?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        let month = MONTH_NAMES
            .iter()
            .position(|m| m.eq_ignore_ascii_case(name))
            .ok_or_else(invalid)? as u32
            + 1;

        Ok(MonthYear { month, year })
    }
}
