use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{InstallmentStatus, MonthYear};

/// one scheduled monthly obligation within a payment plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    /// anchor-derived due instant; month-granular for matching but kept
    /// at full timestamp precision
    pub due_instant: DateTime<Utc>,
    pub amount: Money,
    pub status: InstallmentStatus,
}

impl Installment {
    /// calendar month this installment falls due in
    pub fn due_month(&self) -> MonthYear {
        MonthYear::from_instant(self.due_instant)
    }

    pub fn is_paid(&self) -> bool {
        self.status == InstallmentStatus::Paid
    }
}

/// amortized payment plan over the unpaid remainder of an annual rent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentSchedule {
    pub interest_amount: Money,
    pub total_obligation: Money,
    pub monthly_installment: Money,
    pub installments: Vec<Installment>,
}

impl PaymentSchedule {
    /// generate the payment plan
    ///
    /// interest is charged on the remainder after the upfront payment;
    /// installments fall due month by month from the anchor, and the
    /// final installment absorbs any division remainder so the plan sums
    /// exactly to the total obligation. a nonzero upfront payment marks
    /// installment 1 paid at generation (policy, see `LedgerConfig`).
    pub fn generate(
        annual_rent: Money,
        already_paid: Money,
        anchor: DateTime<Utc>,
        config: &LedgerConfig,
    ) -> Result<Self> {
        config.validate()?;

        if annual_rent.is_negative() {
            return Err(LedgerError::Validation {
                message: format!("annual rent must not be negative: {}", annual_rent),
            });
        }
        if already_paid.is_negative() {
            return Err(LedgerError::Validation {
                message: format!("already paid amount must not be negative: {}", already_paid),
            });
        }
        if already_paid > annual_rent {
            return Err(LedgerError::AlreadyPaidExceedsRent {
                annual_rent,
                already_paid,
            });
        }

        let remaining = annual_rent - already_paid;
        let interest_amount = remaining * config.interest_rate.as_decimal();
        let total_obligation = remaining + interest_amount;
        let monthly_installment = total_obligation / Decimal::from(config.term_months);

        let term = config.term_months;
        let mut installments = Vec::with_capacity(term as usize);
        for i in 0..term {
            let amount = if i == term - 1 {
                // absorb the division remainder in the last entry
                total_obligation - monthly_installment * Decimal::from(term - 1)
            } else {
                monthly_installment
            };

            installments.push(Installment {
                due_instant: add_months(anchor, i),
                amount,
                status: InstallmentStatus::Scheduled,
            });
        }

        if config.prepaid_first_installment && already_paid.is_positive() {
            if let Some(first) = installments.first_mut() {
                first.status = InstallmentStatus::Paid;
            }
        }

        Ok(Self {
            interest_amount,
            total_obligation,
            monthly_installment,
            installments,
        })
    }

    /// sum of amounts on paid installments
    pub fn paid_total(&self) -> Money {
        self.installments
            .iter()
            .filter(|i| i.is_paid())
            .map(|i| i.amount)
            .sum()
    }

    /// sum of amounts on installments not yet paid
    pub fn due_total(&self) -> Money {
        self.installments
            .iter()
            .filter(|i| !i.is_paid())
            .map(|i| i.amount)
            .sum()
    }
}

/// add calendar months, clamping to the last valid day of the target
/// month when the anchor day does not exist there (jan 31 -> feb 28/29)
pub(crate) fn add_months(date: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    let total = date.month0() + months;
    let year = date.year() + (total / 12) as i32;
    let month = (total % 12) + 1;
    let day = date.day().min(days_in_month(year, month));

    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(d) => d
            .and_hms_opt(date.hour(), date.minute(), date.second())
            .map(|dt| dt.and_utc())
            .unwrap_or(date),
        // unreachable: day is clamped into the valid range
        None => date,
    }
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}
