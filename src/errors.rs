use thiserror::Error;

use crate::decimal::Money;
use crate::types::{LifecycleStatus, MonthYear, RentalId};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
    },

    #[error("already paid amount {already_paid} exceeds annual rent {annual_rent}")]
    AlreadyPaidExceedsRent {
        annual_rent: Money,
        already_paid: Money,
    },

    #[error("user already has an open rental application in status {status:?}")]
    OpenApplicationExists {
        status: LifecycleStatus,
    },

    #[error("property owner phone {phone} is already in use")]
    PhoneInUse {
        phone: String,
    },

    #[error("rental application not found: {id}")]
    NotFound {
        id: RentalId,
    },

    #[error("no installment matches {selector} in the schedule")]
    NoMatch {
        selector: MonthYear,
    },

    #[error("invalid lifecycle transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: LifecycleStatus,
        to: LifecycleStatus,
    },

    #[error("application is {status:?} and no longer accepts mutations")]
    ApplicationTerminal {
        status: LifecycleStatus,
    },

    #[error("concurrent update conflict on application {id}")]
    UpdateConflict {
        id: RentalId,
    },

    #[error("invalid month/year selector: {input}")]
    InvalidMonthYear {
        input: String,
    },

    #[error("storage failure: {message}")]
    Storage {
        message: String,
    },
}

impl LedgerError {
    /// true for the conflict family of errors (retry after re-reading state)
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            LedgerError::OpenApplicationExists { .. }
                | LedgerError::PhoneInUse { .. }
                | LedgerError::UpdateConflict { .. }
        )
    }

    /// true for caller-input errors (no retry will help)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::Validation { .. }
                | LedgerError::AlreadyPaidExceedsRent { .. }
                | LedgerError::InvalidMonthYear { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
