use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Rate;
use crate::errors::{LedgerError, Result};

/// ledger policy configuration
///
/// the defaults encode the marketplace's standing policy: 20% financing
/// interest on the unpaid remainder, a 12-month plan, and any upfront
/// payment counting as the first installment in full.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// financing interest applied to the unpaid remainder
    pub interest_rate: Rate,
    /// number of installments in a generated schedule
    pub term_months: u32,
    /// nonzero upfront payment marks installment 1 paid at generation
    pub prepaid_first_installment: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            interest_rate: Rate::from_decimal(dec!(0.20)),
            term_months: 12,
            prepaid_first_installment: true,
        }
    }
}

impl LedgerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interest_rate.as_decimal().is_sign_negative() {
            return Err(LedgerError::Validation {
                message: format!("interest rate must not be negative: {}", self.interest_rate),
            });
        }
        if self.term_months == 0 {
            return Err(LedgerError::Validation {
                message: "term must cover at least one month".to_string(),
            });
        }
        Ok(())
    }
}
