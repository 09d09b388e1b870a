use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::schedule::PaymentSchedule;
use crate::types::{LifecycleStatus, Location, PropertyOwner, RentalId, UserId};

/// a user's rent-financing application and its installment ledger
///
/// owned by exactly one user; at most one application per user may be in
/// a non-terminal lifecycle status at a time (enforced at admission).
/// once closed or rejected the record is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalApplication {
    pub id: RentalId,
    pub owner: UserId,
    pub lifecycle_status: LifecycleStatus,

    // submitted terms
    pub annual_rent_amount: Money,
    pub already_paid_amount: Money,
    pub interest_rate: Rate,

    // running ledger totals, kept in lockstep with the schedule:
    // amount_paid + amount_due == schedule.total_obligation
    pub amount_paid: Money,
    pub amount_due: Money,

    pub property_owner: PropertyOwner,
    pub location: Location,
    pub attachment: Option<String>,

    pub schedule: PaymentSchedule,

    /// anchor instant for schedule generation
    pub created_at: DateTime<Utc>,
}

impl RentalApplication {
    /// open a new application, generating its schedule from the anchor
    pub fn open(
        owner: UserId,
        annual_rent_amount: Money,
        already_paid_amount: Money,
        property_owner: PropertyOwner,
        location: Location,
        attachment: Option<String>,
        anchor: DateTime<Utc>,
        config: &LedgerConfig,
    ) -> Result<Self> {
        let schedule =
            PaymentSchedule::generate(annual_rent_amount, already_paid_amount, anchor, config)?;
        let amount_paid = schedule.paid_total();
        let amount_due = schedule.due_total();

        Ok(Self {
            id: Uuid::new_v4(),
            owner,
            lifecycle_status: LifecycleStatus::Pending,
            annual_rent_amount,
            already_paid_amount,
            interest_rate: config.interest_rate,
            amount_paid,
            amount_due,
            property_owner,
            location,
            attachment,
            schedule,
            created_at: anchor,
        })
    }

    /// interest charged on the unpaid remainder
    pub fn interest_amount(&self) -> Money {
        self.schedule.interest_amount
    }

    /// regular monthly installment (the final entry may differ by the
    /// rounding remainder)
    pub fn monthly_installment(&self) -> Money {
        self.schedule.monthly_installment
    }

    /// full obligation: remainder plus interest
    pub fn total_obligation(&self) -> Money {
        self.schedule.total_obligation
    }

    /// true while the application still counts against the one-open-
    /// application-per-user rule
    pub fn is_open(&self) -> bool {
        !self.lifecycle_status.is_terminal()
    }

    /// move the application through its lifecycle
    ///
    /// pending -> verified | rejected; verified -> active;
    /// active -> closed; any non-terminal -> in-active;
    /// in-active -> active | closed | rejected.
    pub fn transition(&mut self, to: LifecycleStatus) -> Result<LifecycleStatus> {
        use LifecycleStatus::*;

        let from = self.lifecycle_status;
        if from.is_terminal() {
            return Err(LedgerError::ApplicationTerminal { status: from });
        }

        let allowed = matches!(
            (from, to),
            (Pending, Verified)
                | (Pending, Rejected)
                | (Verified, Active)
                | (Active, Closed)
                | (Pending | Verified | Active, InActive)
                | (InActive, Active)
                | (InActive, Closed)
                | (InActive, Rejected)
        );
        if !allowed {
            return Err(LedgerError::InvalidTransition { from, to });
        }

        self.lifecycle_status = to;
        Ok(from)
    }

    /// replace the whole schedule and re-derive the aggregates
    ///
    /// the only path that regenerates a schedule after creation; partial
    /// regeneration is never performed.
    pub fn regenerate_schedule(
        &mut self,
        annual_rent_amount: Money,
        already_paid_amount: Money,
        anchor: DateTime<Utc>,
        config: &LedgerConfig,
    ) -> Result<()> {
        if self.lifecycle_status.is_terminal() {
            return Err(LedgerError::ApplicationTerminal {
                status: self.lifecycle_status,
            });
        }

        self.schedule =
            PaymentSchedule::generate(annual_rent_amount, already_paid_amount, anchor, config)?;
        self.annual_rent_amount = annual_rent_amount;
        self.already_paid_amount = already_paid_amount;
        self.interest_rate = config.interest_rate;
        self.amount_paid = self.schedule.paid_total();
        self.amount_due = self.schedule.due_total();
        self.created_at = anchor;
        Ok(())
    }
}
