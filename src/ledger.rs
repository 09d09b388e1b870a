use crate::application::RentalApplication;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::MonthYear;

/// result of applying a payment to a month
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// an installment was marked paid and the aggregates moved
    Applied { due_month: MonthYear, amount: Money },
    /// the matching installment was already paid; nothing changed
    AlreadyPaid { due_month: MonthYear },
}

/// mark the installment due in `selector` as paid and move the totals
///
/// the first non-paid installment whose due month matches the selector
/// is settled; `amount_paid` and `amount_due` shift by its amount, both
/// re-rounded to cents. paying a month that is already settled is an
/// idempotent no-op, distinct from `NoMatch` (selector hits no
/// installment at all).
pub fn apply_payment(
    application: &mut RentalApplication,
    selector: MonthYear,
) -> Result<PaymentOutcome> {
    if application.lifecycle_status.is_terminal() {
        return Err(LedgerError::ApplicationTerminal {
            status: application.lifecycle_status,
        });
    }

    let matched = application
        .schedule
        .installments
        .iter_mut()
        .find(|i| selector.contains(i.due_instant) && !i.is_paid());

    if let Some(installment) = matched {
        installment.status = crate::types::InstallmentStatus::Paid;
        let amount = installment.amount;
        let due_month = installment.due_month();
        application.amount_paid += amount;
        application.amount_due -= amount;
        return Ok(PaymentOutcome::Applied { due_month, amount });
    }

    // distinguish "already settled" from "selector hits nothing"
    let already_paid = application
        .schedule
        .installments
        .iter()
        .find(|i| selector.contains(i.due_instant));
    match already_paid {
        Some(installment) => Ok(PaymentOutcome::AlreadyPaid {
            due_month: installment.due_month(),
        }),
        None => Err(LedgerError::NoMatch { selector }),
    }
}

/// re-project the aggregates from the schedule
///
/// the running totals are normally maintained incrementally; this
/// rebuilds them wholesale, for use after a schedule reset.
pub fn recompute_aggregates(application: &mut RentalApplication) {
    application.amount_paid = application.schedule.paid_total();
    application.amount_due = application.schedule.due_total();
}

/// check the ledger invariant: paid + due covers the full obligation
pub fn is_balanced(application: &RentalApplication) -> bool {
    application.amount_paid + application.amount_due == application.total_obligation()
}
