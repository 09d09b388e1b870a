use chrono::{DateTime, Datelike, Utc};

use crate::schedule::PaymentSchedule;
use crate::types::{InstallmentStatus, MonthYear};

/// a status recomputation that changed an installment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub due_month: MonthYear,
    pub old_status: InstallmentStatus,
    pub new_status: InstallmentStatus,
}

/// recompute every installment's status against a reference instant
///
/// called explicitly at the defined entry points (load for display,
/// just before persisting a mutation) rather than through implicit
/// persistence hooks. `Paid` is terminal and never recomputed.
/// aggregates are untouched; that is the ledger's job.
pub fn refresh_statuses(
    schedule: &mut PaymentSchedule,
    reference: DateTime<Utc>,
) -> Vec<StatusChange> {
    let ref_key = (reference.year(), reference.month());
    let mut changes = Vec::new();

    for installment in &mut schedule.installments {
        if installment.status == InstallmentStatus::Paid {
            continue;
        }

        let due_key = (installment.due_instant.year(), installment.due_instant.month());
        let new_status = if due_key == ref_key {
            InstallmentStatus::DueThisMonth
        } else if due_key < ref_key {
            InstallmentStatus::Overdue
        } else {
            InstallmentStatus::Scheduled
        };

        if new_status != installment.status {
            changes.push(StatusChange {
                due_month: installment.due_month(),
                old_status: installment.status,
                new_status,
            });
            installment.status = new_status;
        }
    }

    changes
}
