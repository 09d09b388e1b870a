use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{InstallmentStatus, LifecycleStatus, MonthYear, RentalId, UserId};

/// all events emitted by ledger operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    ApplicationCreated {
        rental_id: RentalId,
        owner: UserId,
        annual_rent: Money,
        already_paid: Money,
        total_obligation: Money,
        timestamp: DateTime<Utc>,
    },
    LifecycleChanged {
        rental_id: RentalId,
        old_status: LifecycleStatus,
        new_status: LifecycleStatus,
        timestamp: DateTime<Utc>,
    },

    // ledger events
    InstallmentPaid {
        rental_id: RentalId,
        due_month: MonthYear,
        amount: Money,
        amount_paid: Money,
        amount_due: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentAlreadyRecorded {
        rental_id: RentalId,
        due_month: MonthYear,
        timestamp: DateTime<Utc>,
    },
    InstallmentStatusChanged {
        rental_id: RentalId,
        due_month: MonthYear,
        old_status: InstallmentStatus,
        new_status: InstallmentStatus,
    },

    // schedule events
    ScheduleRegenerated {
        rental_id: RentalId,
        annual_rent: Money,
        already_paid: Money,
        total_obligation: Money,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
