pub mod application;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod query;
pub mod schedule;
pub mod service;
pub mod status;
pub mod store;
pub mod types;
pub mod view;

// re-export key types
pub use application::RentalApplication;
pub use config::LedgerConfig;
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use ledger::PaymentOutcome;
pub use query::InstallmentFilter;
pub use schedule::{Installment, PaymentSchedule};
pub use service::{CreateRentalRequest, RentalService};
pub use status::{refresh_statuses, StatusChange};
pub use store::{
    InMemoryRentalStore, InMemoryUserDirectory, RentalStore, UserDirectory, Versioned,
};
pub use types::{
    InstallmentStatus, LifecycleStatus, Location, MonthYear, PropertyOwner, RentalId, UserId,
    VerificationStatus,
};
pub use view::{OwnerSummary, RentalApplicationView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
