use hourglass_rs::SafeTimeProvider;
use tracing::{debug, info};

use crate::application::RentalApplication;
use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::{self, PaymentOutcome};
use crate::query::{self, InstallmentFilter};
use crate::status::{refresh_statuses, StatusChange};
use crate::store::{RentalStore, UserDirectory, Versioned};
use crate::types::{LifecycleStatus, Location, MonthYear, PropertyOwner, RentalId, UserId};
use crate::view::OwnerSummary;

/// submission payload for a new rental application
#[derive(Debug, Clone)]
pub struct CreateRentalRequest {
    pub annual_rent_amount: Money,
    pub already_paid_amount: Money,
    pub property_owner: PropertyOwner,
    pub location: Location,
    pub attachment: Option<String>,
}

impl CreateRentalRequest {
    fn validate(&self) -> Result<()> {
        if self.property_owner.full_name.trim().is_empty() {
            return Err(LedgerError::Validation {
                message: "property owner full name is required".to_string(),
            });
        }
        if self.property_owner.phone.trim().is_empty() {
            return Err(LedgerError::Validation {
                message: "property owner phone is required".to_string(),
            });
        }
        if self.location.city.trim().is_empty() {
            return Err(LedgerError::Validation {
                message: "city is required".to_string(),
            });
        }
        if self.location.neighborhood.trim().is_empty() {
            return Err(LedgerError::Validation {
                message: "neighborhood is required".to_string(),
            });
        }
        Ok(())
    }
}

/// rental ledger service: the operations controllers call
///
/// owns nothing global; the store, user directory and clock are
/// injected capabilities. statuses are refreshed before every persist
/// and before every return, so stored and displayed state never diverge
/// by more than one recomputation cycle.
pub struct RentalService<S, U> {
    store: S,
    users: U,
    config: LedgerConfig,
    events: EventStore,
}

impl<S: RentalStore, U: UserDirectory> RentalService<S, U> {
    pub fn new(store: S, users: U, config: LedgerConfig) -> Self {
        Self {
            store,
            users,
            config,
            events: EventStore::new(),
        }
    }

    /// submit a new application
    ///
    /// admission: rejected while the user owns an application in any
    /// non-terminal status. uniqueness: the property owner's phone must
    /// not appear on any application nor belong to a user account.
    pub fn create_rental_application(
        &mut self,
        owner: UserId,
        request: CreateRentalRequest,
        time: &SafeTimeProvider,
    ) -> Result<RentalApplication> {
        request.validate()?;

        let phone = request.property_owner.phone.as_str();
        if self.store.find_by_property_owner_phone(phone)?.is_some() {
            return Err(LedgerError::PhoneInUse {
                phone: phone.to_string(),
            });
        }
        if self.users.find_user_by_phone(phone)?.is_some() {
            return Err(LedgerError::PhoneInUse {
                phone: phone.to_string(),
            });
        }

        if let Some(existing) = self.store.find_open_by_owner(owner)? {
            return Err(LedgerError::OpenApplicationExists {
                status: existing.lifecycle_status,
            });
        }

        let now = time.now();
        let mut application = RentalApplication::open(
            owner,
            request.annual_rent_amount,
            request.already_paid_amount,
            request.property_owner,
            request.location,
            request.attachment,
            now,
            &self.config,
        )?;

        refresh_statuses(&mut application.schedule, now);
        self.store.create(application.clone())?;

        info!(
            rental_id = %application.id,
            owner = %owner,
            total_obligation = %application.total_obligation(),
            "rental application created"
        );
        self.events.emit(Event::ApplicationCreated {
            rental_id: application.id,
            owner,
            annual_rent: application.annual_rent_amount,
            already_paid: application.already_paid_amount,
            total_obligation: application.total_obligation(),
            timestamp: now,
        });

        Ok(application)
    }

    /// settle the installment due in the selected month
    ///
    /// read-modify-write under optimistic concurrency: a stale version
    /// is retried once against a fresh read; a second conflict is
    /// surfaced to the caller.
    pub fn apply_installment_payment(
        &mut self,
        id: RentalId,
        selector: MonthYear,
        time: &SafeTimeProvider,
    ) -> Result<RentalApplication> {
        let now = time.now();
        let mut retried = false;

        loop {
            let Versioned {
                version,
                record: mut application,
            } = self
                .store
                .find_by_id(id)?
                .ok_or(LedgerError::NotFound { id })?;

            let changes = refresh_statuses(&mut application.schedule, now);

            match ledger::apply_payment(&mut application, selector)? {
                PaymentOutcome::AlreadyPaid { due_month } => {
                    debug!(rental_id = %id, month = %due_month, "payment already recorded");
                    self.events.emit(Event::PaymentAlreadyRecorded {
                        rental_id: id,
                        due_month,
                        timestamp: now,
                    });
                    return Ok(application);
                }
                PaymentOutcome::Applied { due_month, amount } => {
                    match self.store.conditional_update(version, application.clone()) {
                        Ok(()) => {
                            info!(
                                rental_id = %id,
                                month = %due_month,
                                amount = %amount,
                                amount_due = %application.amount_due,
                                "installment payment applied"
                            );
                            self.emit_status_changes(id, &changes);
                            self.events.emit(Event::InstallmentPaid {
                                rental_id: id,
                                due_month,
                                amount,
                                amount_paid: application.amount_paid,
                                amount_due: application.amount_due,
                                timestamp: now,
                            });
                            return Ok(application);
                        }
                        Err(LedgerError::UpdateConflict { .. }) if !retried => {
                            debug!(rental_id = %id, "version conflict, retrying with fresh read");
                            retried = true;
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }
    }

    /// all applications of a user, statuses refreshed for display
    pub fn list_applications(
        &self,
        owner: UserId,
        time: &SafeTimeProvider,
    ) -> Result<Vec<RentalApplication>> {
        let now = time.now();
        let mut applications = self.store.find_by_owner(owner)?;
        for application in &mut applications {
            refresh_statuses(&mut application.schedule, now);
        }
        debug!(owner = %owner, count = applications.len(), "listed rental applications");
        Ok(applications)
    }

    /// applications filtered down to matching installments
    pub fn filter_applications(
        &self,
        owner: UserId,
        filter: &InstallmentFilter,
        time: &SafeTimeProvider,
    ) -> Result<Vec<RentalApplication>> {
        if filter.is_empty() {
            return Err(LedgerError::Validation {
                message: "at least one filter (status or month/year) is required".to_string(),
            });
        }
        let applications = self.list_applications(owner, time)?;
        query::filter_applications(applications, filter)
    }

    /// fetch one application by id, statuses refreshed for display
    pub fn find_application(
        &self,
        id: RentalId,
        time: &SafeTimeProvider,
    ) -> Result<RentalApplication> {
        let Versioned {
            record: mut application,
            ..
        } = self
            .store
            .find_by_id(id)?
            .ok_or(LedgerError::NotFound { id })?;
        refresh_statuses(&mut application.schedule, time.now());
        Ok(application)
    }

    /// counterparty + lifecycle status per application, no ledger detail
    pub fn owner_summaries(&self, owner: UserId) -> Result<Vec<OwnerSummary>> {
        Ok(self
            .store
            .find_by_owner(owner)?
            .iter()
            .map(OwnerSummary::from_application)
            .collect())
    }

    /// move an application through its lifecycle (admin verification,
    /// activation, suspension, closure)
    pub fn update_lifecycle(
        &mut self,
        id: RentalId,
        to: LifecycleStatus,
        time: &SafeTimeProvider,
    ) -> Result<RentalApplication> {
        let now = time.now();
        let mut retried = false;

        loop {
            let Versioned {
                version,
                record: mut application,
            } = self
                .store
                .find_by_id(id)?
                .ok_or(LedgerError::NotFound { id })?;

            let changes = refresh_statuses(&mut application.schedule, now);
            let from = application.transition(to)?;

            match self.store.conditional_update(version, application.clone()) {
                Ok(()) => {
                    info!(rental_id = %id, ?from, ?to, "lifecycle transition");
                    self.emit_status_changes(id, &changes);
                    self.events.emit(Event::LifecycleChanged {
                        rental_id: id,
                        old_status: from,
                        new_status: to,
                        timestamp: now,
                    });
                    return Ok(application);
                }
                Err(LedgerError::UpdateConflict { .. }) if !retried => {
                    retried = true;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// explicitly reset the whole schedule with updated terms
    pub fn reset_schedule(
        &mut self,
        id: RentalId,
        annual_rent_amount: Money,
        already_paid_amount: Money,
        time: &SafeTimeProvider,
    ) -> Result<RentalApplication> {
        let now = time.now();
        let mut retried = false;

        loop {
            let Versioned {
                version,
                record: mut application,
            } = self
                .store
                .find_by_id(id)?
                .ok_or(LedgerError::NotFound { id })?;

            application.regenerate_schedule(
                annual_rent_amount,
                already_paid_amount,
                now,
                &self.config,
            )?;
            refresh_statuses(&mut application.schedule, now);
            ledger::recompute_aggregates(&mut application);

            match self.store.conditional_update(version, application.clone()) {
                Ok(()) => {
                    info!(
                        rental_id = %id,
                        total_obligation = %application.total_obligation(),
                        "schedule regenerated"
                    );
                    self.events.emit(Event::ScheduleRegenerated {
                        rental_id: id,
                        annual_rent: annual_rent_amount,
                        already_paid: already_paid_amount,
                        total_obligation: application.total_obligation(),
                        timestamp: now,
                    });
                    return Ok(application);
                }
                Err(LedgerError::UpdateConflict { .. }) if !retried => {
                    retried = true;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// drain events collected since the last call
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    fn emit_status_changes(&mut self, id: RentalId, changes: &[StatusChange]) {
        for change in changes {
            self.events.emit(Event::InstallmentStatusChanged {
                rental_id: id,
                due_month: change.due_month,
                old_status: change.old_status,
                new_status: change.new_status,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryRentalStore, InMemoryUserDirectory};
    use crate::types::InstallmentStatus;
    use chrono::{Duration, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2025, 8, 11, 9, 0, 0).unwrap(),
        ))
    }

    fn service() -> RentalService<InMemoryRentalStore, InMemoryUserDirectory> {
        RentalService::new(
            InMemoryRentalStore::new(),
            InMemoryUserDirectory::new(),
            LedgerConfig::default(),
        )
    }

    fn request(phone: &str) -> CreateRentalRequest {
        CreateRentalRequest {
            annual_rent_amount: Money::from_major(12_000),
            already_paid_amount: Money::ZERO,
            property_owner: PropertyOwner {
                full_name: "Kamran Guliyev".to_string(),
                phone: phone.to_string(),
                email: None,
                verification_status: Default::default(),
            },
            location: Location {
                city: "Baku".to_string(),
                neighborhood: "Narimanov".to_string(),
            },
            attachment: None,
        }
    }

    #[test]
    fn test_create_refreshes_statuses_before_persist() {
        let mut svc = service();
        let time = test_time();
        let app = svc
            .create_rental_application(Uuid::new_v4(), request("+994501000001"), &time)
            .unwrap();

        // anchor month is the current month
        assert_eq!(
            app.schedule.installments[0].status,
            InstallmentStatus::DueThisMonth
        );
        assert!(app.schedule.installments[1..]
            .iter()
            .all(|i| i.status == InstallmentStatus::Scheduled));

        let events = svc.take_events();
        assert!(matches!(events[0], Event::ApplicationCreated { .. }));
    }

    #[test]
    fn test_admission_blocks_second_open_application() {
        let mut svc = service();
        let time = test_time();
        let owner = Uuid::new_v4();

        let first = svc
            .create_rental_application(owner, request("+994501000002"), &time)
            .unwrap();
        svc.update_lifecycle(first.id, LifecycleStatus::Verified, &time)
            .unwrap();
        svc.update_lifecycle(first.id, LifecycleStatus::Active, &time)
            .unwrap();

        let err = svc
            .create_rental_application(owner, request("+994501000003"), &time)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::OpenApplicationExists {
                status: LifecycleStatus::Active
            }
        ));

        // closing the first application lifts the block
        svc.update_lifecycle(first.id, LifecycleStatus::Closed, &time)
            .unwrap();
        assert!(svc
            .create_rental_application(owner, request("+994501000003"), &time)
            .is_ok());
    }

    #[test]
    fn test_phone_uniqueness_across_applications() {
        let mut svc = service();
        let time = test_time();

        svc.create_rental_application(Uuid::new_v4(), request("+994501000004"), &time)
            .unwrap();
        let err = svc
            .create_rental_application(Uuid::new_v4(), request("+994501000004"), &time)
            .unwrap_err();
        assert!(matches!(err, LedgerError::PhoneInUse { .. }));
    }

    #[test]
    fn test_phone_uniqueness_against_user_accounts() {
        let store = InMemoryRentalStore::new();
        let users = InMemoryUserDirectory::new();
        users.register("+994501000005", Uuid::new_v4());
        let mut svc = RentalService::new(store, users, LedgerConfig::default());

        let err = svc
            .create_rental_application(Uuid::new_v4(), request("+994501000005"), &test_time())
            .unwrap_err();
        assert!(matches!(err, LedgerError::PhoneInUse { .. }));
    }

    #[test]
    fn test_create_validates_required_fields() {
        let mut svc = service();
        let mut bad = request("+994501000006");
        bad.property_owner.full_name = "  ".to_string();
        let err = svc
            .create_rental_application(Uuid::new_v4(), bad, &test_time())
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
    }

    #[test]
    fn test_payment_flow_and_idempotence() {
        let mut svc = service();
        let time = test_time();
        let app = svc
            .create_rental_application(Uuid::new_v4(), request("+994501000007"), &time)
            .unwrap();

        let paid = svc
            .apply_installment_payment(app.id, "September 2025".parse().unwrap(), &time)
            .unwrap();
        assert_eq!(paid.amount_paid, Money::from_major(1_200));
        assert_eq!(paid.amount_due, Money::from_major(13_200));

        // second call on the same month changes nothing, twice over
        let again = svc
            .apply_installment_payment(app.id, "September 2025".parse().unwrap(), &time)
            .unwrap();
        assert_eq!(again.amount_paid, paid.amount_paid);
        assert_eq!(again.amount_due, paid.amount_due);

        let stored = svc.find_application(app.id, &time).unwrap();
        assert_eq!(stored.amount_paid, Money::from_major(1_200));
    }

    #[test]
    fn test_payment_errors_are_distinct() {
        let mut svc = service();
        let time = test_time();
        let app = svc
            .create_rental_application(Uuid::new_v4(), request("+994501000008"), &time)
            .unwrap();

        // bad id vs well-formed query with no matching installment
        let err = svc
            .apply_installment_payment(Uuid::new_v4(), "September 2025".parse().unwrap(), &time)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));

        let err = svc
            .apply_installment_payment(app.id, "September 2030".parse().unwrap(), &time)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NoMatch { .. }));
    }

    #[test]
    fn test_list_refreshes_against_advanced_clock() {
        let mut svc = service();
        let time = test_time();
        let control = time.test_control().unwrap();
        let owner = Uuid::new_v4();
        svc.create_rental_application(owner, request("+994501000009"), &time)
            .unwrap();

        // two months later (oct 10): aug and sep overdue, oct due
        control.advance(Duration::days(60));
        let apps = svc.list_applications(owner, &time).unwrap();
        let statuses: Vec<InstallmentStatus> = apps[0]
            .schedule
            .installments
            .iter()
            .map(|i| i.status)
            .collect();
        assert_eq!(statuses[0], InstallmentStatus::Overdue);
        assert_eq!(statuses[1], InstallmentStatus::Overdue);
        assert_eq!(statuses[2], InstallmentStatus::DueThisMonth);
        assert_eq!(statuses[3], InstallmentStatus::Scheduled);
    }

    #[test]
    fn test_filter_requires_a_key() {
        let mut svc = service();
        let time = test_time();
        let owner = Uuid::new_v4();
        svc.create_rental_application(owner, request("+994501000010"), &time)
            .unwrap();

        let err = svc
            .filter_applications(owner, &InstallmentFilter::default(), &time)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));

        let filter = InstallmentFilter::from_params(Some("due-this-month"), None).unwrap();
        let hit = svc.filter_applications(owner, &filter, &time).unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].schedule.installments.len(), 1);
    }

    #[test]
    fn test_owner_summaries_are_slim() {
        let mut svc = service();
        let time = test_time();
        let owner = Uuid::new_v4();
        svc.create_rental_application(owner, request("+994501000011"), &time)
            .unwrap();

        let summaries = svc.owner_summaries(owner).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].property_owner.phone, "+994501000011");
        assert_eq!(summaries[0].lifecycle_status, LifecycleStatus::Pending);
    }

    #[test]
    fn test_reset_schedule_replaces_plan() {
        let mut svc = service();
        let time = test_time();
        let app = svc
            .create_rental_application(Uuid::new_v4(), request("+994501000012"), &time)
            .unwrap();
        svc.apply_installment_payment(app.id, "August 2025".parse().unwrap(), &time)
            .unwrap();

        let reset = svc
            .reset_schedule(app.id, Money::from_major(6_000), Money::ZERO, &time)
            .unwrap();
        assert_eq!(reset.total_obligation(), Money::from_major(7_200));
        assert_eq!(reset.amount_paid, Money::ZERO);
        assert_eq!(reset.amount_due, Money::from_major(7_200));
    }

    /// store double that rejects the first n conditional updates
    struct ContendedStore {
        inner: InMemoryRentalStore,
        conflicts_left: AtomicU32,
    }

    impl ContendedStore {
        fn new(conflicts: u32) -> Self {
            Self {
                inner: InMemoryRentalStore::new(),
                conflicts_left: AtomicU32::new(conflicts),
            }
        }
    }

    impl RentalStore for ContendedStore {
        fn create(&self, application: RentalApplication) -> crate::errors::Result<()> {
            self.inner.create(application)
        }

        fn find_by_id(
            &self,
            id: RentalId,
        ) -> crate::errors::Result<Option<Versioned<RentalApplication>>> {
            self.inner.find_by_id(id)
        }

        fn find_open_by_owner(
            &self,
            owner: UserId,
        ) -> crate::errors::Result<Option<RentalApplication>> {
            self.inner.find_open_by_owner(owner)
        }

        fn find_by_owner(&self, owner: UserId) -> crate::errors::Result<Vec<RentalApplication>> {
            self.inner.find_by_owner(owner)
        }

        fn find_by_property_owner_phone(
            &self,
            phone: &str,
        ) -> crate::errors::Result<Option<RentalApplication>> {
            self.inner.find_by_property_owner_phone(phone)
        }

        fn conditional_update(
            &self,
            expected_version: u64,
            application: RentalApplication,
        ) -> crate::errors::Result<()> {
            let contended = self
                .conflicts_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if contended {
                return Err(LedgerError::UpdateConflict { id: application.id });
            }
            self.inner.conditional_update(expected_version, application)
        }
    }

    #[test]
    fn test_single_conflict_is_retried() {
        let mut svc = RentalService::new(
            ContendedStore::new(1),
            InMemoryUserDirectory::new(),
            LedgerConfig::default(),
        );
        let time = test_time();
        let app = svc
            .create_rental_application(Uuid::new_v4(), request("+994501000013"), &time)
            .unwrap();

        let paid = svc
            .apply_installment_payment(app.id, "October 2025".parse().unwrap(), &time)
            .unwrap();
        assert_eq!(paid.amount_paid, Money::from_major(1_200));
    }

    #[test]
    fn test_second_conflict_surfaces() {
        let mut svc = RentalService::new(
            ContendedStore::new(2),
            InMemoryUserDirectory::new(),
            LedgerConfig::default(),
        );
        let time = test_time();
        let app = svc
            .create_rental_application(Uuid::new_v4(), request("+994501000014"), &time)
            .unwrap();

        let err = svc
            .apply_installment_payment(app.id, "October 2025".parse().unwrap(), &time)
            .unwrap_err();
        assert!(matches!(err, LedgerError::UpdateConflict { .. }));
    }

    #[test]
    fn test_lifecycle_events_emitted() {
        let mut svc = service();
        let time = test_time();
        let app = svc
            .create_rental_application(Uuid::new_v4(), request("+994501000015"), &time)
            .unwrap();
        svc.take_events();

        svc.update_lifecycle(app.id, LifecycleStatus::Verified, &time)
            .unwrap();
        let events = svc.take_events();
        assert!(events.iter().any(|e| matches!(
            e,
            Event::LifecycleChanged {
                old_status: LifecycleStatus::Pending,
                new_status: LifecycleStatus::Verified,
                ..
            }
        )));
    }

    #[test]
    fn test_fetch_unknown_id_is_not_found() {
        let svc = service();
        let err = svc
            .find_application(Uuid::new_v4(), &test_time())
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }
}
