use std::collections::HashMap;
use std::sync::Mutex;

use crate::application::RentalApplication;
use crate::errors::{LedgerError, Result};
use crate::types::{RentalId, UserId};

/// a record together with its optimistic-concurrency version
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub record: T,
}

/// persistence capability for rental applications
///
/// an explicitly passed handle; the core never owns a process-wide
/// connection. `conditional_update` is the single mutation primitive:
/// it is atomic and fails with a conflict when the stored version has
/// moved past `expected_version`, so two concurrent read-modify-write
/// cycles can never both settle the same installment.
pub trait RentalStore {
    fn create(&self, application: RentalApplication) -> Result<()>;

    fn find_by_id(&self, id: RentalId) -> Result<Option<Versioned<RentalApplication>>>;

    /// any application of this user in a non-terminal status
    fn find_open_by_owner(&self, owner: UserId) -> Result<Option<RentalApplication>>;

    /// all applications of this user, in insertion order
    fn find_by_owner(&self, owner: UserId) -> Result<Vec<RentalApplication>>;

    fn find_by_property_owner_phone(&self, phone: &str) -> Result<Option<RentalApplication>>;

    fn conditional_update(
        &self,
        expected_version: u64,
        application: RentalApplication,
    ) -> Result<()>;
}

/// user-account lookup capability, used only for the phone uniqueness
/// check at admission
pub trait UserDirectory {
    fn find_user_by_phone(&self, phone: &str) -> Result<Option<UserId>>;
}

/// mutex-guarded in-memory store for tests and embedded use
#[derive(Debug, Default)]
pub struct InMemoryRentalStore {
    inner: Mutex<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    records: HashMap<RentalId, Versioned<RentalApplication>>,
    insertion_order: Vec<RentalId>,
}

impl InMemoryRentalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreInner>> {
        self.inner.lock().map_err(|_| LedgerError::Storage {
            message: "store mutex poisoned".to_string(),
        })
    }
}

impl RentalStore for InMemoryRentalStore {
    fn create(&self, application: RentalApplication) -> Result<()> {
        let mut inner = self.lock()?;
        let id = application.id;
        if inner.records.contains_key(&id) {
            return Err(LedgerError::Storage {
                message: format!("duplicate application id: {}", id),
            });
        }
        inner.records.insert(
            id,
            Versioned {
                version: 1,
                record: application,
            },
        );
        inner.insertion_order.push(id);
        Ok(())
    }

    fn find_by_id(&self, id: RentalId) -> Result<Option<Versioned<RentalApplication>>> {
        Ok(self.lock()?.records.get(&id).cloned())
    }

    fn find_open_by_owner(&self, owner: UserId) -> Result<Option<RentalApplication>> {
        let inner = self.lock()?;
        Ok(inner
            .insertion_order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .map(|v| &v.record)
            .find(|r| r.owner == owner && r.is_open())
            .cloned())
    }

    fn find_by_owner(&self, owner: UserId) -> Result<Vec<RentalApplication>> {
        let inner = self.lock()?;
        Ok(inner
            .insertion_order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .map(|v| &v.record)
            .filter(|r| r.owner == owner)
            .cloned()
            .collect())
    }

    fn find_by_property_owner_phone(&self, phone: &str) -> Result<Option<RentalApplication>> {
        let inner = self.lock()?;
        Ok(inner
            .insertion_order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .map(|v| &v.record)
            .find(|r| r.property_owner.phone == phone)
            .cloned())
    }

    fn conditional_update(
        &self,
        expected_version: u64,
        application: RentalApplication,
    ) -> Result<()> {
        let mut inner = self.lock()?;
        let id = application.id;
        let entry = inner
            .records
            .get_mut(&id)
            .ok_or(LedgerError::NotFound { id })?;
        if entry.version != expected_version {
            return Err(LedgerError::UpdateConflict { id });
        }
        entry.version += 1;
        entry.record = application;
        Ok(())
    }
}

/// in-memory user directory keyed by phone number
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: Mutex<HashMap<String, UserId>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, phone: &str, user: UserId) {
        if let Ok(mut users) = self.users.lock() {
            users.insert(phone.to_string(), user);
        }
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find_user_by_phone(&self, phone: &str) -> Result<Option<UserId>> {
        let users = self.users.lock().map_err(|_| LedgerError::Storage {
            message: "user directory mutex poisoned".to_string(),
        })?;
        Ok(users.get(phone).copied())
    }
}
