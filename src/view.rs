/// serialization support for transport layers
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::RentalApplication;
use crate::decimal::{Money, Rate};
use crate::types::{InstallmentStatus, LifecycleStatus, Location, PropertyOwner, RentalId, UserId};

/// serializable view of a rental application and its ledger
#[derive(Debug, Serialize, Deserialize)]
pub struct RentalApplicationView {
    pub id: RentalId,
    pub owner: UserId,
    pub lifecycle_status: LifecycleStatus,
    pub created_at: DateTime<Utc>,
    pub financial: FinancialView,
    pub property_owner: PropertyOwner,
    pub location: Location,
    pub attachment: Option<String>,
    pub schedule: Vec<InstallmentView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinancialView {
    pub annual_rent_amount: Money,
    pub already_paid_amount: Money,
    pub interest_rate: Rate,
    pub interest_amount: Money,
    pub monthly_installment: Money,
    pub total_obligation: Money,
    pub amount_paid: Money,
    pub amount_due: Money,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InstallmentView {
    pub due_instant: DateTime<Utc>,
    /// resolved "MonthName Year" label, e.g. "August 2025"
    pub due_month: String,
    pub amount: Money,
    pub status: InstallmentStatus,
}

impl RentalApplicationView {
    pub fn from_application(application: &RentalApplication) -> Self {
        RentalApplicationView {
            id: application.id,
            owner: application.owner,
            lifecycle_status: application.lifecycle_status,
            created_at: application.created_at,
            financial: FinancialView {
                annual_rent_amount: application.annual_rent_amount,
                already_paid_amount: application.already_paid_amount,
                interest_rate: application.interest_rate,
                interest_amount: application.interest_amount(),
                monthly_installment: application.monthly_installment(),
                total_obligation: application.total_obligation(),
                amount_paid: application.amount_paid,
                amount_due: application.amount_due,
            },
            property_owner: application.property_owner.clone(),
            location: application.location.clone(),
            attachment: application.attachment.clone(),
            schedule: application
                .schedule
                .installments
                .iter()
                .map(|i| InstallmentView {
                    due_instant: i.due_instant,
                    due_month: i.due_month().to_string(),
                    amount: i.amount,
                    status: i.status,
                })
                .collect(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// slim projection: who the counterparty is and where the application
/// stands, without the ledger detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerSummary {
    pub rental_id: RentalId,
    pub property_owner: PropertyOwner,
    pub lifecycle_status: LifecycleStatus,
}

impl OwnerSummary {
    pub fn from_application(application: &RentalApplication) -> Self {
        Self {
            rental_id: application.id,
            property_owner: application.property_owner.clone(),
            lifecycle_status: application.lifecycle_status,
        }
    }
}
