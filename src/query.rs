use crate::application::RentalApplication;
use crate::errors::{LedgerError, Result};
use crate::schedule::Installment;
use crate::types::{InstallmentStatus, MonthYear};

/// installment filter: all supplied keys must match
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallmentFilter {
    pub status: Option<InstallmentStatus>,
    pub month_year: Option<MonthYear>,
}

impl InstallmentFilter {
    /// build from raw query parameters; both are parsed
    /// case-insensitively, and month/year must be an exact
    /// "MonthName Year" pair (substring matching is not supported)
    pub fn from_params(status: Option<&str>, month_year: Option<&str>) -> Result<Self> {
        Ok(Self {
            status: status.map(str::parse).transpose()?,
            month_year: month_year.map(str::parse).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.month_year.is_none()
    }

    fn matches(&self, installment: &Installment) -> bool {
        if let Some(status) = self.status {
            if installment.status != status {
                return false;
            }
        }
        if let Some(selector) = self.month_year {
            if !selector.contains(installment.due_instant) {
                return false;
            }
        }
        true
    }
}

/// keep only installments matching the filter, pruning each schedule
///
/// applications left with no matching installment are dropped from the
/// result entirely. the returned records are display views; they are
/// never written back. fails when no filter key is supplied.
pub fn filter_applications(
    applications: Vec<RentalApplication>,
    filter: &InstallmentFilter,
) -> Result<Vec<RentalApplication>> {
    if filter.is_empty() {
        return Err(LedgerError::Validation {
            message: "at least one filter (status or month/year) is required".to_string(),
        });
    }

    Ok(applications
        .into_iter()
        .filter_map(|mut application| {
            application
                .schedule
                .installments
                .retain(|i| filter.matches(i));
            if application.schedule.installments.is_empty() {
                None
            } else {
                Some(application)
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::decimal::Money;
    use crate::ledger::apply_payment;
    use crate::types::{Location, PropertyOwner};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn application(phone: &str) -> RentalApplication {
        RentalApplication::open(
            Uuid::new_v4(),
            Money::from_major(12_000),
            Money::ZERO,
            PropertyOwner {
                full_name: "Orkhan Huseynov".to_string(),
                phone: phone.to_string(),
                email: None,
                verification_status: Default::default(),
            },
            Location {
                city: "Baku".to_string(),
                neighborhood: "Nizami".to_string(),
            },
            None,
            Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap(),
            &LedgerConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_filter_is_rejected() {
        let err =
            filter_applications(vec![application("+994500000001")], &InstallmentFilter::default())
                .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { .. }));
    }

    #[test]
    fn test_status_filter_prunes_schedules() {
        let mut paid_app = application("+994500000002");
        apply_payment(&mut paid_app, "March 2025".parse().unwrap()).unwrap();
        apply_payment(&mut paid_app, "April 2025".parse().unwrap()).unwrap();
        let unpaid_app = application("+994500000003");

        let filter = InstallmentFilter::from_params(Some("paid"), None).unwrap();
        let result = filter_applications(vec![paid_app.clone(), unpaid_app], &filter).unwrap();

        // the all-unpaid application disappears entirely
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, paid_app.id);
        assert_eq!(result[0].schedule.installments.len(), 2);
        assert!(result[0].schedule.installments.iter().all(|i| i.is_paid()));
    }

    #[test]
    fn test_month_filter_is_exact_not_substring() {
        let app = application("+994500000004");

        // "March 2025" must not also match "March 2026" or partial text
        let filter = InstallmentFilter::from_params(None, Some("march 2025")).unwrap();
        let result = filter_applications(vec![app.clone()], &filter).unwrap();
        assert_eq!(result[0].schedule.installments.len(), 1);
        assert_eq!(result[0].schedule.installments[0].due_month().month, 3);

        // a bare month name is not a valid selector
        assert!(InstallmentFilter::from_params(None, Some("March")).is_err());
    }

    #[test]
    fn test_combined_filters_require_both() {
        let mut app = application("+994500000005");
        apply_payment(&mut app, "March 2025".parse().unwrap()).unwrap();

        let hit = InstallmentFilter::from_params(Some("paid"), Some("March 2025")).unwrap();
        let result = filter_applications(vec![app.clone()], &hit).unwrap();
        assert_eq!(result[0].schedule.installments.len(), 1);

        let miss = InstallmentFilter::from_params(Some("paid"), Some("April 2025")).unwrap();
        let result = filter_applications(vec![app], &miss).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_unknown_status_string_fails_validation() {
        assert!(InstallmentFilter::from_params(Some("ongoing"), None).is_err());
    }
}
