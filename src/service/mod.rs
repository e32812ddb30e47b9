use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{error, warn};

use crate::{
    error::AppError,
    model::employee::{Employee, EmployeeRef},
    store::{EmployeeDirectory, TimeOffStore},
};

pub mod balance;
pub mod query;
pub mod time_off;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The leave request lifecycle: creation, review, cancellation, queries,
/// statistics and balance adjustments over the two persistence seams.
#[derive(Clone)]
pub struct TimeOffService {
    directory: Arc<dyn EmployeeDirectory>,
    store: Arc<dyn TimeOffStore>,
    clock: Arc<dyn Clock>,
}

impl TimeOffService {
    pub fn new(
        directory: Arc<dyn EmployeeDirectory>,
        store: Arc<dyn TimeOffStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            directory,
            store,
            clock,
        }
    }

    /// Typed-in numeric refs try the primary id first, then an employee code with the same
    /// digits. Token identities resolve by primary id only.
    pub(crate) async fn resolve_employee(&self, employee: &EmployeeRef) -> Result<Option<Employee>, AppError> {
        match employee {
            EmployeeRef::Id(id) => match self.directory.find_employee(*id).await? {
                Some(found) => Ok(Some(found)),
                None => Ok(self.directory.find_employee_by_code(&id.to_string()).await?),
            },
            EmployeeRef::Code(code) => Ok(self.directory.find_employee_by_code(code).await?),
            EmployeeRef::Exact(id) => Ok(self.directory.find_employee(*id).await?),
        }
    }
}

fn log_failure(operation: &'static str, err: &AppError) {
    match err {
        AppError::Internal(detail) => error!(operation, error = %detail, "Operation failed"),
        other => warn!(operation, code = other.code(), error = %other, "Operation rejected"),
    }
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp (reduced to its UTC calendar date).
pub(crate) fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, AppError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc).date_naive()))
        .map_err(|_| AppError::invalid_input(format!("Invalid date format for {field}: '{raw}'")))
}

/// Trims optional free text, drops it when blank and caps its length.
pub(crate) fn normalize_note(field: &str, raw: Option<String>) -> Result<Option<String>, AppError> {
    let Some(text) = raw.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    if text.chars().count() > crate::model::time_off::MAX_NOTE_LEN {
        return Err(AppError::invalid_input(format!(
            "{field} must be at most {} characters",
            crate::model::time_off::MAX_NOTE_LEN
        )));
    }
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_accept_plain_and_timestamp_forms() {
        let expected = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        assert_eq!(parse_date("starts_at", "2025-01-06").unwrap(), expected);
        assert_eq!(parse_date("starts_at", "2025-01-06T09:30:00Z").unwrap(), expected);
        assert!(matches!(
            parse_date("starts_at", "06/01/2025"),
            Err(AppError::InvalidInput(_))
        ));
        assert!(parse_date("ends_at", "2025-02-30").is_err());
    }

    #[test]
    fn notes_are_trimmed_and_capped() {
        assert_eq!(normalize_note("reason", Some("  ".into())).unwrap(), None);
        assert_eq!(
            normalize_note("reason", Some(" family trip ".into())).unwrap(),
            Some("family trip".into())
        );
        assert!(normalize_note("reason", Some("x".repeat(501))).is_err());
        assert!(normalize_note("reason", Some("é".repeat(500))).is_ok());
    }
}
