//! Persistence seams for the leave lifecycle.
//!
//! `EmployeeDirectory` owns employees and their leave balances, `TimeOffStore`
//! owns time-off records. Both are implemented by [`MySqlStore`] for production
//! and by [`MemoryStore`] for local runs and tests.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use derive_more::Display;
use strum_macros::{AsRefStr, EnumString};

use crate::model::{
    employee::Employee,
    time_off::{DateRange, NewTimeOff, TimeOffRequest, TimeOffStatus, TimeOffType},
};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Display)]
pub enum StoreError {
    /// An active request already covers part of the range.
    #[display(fmt = "time-off range overlaps an existing request")]
    Overlap,
    /// The record left the expected status before the write landed.
    #[display(fmt = "time-off request is no longer pending (now {})", _0)]
    StaleState(TimeOffStatus),
    #[display(fmt = "balance would go negative")]
    NegativeBalance,
    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),
    #[display(fmt = "corrupt row: {}", _0)]
    Decode(String),
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
    #[display(fmt = "store lock poisoned")]
    Poisoned,
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    async fn find_employee(&self, id: u64) -> Result<Option<Employee>, StoreError>;

    async fn find_employee_by_code(&self, code: &str) -> Result<Option<Employee>, StoreError>;

    /// Atomically adds `delta` to one balance bucket and returns the updated employee.
    /// Fails with [`StoreError::NegativeBalance`] instead of going below zero.
    async fn update_balance(
        &self,
        id: u64,
        time_off_type: TimeOffType,
        delta: i64,
    ) -> Result<Employee, StoreError>;
}

/// Inclusive lower / exclusive upper bound on a date column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateBounds {
    pub from: Option<NaiveDate>,
    pub before: Option<NaiveDate>,
}

impl DateBounds {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.before.is_none_or(|before| date < before)
    }
}

/// Record-level filter, with the employee already resolved to a primary id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub status: Option<TimeOffStatus>,
    pub time_off_type: Option<TimeOffType>,
    pub employee_id: Option<u64>,
    pub starts_at: DateBounds,
    pub ends_at: DateBounds,
}

impl RecordFilter {
    pub fn matches(&self, record: &TimeOffRequest) -> bool {
        self.status.is_none_or(|s| record.status == s)
            && self.time_off_type.is_none_or(|t| record.time_off_type == t)
            && self.employee_id.is_none_or(|id| record.employee_id == id)
            && self.starts_at.contains(record.starts_at)
            && self.ends_at.contains(record.ends_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
pub enum SortField {
    #[strum(serialize = "createdAt", serialize = "created_at")]
    CreatedAt,
    #[strum(serialize = "updatedAt", serialize = "updated_at")]
    UpdatedAt,
    #[strum(serialize = "startsAt", serialize = "starts_at")]
    StartsAt,
    #[strum(serialize = "endsAt", serialize = "ends_at")]
    EndsAt,
    #[strum(serialize = "status")]
    Status,
    #[strum(serialize = "timeOffType", serialize = "time_off_type")]
    TimeOffType,
}

impl SortField {
    pub fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::UpdatedAt => "updated_at",
            SortField::StartsAt => "starts_at",
            SortField::EndsAt => "ends_at",
            SortField::Status => "status",
            SortField::TimeOffType => "time_off_type",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(ascii_case_insensitive)]
pub enum SortDirection {
    #[strum(serialize = "ASC")]
    Asc,
    #[strum(serialize = "DESC")]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    pub const fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordQuery {
    pub filter: RecordFilter,
    pub sort: Vec<SortKey>,
    pub skip: u64,
    pub limit: u64,
}

/// One `(status, type)` group of the statistics aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatRow {
    pub status: TimeOffStatus,
    pub time_off_type: TimeOffType,
    pub count: u64,
    pub total_days: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewStamp {
    pub reviewed_by: u64,
    pub reviewed_at: DateTime<Utc>,
    pub review_note: Option<String>,
}

/// Status write guarded by the status the caller last observed.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPatch {
    pub expected: TimeOffStatus,
    pub status: TimeOffStatus,
    pub review: Option<ReviewStamp>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait TimeOffStore: Send + Sync {
    /// Persists a `Pending` record. The overlap check and the insert are
    /// serialized per employee; a concurrent overlapping insert yields
    /// [`StoreError::Overlap`].
    async fn insert(&self, new: NewTimeOff) -> Result<TimeOffRequest, StoreError>;

    async fn find_by_id(&self, id: u64) -> Result<Option<TimeOffRequest>, StoreError>;

    /// True when a non-rejected record of `employee_id` shares a day with `range`.
    async fn find_overlapping(
        &self,
        employee_id: u64,
        range: DateRange,
        exclude_id: Option<u64>,
    ) -> Result<bool, StoreError>;

    /// Returns one page of records and the total number of matches.
    async fn query(&self, query: &RecordQuery) -> Result<(Vec<TimeOffRequest>, u64), StoreError>;

    async fn aggregate(&self, employee_id: Option<u64>) -> Result<Vec<StatRow>, StoreError>;

    async fn update(&self, id: u64, patch: StatusPatch) -> Result<TimeOffRequest, StoreError>;
}
