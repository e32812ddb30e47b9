use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use utoipa::ToSchema;

pub const MAX_NOTE_LEN: usize = 500;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, Display, EnumString, AsRefStr, IntoStaticStr, EnumIter, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum TimeOffType {
    Annual,
    Sick,
    Casual,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    Serialize, Deserialize, Display, EnumString, AsRefStr, IntoStaticStr, EnumIter, ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum TimeOffStatus {
    Pending,
    Approved,
    Rejected,
}

/// Outcome a reviewer may pick. `Pending` is deliberately not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for TimeOffStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => TimeOffStatus::Approved,
            ReviewDecision::Rejected => TimeOffStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOffEvent {
    Review(ReviewDecision),
    /// Owner withdraws a pending request. Lands in `Rejected`.
    Cancel,
}

impl TimeOffStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TimeOffStatus::Pending)
    }

    /// Returns the next status, or `None` when the event is illegal from `self`.
    pub fn apply(self, event: TimeOffEvent) -> Option<TimeOffStatus> {
        if self.is_terminal() {
            return None;
        }
        Some(match event {
            TimeOffEvent::Review(decision) => decision.into(),
            TimeOffEvent::Cancel => TimeOffStatus::Rejected,
        })
    }
}

/// Inclusive calendar-day range. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn duration_days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1) as u32
    }

    /// Two ranges overlap when they share at least one calendar day.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && self.end >= other.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeOffRequest {
    pub id: u64,
    pub employee_id: u64,
    pub time_off_type: TimeOffType,
    pub status: TimeOffStatus,
    pub starts_at: NaiveDate,
    pub ends_at: NaiveDate,
    pub reason: Option<String>,
    pub reviewed_by: Option<u64>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeOffRequest {
    pub fn range(&self) -> DateRange {
        // stored rows never violate start <= end; fall back to a single day if one does
        DateRange::new(self.starts_at, self.ends_at).unwrap_or(DateRange {
            start: self.starts_at,
            end: self.starts_at,
        })
    }

    pub fn duration_days(&self) -> u32 {
        self.range().duration_days()
    }

    pub fn blocks_calendar(&self) -> bool {
        self.status != TimeOffStatus::Rejected
    }
}

/// A validated request ready to be persisted in `Pending` state.
#[derive(Debug, Clone)]
pub struct NewTimeOff {
    pub employee_id: u64,
    pub time_off_type: TimeOffType,
    pub range: DateRange,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(a: &str, b: &str) -> DateRange {
        DateRange::new(date(a), date(b)).unwrap()
    }

    #[test]
    fn single_day_lasts_one_day() {
        assert_eq!(range("2025-01-06", "2025-01-06").duration_days(), 1);
    }

    #[test]
    fn five_day_span() {
        assert_eq!(range("2025-01-06", "2025-01-10").duration_days(), 5);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(DateRange::new(date("2025-01-10"), date("2025-01-06")).is_none());
    }

    #[test]
    fn overlap_is_inclusive_on_both_ends() {
        let a = range("2025-01-06", "2025-01-10");
        assert!(a.overlaps(&range("2025-01-08", "2025-01-09")));
        assert!(a.overlaps(&range("2025-01-10", "2025-01-12")));
        assert!(a.overlaps(&range("2025-01-01", "2025-01-06")));
        assert!(!a.overlaps(&range("2025-01-11", "2025-01-12")));
        assert!(!a.overlaps(&range("2025-01-01", "2025-01-05")));
    }

    #[test]
    fn pending_transitions() {
        let pending = TimeOffStatus::Pending;
        assert_eq!(
            pending.apply(TimeOffEvent::Review(ReviewDecision::Approved)),
            Some(TimeOffStatus::Approved)
        );
        assert_eq!(
            pending.apply(TimeOffEvent::Review(ReviewDecision::Rejected)),
            Some(TimeOffStatus::Rejected)
        );
        assert_eq!(pending.apply(TimeOffEvent::Cancel), Some(TimeOffStatus::Rejected));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for status in [TimeOffStatus::Approved, TimeOffStatus::Rejected] {
            assert!(status.is_terminal());
            assert_eq!(status.apply(TimeOffEvent::Cancel), None);
            assert_eq!(status.apply(TimeOffEvent::Review(ReviewDecision::Approved)), None);
            assert_eq!(status.apply(TimeOffEvent::Review(ReviewDecision::Rejected)), None);
        }
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!("annual".parse::<TimeOffType>().unwrap(), TimeOffType::Annual);
        assert_eq!("PENDING".parse::<TimeOffStatus>().unwrap(), TimeOffStatus::Pending);
        assert_eq!(TimeOffType::Casual.as_ref(), "Casual");
        assert!("Unpaid".parse::<TimeOffType>().is_err());
    }
}
