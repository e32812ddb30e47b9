use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::{
    EmployeeDirectory, RecordQuery, SortDirection, SortField, StatRow, StatusPatch, StoreError,
    TimeOffStore,
};
use crate::model::{
    employee::Employee,
    time_off::{DateRange, NewTimeOff, TimeOffRequest, TimeOffStatus, TimeOffType},
};

#[derive(Default)]
struct State {
    employees: BTreeMap<u64, Employee>,
    time_offs: BTreeMap<u64, TimeOffRequest>,
    next_time_off_id: u64,
}

/// In-process backend. A single lock makes every operation serializable.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_employees(employees: impl IntoIterator<Item = Employee>) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.write() {
            state.employees = employees.into_iter().map(|e| (e.id, e)).collect();
        }
        store
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

fn has_overlap(state: &State, employee_id: u64, range: DateRange, exclude_id: Option<u64>) -> bool {
    state.time_offs.values().any(|t| {
        t.employee_id == employee_id
            && Some(t.id) != exclude_id
            && t.blocks_calendar()
            && t.range().overlaps(&range)
    })
}

fn compare(a: &TimeOffRequest, b: &TimeOffRequest, field: SortField) -> Ordering {
    match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortField::StartsAt => a.starts_at.cmp(&b.starts_at),
        SortField::EndsAt => a.ends_at.cmp(&b.ends_at),
        SortField::Status => a.status.as_ref().cmp(b.status.as_ref()),
        SortField::TimeOffType => a.time_off_type.as_ref().cmp(b.time_off_type.as_ref()),
    }
}

#[async_trait]
impl EmployeeDirectory for MemoryStore {
    async fn find_employee(&self, id: u64) -> Result<Option<Employee>, StoreError> {
        Ok(self.read()?.employees.get(&id).cloned())
    }

    async fn find_employee_by_code(&self, code: &str) -> Result<Option<Employee>, StoreError> {
        Ok(self
            .read()?
            .employees
            .values()
            .find(|e| e.employee_code == code)
            .cloned())
    }

    async fn update_balance(
        &self,
        id: u64,
        time_off_type: TimeOffType,
        delta: i64,
    ) -> Result<Employee, StoreError> {
        let mut state = self.write()?;
        let employee = state
            .employees
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Employee"))?;
        employee.leave_balance = employee
            .leave_balance
            .checked_apply(time_off_type, delta)
            .ok_or(StoreError::NegativeBalance)?;
        Ok(employee.clone())
    }
}

#[async_trait]
impl TimeOffStore for MemoryStore {
    async fn insert(&self, new: NewTimeOff) -> Result<TimeOffRequest, StoreError> {
        let mut state = self.write()?;
        if !state.employees.contains_key(&new.employee_id) {
            return Err(StoreError::NotFound("Employee"));
        }
        if has_overlap(&state, new.employee_id, new.range, None) {
            return Err(StoreError::Overlap);
        }

        state.next_time_off_id += 1;
        let record = TimeOffRequest {
            id: state.next_time_off_id,
            employee_id: new.employee_id,
            time_off_type: new.time_off_type,
            status: TimeOffStatus::Pending,
            starts_at: new.range.start(),
            ends_at: new.range.end(),
            reason: new.reason,
            reviewed_by: None,
            reviewed_at: None,
            review_note: None,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        state.time_offs.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<TimeOffRequest>, StoreError> {
        Ok(self.read()?.time_offs.get(&id).cloned())
    }

    async fn find_overlapping(
        &self,
        employee_id: u64,
        range: DateRange,
        exclude_id: Option<u64>,
    ) -> Result<bool, StoreError> {
        Ok(has_overlap(&*self.read()?, employee_id, range, exclude_id))
    }

    async fn query(&self, query: &RecordQuery) -> Result<(Vec<TimeOffRequest>, u64), StoreError> {
        let state = self.read()?;
        let mut matched: Vec<&TimeOffRequest> = state
            .time_offs
            .values()
            .filter(|t| query.filter.matches(t))
            .collect();

        matched.sort_by(|a, b| {
            query
                .sort
                .iter()
                .map(|key| match key.direction {
                    SortDirection::Asc => compare(a, b, key.field),
                    SortDirection::Desc => compare(b, a, key.field),
                })
                .find(|o| o.is_ne())
                .unwrap_or_else(|| b.id.cmp(&a.id))
        });

        let total = matched.len() as u64;
        let page = matched
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn aggregate(&self, employee_id: Option<u64>) -> Result<Vec<StatRow>, StoreError> {
        let state = self.read()?;
        let mut groups: BTreeMap<_, StatRow> = BTreeMap::new();
        for t in state
            .time_offs
            .values()
            .filter(|t| employee_id.is_none_or(|id| t.employee_id == id))
        {
            let row = groups.entry((t.status, t.time_off_type)).or_insert(StatRow {
                status: t.status,
                time_off_type: t.time_off_type,
                count: 0,
                total_days: 0,
            });
            row.count += 1;
            row.total_days += u64::from(t.duration_days());
        }
        Ok(groups.into_values().collect())
    }

    async fn update(&self, id: u64, patch: StatusPatch) -> Result<TimeOffRequest, StoreError> {
        let mut state = self.write()?;
        let record = state
            .time_offs
            .get_mut(&id)
            .ok_or(StoreError::NotFound("Time off request"))?;
        if record.status != patch.expected {
            return Err(StoreError::StaleState(record.status));
        }

        record.status = patch.status;
        if let Some(review) = patch.review {
            record.reviewed_by = Some(review.reviewed_by);
            record.reviewed_at = Some(review.reviewed_at);
            record.review_note = review.review_note;
        }
        record.updated_at = patch.updated_at;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::LeaveBalance;
    use crate::store::{RecordFilter, SortKey};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn employee(id: u64) -> Employee {
        Employee {
            id,
            employee_code: format!("EMP-{id:03}"),
            first_name: "Test".into(),
            last_name: "User".into(),
            email: format!("user{id}@company.com"),
            status: "active".into(),
            leave_balance: LeaveBalance::default(),
        }
    }

    fn new_time_off(employee_id: u64, start: &str, end: &str, hour: u32) -> NewTimeOff {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        NewTimeOff {
            employee_id,
            time_off_type: TimeOffType::Annual,
            range: DateRange::new(d(start), d(end)).unwrap(),
            reason: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap(),
        }
    }

    #[actix_web::test]
    async fn insert_rejects_overlap_for_same_employee_only() {
        let store = MemoryStore::with_employees([employee(1), employee(2)]);
        store.insert(new_time_off(1, "2025-01-06", "2025-01-10", 1)).await.unwrap();

        let err = store
            .insert(new_time_off(1, "2025-01-10", "2025-01-12", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Overlap));

        store.insert(new_time_off(2, "2025-01-06", "2025-01-10", 3)).await.unwrap();
    }

    #[actix_web::test]
    async fn update_balance_refuses_negative() {
        let store = MemoryStore::with_employees([employee(1)]);
        let err = store.update_balance(1, TimeOffType::Casual, -6).await.unwrap_err();
        assert!(matches!(err, StoreError::NegativeBalance));
        let found = store.find_employee(1).await.unwrap().unwrap();
        assert_eq!(found.leave_balance.casual, 5);
    }

    #[actix_web::test]
    async fn query_sorts_and_pages() {
        let store = MemoryStore::with_employees([employee(1)]);
        store.insert(new_time_off(1, "2025-02-01", "2025-02-01", 1)).await.unwrap();
        store.insert(new_time_off(1, "2025-01-01", "2025-01-01", 2)).await.unwrap();
        store.insert(new_time_off(1, "2025-03-01", "2025-03-01", 3)).await.unwrap();

        let query = RecordQuery {
            filter: RecordFilter::default(),
            sort: vec![SortKey::new(SortField::StartsAt, SortDirection::Asc)],
            skip: 1,
            limit: 1,
        };
        let (page, total) = store.query(&query).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].starts_at.to_string(), "2025-02-01");
    }

    #[actix_web::test]
    async fn stale_status_is_reported() {
        let store = MemoryStore::with_employees([employee(1)]);
        let record = store.insert(new_time_off(1, "2025-01-06", "2025-01-06", 1)).await.unwrap();
        let patch = StatusPatch {
            expected: TimeOffStatus::Approved,
            status: TimeOffStatus::Rejected,
            review: None,
            updated_at: record.created_at,
        };
        let err = store.update(record.id, patch).await.unwrap_err();
        assert!(matches!(err, StoreError::StaleState(TimeOffStatus::Pending)));
    }
}
