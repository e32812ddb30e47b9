//! Fixtures shared by the unit and HTTP tests.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::{
    model::employee::{Employee, LeaveBalance},
    service::{Clock, TimeOffService},
    store::{EmployeeDirectory, MemoryStore},
};

pub const JWT_SECRET: &str = "test-secret";

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn employee_with(id: u64, leave_balance: LeaveBalance) -> Employee {
    Employee {
        id,
        employee_code: format!("EMP-{id:03}"),
        first_name: format!("First{id}"),
        last_name: format!("Last{id}"),
        email: format!("employee{id}@company.com"),
        status: "active".into(),
        leave_balance,
    }
}

pub struct Fixture {
    pub service: TimeOffService,
    pub store: Arc<MemoryStore>,
}

impl Fixture {
    pub async fn balance(&self, id: u64) -> LeaveBalance {
        self.store
            .find_employee(id)
            .await
            .unwrap()
            .unwrap()
            .leave_balance
    }
}

/// Employees 1 and 2 carry default balances; employee 3 has only 2 sick days.
/// Today is 2025-01-01.
pub fn fixture() -> Fixture {
    fixture_with(vec![
        employee_with(1, LeaveBalance::default()),
        employee_with(2, LeaveBalance::default()),
        employee_with(3, LeaveBalance { sick: 2, ..LeaveBalance::default() }),
    ])
}

pub fn fixture_with(employees: Vec<Employee>) -> Fixture {
    let store = Arc::new(MemoryStore::with_employees(employees));
    let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap()));
    let service = TimeOffService::new(store.clone(), store.clone(), clock);
    Fixture { service, store }
}
