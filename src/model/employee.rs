use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::time_off::TimeOffType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "annual": 30, "sick": 10, "casual": 5 }))]
pub struct LeaveBalance {
    pub annual: u32,
    pub sick: u32,
    pub casual: u32,
}

impl Default for LeaveBalance {
    fn default() -> Self {
        Self {
            annual: 30,
            sick: 10,
            casual: 5,
        }
    }
}

impl LeaveBalance {
    pub fn get(&self, time_off_type: TimeOffType) -> u32 {
        match time_off_type {
            TimeOffType::Annual => self.annual,
            TimeOffType::Sick => self.sick,
            TimeOffType::Casual => self.casual,
        }
    }

    /// Applies `delta` to one bucket. `None` if the bucket would go negative or overflow.
    pub fn checked_apply(&self, time_off_type: TimeOffType, delta: i64) -> Option<Self> {
        let next = i64::from(self.get(time_off_type)).checked_add(delta)?;
        let next = u32::try_from(next).ok()?;
        let mut balance = *self;
        match time_off_type {
            TimeOffType::Annual => balance.annual = next,
            TimeOffType::Sick => balance.sick = next,
            TimeOffType::Casual => balance.casual = next,
        }
        Some(balance)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "status": "active",
        "leave_balance": { "annual": 30, "sick": 10, "casual": 5 }
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "active")]
    pub status: String,

    #[serde(default)]
    pub leave_balance: LeaveBalance,
}

/// How callers point at an employee: primary id or employee code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmployeeRef {
    /// Typed-in number. Tried as a primary id, then as an employee code.
    Id(u64),
    Code(String),
    /// Primary id from a verified token. Never falls back to a code.
    Exact(u64),
}

impl FromStr for EmployeeRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("employee reference must not be empty".to_string());
        }
        Ok(match s.parse::<u64>() {
            Ok(id) => EmployeeRef::Id(id),
            Err(_) => EmployeeRef::Code(s.to_string()),
        })
    }
}

impl fmt::Display for EmployeeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmployeeRef::Id(id) | EmployeeRef::Exact(id) => write!(f, "{id}"),
            EmployeeRef::Code(code) => f.write_str(code),
        }
    }
}

impl From<u64> for EmployeeRef {
    fn from(id: u64) -> Self {
        EmployeeRef::Exact(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_refs_parse_as_ids() {
        assert_eq!("42".parse::<EmployeeRef>().unwrap(), EmployeeRef::Id(42));
        assert_eq!(
            "EMP-001".parse::<EmployeeRef>().unwrap(),
            EmployeeRef::Code("EMP-001".into())
        );
        assert!("  ".parse::<EmployeeRef>().is_err());
    }

    #[test]
    fn token_ids_are_exact() {
        assert_eq!(EmployeeRef::from(7), EmployeeRef::Exact(7));
        assert_eq!(EmployeeRef::Exact(7).to_string(), "7");
    }

    #[test]
    fn balance_never_goes_negative() {
        let balance = LeaveBalance {
            annual: 30,
            sick: 2,
            casual: 0,
        };
        assert_eq!(balance.checked_apply(TimeOffType::Annual, -5).unwrap().annual, 25);
        assert!(balance.checked_apply(TimeOffType::Sick, -3).is_none());
        assert_eq!(balance.checked_apply(TimeOffType::Casual, 4).unwrap().casual, 4);
        assert_eq!(balance.checked_apply(TimeOffType::Sick, -2).unwrap().sick, 0);
    }
}
