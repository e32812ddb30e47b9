use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::{info, instrument};
use utoipa::ToSchema;

use super::{TimeOffService, log_failure};
use crate::{
    error::AppError,
    model::{
        employee::{Employee, EmployeeRef},
        time_off::TimeOffType,
    },
};

/// Largest single manual adjustment, one leap year of days.
pub const MAX_ADJUSTMENT: u32 = 366;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BalanceOperation {
    Add,
    Subtract,
}

impl TimeOffService {
    #[instrument(name = "get_leave_balance", skip(self))]
    pub async fn get_leave_balance(&self, employee: &EmployeeRef) -> Result<Employee, AppError> {
        let result = match self.resolve_employee(employee).await {
            Ok(Some(found)) => Ok(found),
            Ok(None) => Err(AppError::not_found(format!("Employee with ID {employee} not found"))),
            Err(e) => Err(e),
        };
        result.inspect_err(|e| log_failure("get_leave_balance", e))
    }

    /// Manual correction of one balance bucket by someone other than its owner.
    #[instrument(name = "adjust_leave_balance", skip(self))]
    pub async fn adjust_leave_balance(
        &self,
        target: &EmployeeRef,
        actor: &EmployeeRef,
        time_off_type: TimeOffType,
        amount: u32,
        operation: BalanceOperation,
    ) -> Result<Employee, AppError> {
        self.adjust_inner(target, actor, time_off_type, amount, operation)
            .await
            .inspect_err(|e| log_failure("adjust_leave_balance", e))
    }

    async fn adjust_inner(
        &self,
        target: &EmployeeRef,
        actor: &EmployeeRef,
        time_off_type: TimeOffType,
        amount: u32,
        operation: BalanceOperation,
    ) -> Result<Employee, AppError> {
        if !(1..=MAX_ADJUSTMENT).contains(&amount) {
            return Err(AppError::invalid_input(format!(
                "amount must be between 1 and {MAX_ADJUSTMENT}"
            )));
        }
        let employee = self
            .resolve_employee(target)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Employee with ID {target} not found")))?;
        let actor = self
            .resolve_employee(actor)
            .await?
            .ok_or_else(|| AppError::not_found("Employee not found"))?;
        if actor.id == employee.id {
            return Err(AppError::forbidden("Cannot adjust your own leave balance"));
        }

        let delta = match operation {
            BalanceOperation::Add => i64::from(amount),
            BalanceOperation::Subtract => -i64::from(amount),
        };
        let updated = self
            .directory
            .update_balance(employee.id, time_off_type, delta)
            .await?;

        info!(
            employee_id = updated.id,
            actor_id = actor.id,
            %time_off_type,
            %operation,
            amount,
            balance = updated.leave_balance.get(time_off_type),
            "Leave balance adjusted"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixture;

    #[actix_web::test]
    async fn balance_lookup_by_id_or_code() {
        let fx = fixture();
        let by_code = fx
            .service
            .get_leave_balance(&EmployeeRef::Code("EMP-003".into()))
            .await
            .unwrap();
        assert_eq!(by_code.id, 3);
        assert_eq!(by_code.leave_balance.sick, 2);

        let err = fx.service.get_leave_balance(&EmployeeRef::Id(77)).await.unwrap_err();
        assert_eq!(err, AppError::NotFound("Employee with ID 77 not found".into()));
    }

    #[actix_web::test]
    async fn add_and_subtract() {
        let fx = fixture();
        let target = EmployeeRef::Id(1);
        let hr = EmployeeRef::Id(2);

        let after = fx
            .service
            .adjust_leave_balance(&target, &hr, TimeOffType::Casual, 3, BalanceOperation::Add)
            .await
            .unwrap();
        assert_eq!(after.leave_balance.casual, 8);

        let after = fx
            .service
            .adjust_leave_balance(&target, &hr, TimeOffType::Casual, 8, BalanceOperation::Subtract)
            .await
            .unwrap();
        assert_eq!(after.leave_balance.casual, 0);
        assert_eq!(fx.balance(1).await.annual, 30);
    }

    #[actix_web::test]
    async fn subtract_below_zero_is_refused() {
        let fx = fixture();
        let err = fx
            .service
            .adjust_leave_balance(
                &EmployeeRef::Id(3),
                &EmployeeRef::Id(2),
                TimeOffType::Sick,
                3,
                BalanceOperation::Subtract,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientBalance(_)));
        assert_eq!(fx.balance(3).await.sick, 2);
    }

    #[actix_web::test]
    async fn self_adjustment_and_zero_amount() {
        let fx = fixture();
        let err = fx
            .service
            .adjust_leave_balance(
                &EmployeeRef::Id(2),
                &EmployeeRef::Code("EMP-002".into()),
                TimeOffType::Annual,
                5,
                BalanceOperation::Add,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = fx
            .service
            .adjust_leave_balance(
                &EmployeeRef::Id(1),
                &EmployeeRef::Id(2),
                TimeOffType::Annual,
                0,
                BalanceOperation::Add,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[actix_web::test]
    async fn oversized_amount_is_invalid_input() {
        let fx = fixture();
        for amount in [MAX_ADJUSTMENT + 1, u32::MAX] {
            let err = fx
                .service
                .adjust_leave_balance(
                    &EmployeeRef::Id(1),
                    &EmployeeRef::Id(2),
                    TimeOffType::Annual,
                    amount,
                    BalanceOperation::Add,
                )
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidInput(_)), "{amount}: {err:?}");
        }
        assert_eq!(fx.balance(1).await.annual, 30);

        let after = fx
            .service
            .adjust_leave_balance(
                &EmployeeRef::Id(1),
                &EmployeeRef::Id(2),
                TimeOffType::Annual,
                MAX_ADJUSTMENT,
                BalanceOperation::Add,
            )
            .await
            .unwrap();
        assert_eq!(after.leave_balance.annual, 30 + MAX_ADJUSTMENT);
    }

    #[test]
    fn operation_wire_names() {
        assert_eq!(serde_json::to_string(&BalanceOperation::Subtract).unwrap(), "\"subtract\"");
        assert_eq!(BalanceOperation::Add.to_string(), "add");
    }
}
