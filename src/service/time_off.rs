use tracing::{error, info, instrument};

use super::{TimeOffService, log_failure, normalize_note, parse_date};
use crate::{
    error::AppError,
    model::{
        employee::EmployeeRef,
        time_off::{
            DateRange, NewTimeOff, ReviewDecision, TimeOffEvent, TimeOffRequest, TimeOffStatus,
            TimeOffType,
        },
    },
    store::{ReviewStamp, StatusPatch},
};

#[derive(Debug, Clone)]
pub struct CreateTimeOff {
    pub employee: EmployeeRef,
    pub time_off_type: TimeOffType,
    pub starts_at: String,
    pub ends_at: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReviewTimeOff {
    pub decision: ReviewDecision,
    pub review_note: Option<String>,
}

fn insufficient(time_off_type: TimeOffType, available: u32, required: u32) -> AppError {
    AppError::InsufficientBalance(format!(
        "Insufficient {} leave balance. Available: {available}, Required: {required}",
        time_off_type.as_ref().to_lowercase()
    ))
}

fn illegal_transition(action: &str, status: TimeOffStatus) -> AppError {
    AppError::InvalidState(format!(
        "Cannot {action} {} time off request",
        status.as_ref().to_lowercase()
    ))
}

impl TimeOffService {
    #[instrument(name = "create_time_off", skip(self, input), fields(employee = %input.employee, time_off_type = %input.time_off_type))]
    pub async fn create_time_off(&self, input: CreateTimeOff) -> Result<TimeOffRequest, AppError> {
        self.create_inner(input)
            .await
            .inspect_err(|e| log_failure("create_time_off", e))
    }

    async fn create_inner(&self, input: CreateTimeOff) -> Result<TimeOffRequest, AppError> {
        let starts_at = parse_date("starts_at", &input.starts_at)?;
        let ends_at = parse_date("ends_at", &input.ends_at)?;
        let range = DateRange::new(starts_at, ends_at)
            .ok_or_else(|| AppError::invalid_input("Start date must be before end date"))?;

        if starts_at < self.clock.today() {
            return Err(AppError::invalid_input(
                "Cannot create time-off request for past dates",
            ));
        }
        let reason = normalize_note("reason", input.reason)?;

        let employee = self
            .resolve_employee(&input.employee)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Employee with ID {} not found", input.employee))
            })?;

        let duration = range.duration_days();
        let available = employee.leave_balance.get(input.time_off_type);
        if available < duration {
            return Err(insufficient(input.time_off_type, available, duration));
        }

        if self.store.find_overlapping(employee.id, range, None).await? {
            return Err(AppError::OverlapConflict(
                "Time-off request overlaps with an existing request".into(),
            ));
        }

        let record = self
            .store
            .insert(NewTimeOff {
                employee_id: employee.id,
                time_off_type: input.time_off_type,
                range,
                reason,
                created_at: self.clock.now(),
            })
            .await?;

        info!(
            time_off_id = record.id,
            employee_id = employee.id,
            days = duration,
            "Time-off request created"
        );
        Ok(record)
    }

    #[instrument(name = "get_time_off", skip(self))]
    pub async fn get_time_off(&self, id: u64) -> Result<TimeOffRequest, AppError> {
        let result = match self.store.find_by_id(id).await {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(AppError::not_found("Time off request not found")),
            Err(e) => Err(AppError::from(e)),
        };
        result.inspect_err(|e| log_failure("get_time_off", e))
    }

    #[instrument(name = "review_time_off", skip(self, review), fields(decision = %review.decision))]
    pub async fn review_time_off(
        &self,
        id: u64,
        reviewer: &EmployeeRef,
        review: ReviewTimeOff,
    ) -> Result<TimeOffRequest, AppError> {
        self.review_inner(id, reviewer, review)
            .await
            .inspect_err(|e| log_failure("review_time_off", e))
    }

    async fn review_inner(
        &self,
        id: u64,
        reviewer: &EmployeeRef,
        review: ReviewTimeOff,
    ) -> Result<TimeOffRequest, AppError> {
        let review_note = normalize_note("review_note", review.review_note)?;

        let request = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Time off request not found"))?;
        let reviewer = self
            .resolve_employee(reviewer)
            .await?
            .ok_or_else(|| AppError::not_found("Reviewer not found"))?;
        let owner = self
            .directory
            .find_employee(request.employee_id)
            .await?
            .ok_or_else(|| AppError::not_found("Employee not found"))?;

        if reviewer.id == owner.id {
            return Err(AppError::forbidden("Cannot review your own time off request"));
        }

        let next = request
            .status
            .apply(TimeOffEvent::Review(review.decision))
            .ok_or_else(|| illegal_transition("review", request.status))?;

        let debit = match review.decision {
            ReviewDecision::Approved => {
                let duration = request.duration_days();
                let available = owner.leave_balance.get(request.time_off_type);
                if available < duration {
                    return Err(insufficient(request.time_off_type, available, duration));
                }
                self.directory
                    .update_balance(owner.id, request.time_off_type, -i64::from(duration))
                    .await
                    .map_err(|e| match AppError::from(e) {
                        AppError::InsufficientBalance(_) => {
                            insufficient(request.time_off_type, available, duration)
                        }
                        other => other,
                    })?;
                Some(duration)
            }
            ReviewDecision::Rejected => None,
        };

        let now = self.clock.now();
        let patch = StatusPatch {
            expected: TimeOffStatus::Pending,
            status: next,
            review: Some(ReviewStamp {
                reviewed_by: reviewer.id,
                reviewed_at: now,
                review_note,
            }),
            updated_at: now,
        };

        let updated = match self.store.update(request.id, patch).await {
            Ok(updated) => updated,
            Err(store_err) => {
                if let Some(days) = debit {
                    // status write lost; hand the days back before surfacing the error
                    if let Err(refund_err) = self
                        .directory
                        .update_balance(owner.id, request.time_off_type, i64::from(days))
                        .await
                    {
                        error!(
                            time_off_id = request.id,
                            employee_id = owner.id,
                            days,
                            error = %refund_err,
                            "Failed to restore leave balance after aborted approval"
                        );
                    }
                }
                return Err(store_err.into());
            }
        };

        info!(
            time_off_id = updated.id,
            reviewer_id = reviewer.id,
            employee_id = owner.id,
            status = %updated.status,
            "Time-off request reviewed"
        );
        Ok(updated)
    }

    #[instrument(name = "cancel_time_off", skip(self))]
    pub async fn cancel_time_off(
        &self,
        id: u64,
        employee: &EmployeeRef,
    ) -> Result<TimeOffRequest, AppError> {
        self.cancel_inner(id, employee)
            .await
            .inspect_err(|e| log_failure("cancel_time_off", e))
    }

    async fn cancel_inner(
        &self,
        id: u64,
        employee: &EmployeeRef,
    ) -> Result<TimeOffRequest, AppError> {
        let request = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Time off request not found"))?;
        let employee = self
            .resolve_employee(employee)
            .await?
            .ok_or_else(|| AppError::not_found("Employee not found"))?;

        if request.employee_id != employee.id {
            return Err(AppError::forbidden(
                "Not authorized to cancel this time off request",
            ));
        }

        let next = request
            .status
            .apply(TimeOffEvent::Cancel)
            .ok_or_else(|| illegal_transition("cancel", request.status))?;

        let updated = self
            .store
            .update(
                request.id,
                StatusPatch {
                    expected: TimeOffStatus::Pending,
                    status: next,
                    review: None,
                    updated_at: self.clock.now(),
                },
            )
            .await?;

        info!(
            time_off_id = updated.id,
            employee_code = %employee.employee_code,
            "Time-off request cancelled"
        );
        Ok(updated)
    }
}
