use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::ToSchema;

use super::parse_ref;
use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::{
        employee::{Employee, LeaveBalance},
        time_off::TimeOffType,
    },
    service::{TimeOffService, balance::BalanceOperation},
};

#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "employee_id": 1,
    "employee_code": "EMP-001",
    "first_name": "John",
    "last_name": "Doe",
    "leave_balance": { "annual": 30, "sick": 10, "casual": 5 }
}))]
pub struct BalanceResponse {
    pub employee_id: u64,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
    pub leave_balance: LeaveBalance,
}

impl From<Employee> for BalanceResponse {
    fn from(e: Employee) -> Self {
        Self {
            employee_id: e.id,
            employee_code: e.employee_code,
            first_name: e.first_name,
            last_name: e.last_name,
            leave_balance: e.leave_balance,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct AdjustBalanceBody {
    #[schema(example = "Casual")]
    pub time_off_type: TimeOffType,
    #[schema(example = 2, minimum = 1, maximum = 366)]
    pub amount: u32,
    #[schema(example = "add")]
    pub operation: BalanceOperation,
}

#[utoipa::path(
    get,
    path = "/api/employees/{employee_ref}/leave-balance",
    params(
        ("employee_ref", Path, description = "Employee id or employee code")
    ),
    responses(
        (status = 200, description = "Current leave balance", body = BalanceResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Another employee's balance"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
#[instrument(name = "api_get_leave_balance", skip_all, fields(user_id = auth.user_id, employee = %path))]
pub async fn get_leave_balance(
    auth: AuthUser,
    service: web::Data<TimeOffService>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let target = parse_ref("employee reference", &path)?;
    let employee = service.get_leave_balance(&target).await?;

    if !auth.is_reviewer() && auth.employee_id != Some(employee.id) {
        return Err(AppError::forbidden(
            "Not authorized to view this leave balance",
        ));
    }
    Ok(HttpResponse::Ok().json(BalanceResponse::from(employee)))
}

#[utoipa::path(
    patch,
    path = "/api/employees/{employee_ref}/leave-balance",
    params(
        ("employee_ref", Path, description = "Employee id or employee code")
    ),
    request_body = AdjustBalanceBody,
    responses(
        (status = 200, description = "Balance adjusted", body = BalanceResponse),
        (status = 400, description = "Amount outside 1..=366 or balance would go below zero"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a reviewer, or own balance"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
#[instrument(name = "api_adjust_leave_balance", skip_all, fields(user_id = auth.user_id, employee = %path))]
pub async fn adjust_leave_balance(
    auth: AuthUser,
    service: web::Data<TimeOffService>,
    path: web::Path<String>,
    payload: web::Json<AdjustBalanceBody>,
) -> Result<HttpResponse, AppError> {
    auth.require_reviewer()?;
    let actor = auth.employee_ref()?;
    let target = parse_ref("employee reference", &path)?;
    let body = payload.into_inner();

    let updated = service
        .adjust_leave_balance(&target, &actor, body.time_off_type, body.amount, body.operation)
        .await?;
    Ok(HttpResponse::Ok().json(BalanceResponse::from(updated)))
}
