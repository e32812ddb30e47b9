use crate::api::employee::{AdjustBalanceBody, BalanceResponse};
use crate::api::time_off::{
    CreateTimeOffBody, ReviewBody, TimeOffListResponse, TimeOffResponse,
};
use crate::model::employee::LeaveBalance;
use crate::model::time_off::{ReviewDecision, TimeOffStatus, TimeOffType};
use crate::service::balance::BalanceOperation;
use crate::service::query::{StatusStats, TypeStats};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Time-Off API",
        version = "1.0.0",
        description = r#"
## Time-Off Management

Employees file time-off requests against per-type leave balances
(**Annual**, **Sick**, **Casual**). Managers, HR and admins review them.

### Lifecycle
- Requests start **Pending**
- A reviewer other than the requester moves them to **Approved** or **Rejected**
- Approval debits the leave balance by the inclusive day count
- The owner may cancel a pending request, which marks it **Rejected**

### Security
All endpoints except `/health` require a **JWT Bearer** access token.

### Errors
Failures return `{"error": "...", "code": "..."}` with codes such as
`INVALID_INPUT`, `INSUFFICIENT_BALANCE`, `OVERLAP_CONFLICT` or `INVALID_STATE`.
"#,
    ),
    paths(
        crate::api::health,

        crate::api::time_off::create_time_off,
        crate::api::time_off::list_time_offs,
        crate::api::time_off::time_off_stats,
        crate::api::time_off::get_time_off,
        crate::api::time_off::review_time_off,
        crate::api::time_off::cancel_time_off,

        crate::api::employee::get_leave_balance,
        crate::api::employee::adjust_leave_balance
    ),
    components(
        schemas(
            CreateTimeOffBody,
            ReviewBody,
            TimeOffResponse,
            TimeOffListResponse,
            StatusStats,
            TypeStats,
            TimeOffType,
            TimeOffStatus,
            ReviewDecision,
            LeaveBalance,
            BalanceResponse,
            AdjustBalanceBody,
            BalanceOperation
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "TimeOff", description = "Time-off request lifecycle APIs"),
        (name = "Employee", description = "Leave balance APIs"),
        (name = "Health", description = "Liveness probe"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by the protected paths.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
