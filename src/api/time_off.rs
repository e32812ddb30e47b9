use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use super::{parse_enum, parse_ref};
use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::time_off::{ReviewDecision, TimeOffRequest, TimeOffStatus, TimeOffType},
    service::{
        TimeOffService, parse_date,
        query::{PageRequest, TimeOffFilter, TimeOffPage, parse_sort},
        time_off::{CreateTimeOff, ReviewTimeOff},
    },
    store::DateBounds,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateTimeOffBody {
    #[schema(example = "Annual")]
    pub time_off_type: TimeOffType,
    /// `YYYY-MM-DD` or an RFC 3339 timestamp
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub starts_at: String,
    #[schema(example = "2026-01-09", format = "date", value_type = String)]
    pub ends_at: String,
    #[schema(example = "Family trip")]
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewBody {
    #[schema(example = "Approved")]
    pub status: ReviewDecision,
    #[schema(example = "Enjoy the break")]
    pub review_note: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TimeOffListParams {
    /// Pending, Approved or Rejected (case-insensitive)
    #[param(example = "Pending")]
    pub status: Option<String>,
    /// Annual, Sick or Casual (case-insensitive)
    #[param(example = "Annual")]
    pub time_off_type: Option<String>,
    /// Employee id or employee code. Ignored for callers without a reviewer role.
    #[param(example = "EMP-001")]
    pub employee_id: Option<String>,
    /// Requests starting on or after this date
    #[param(example = "2026-01-01")]
    pub starts_from: Option<String>,
    /// Requests starting before this date
    pub starts_before: Option<String>,
    /// Requests ending on or after this date
    pub ends_from: Option<String>,
    /// Requests ending before this date
    pub ends_before: Option<String>,
    /// `field,DIR` pairs separated by `;`
    #[param(example = "startsAt,ASC;createdAt,DESC")]
    pub sort: Option<String>,
    /// 1-based page number
    #[param(example = 1)]
    pub page: Option<u32>,
    /// 0-based row offset, wins over `page`
    pub offset: Option<u32>,
    /// Page size, 1 to 100
    #[param(example = 10)]
    pub limit: Option<u32>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatsParams {
    /// Employee id or employee code. Defaults to the caller for non-reviewers.
    pub employee_id: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1,
    "time_off_type": "Annual",
    "status": "Pending",
    "starts_at": "2026-01-05",
    "ends_at": "2026-01-09",
    "duration_days": 5,
    "reason": "Family trip",
    "reviewed_by": null,
    "reviewed_at": null,
    "review_note": null,
    "created_at": "2026-01-01T09:00:00Z",
    "updated_at": "2026-01-01T09:00:00Z"
}))]
pub struct TimeOffResponse {
    pub id: u64,
    pub employee_id: u64,
    pub time_off_type: TimeOffType,
    pub status: TimeOffStatus,
    #[schema(format = "date", value_type = String)]
    pub starts_at: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub ends_at: NaiveDate,
    pub duration_days: u32,
    pub reason: Option<String>,
    pub reviewed_by: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_note: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl From<TimeOffRequest> for TimeOffResponse {
    fn from(t: TimeOffRequest) -> Self {
        Self {
            duration_days: t.duration_days(),
            id: t.id,
            employee_id: t.employee_id,
            time_off_type: t.time_off_type,
            status: t.status,
            starts_at: t.starts_at,
            ends_at: t.ends_at,
            reason: t.reason,
            reviewed_by: t.reviewed_by,
            reviewed_at: t.reviewed_at,
            review_note: t.review_note,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TimeOffListResponse {
    pub data: Vec<TimeOffResponse>,
    #[schema(example = 1)]
    pub count: u64,
    #[schema(example = 1)]
    pub total: u64,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 1)]
    pub page_count: u64,
}

impl From<TimeOffPage> for TimeOffListResponse {
    fn from(page: TimeOffPage) -> Self {
        Self {
            data: page.data.into_iter().map(TimeOffResponse::from).collect(),
            count: page.count,
            total: page.total,
            page: page.page,
            page_count: page.page_count,
        }
    }
}

fn optional_date(field: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    raw.filter(|v| !v.trim().is_empty())
        .map(|v| parse_date(field, v))
        .transpose()
}

/* =========================
Create time-off request
========================= */
#[utoipa::path(
    post,
    path = "/api/time-offs",
    request_body(
        content = CreateTimeOffBody,
        description = "Time-off request for the calling employee",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Request created in Pending state", body = TimeOffResponse),
        (status = 400, description = "Invalid dates, insufficient balance or overlapping request"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller has no employee profile"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "TimeOff"
)]
#[instrument(name = "api_create_time_off", skip_all, fields(user_id = auth.user_id, username = %auth.username))]
pub async fn create_time_off(
    auth: AuthUser,
    service: web::Data<TimeOffService>,
    payload: web::Json<CreateTimeOffBody>,
) -> Result<HttpResponse, AppError> {
    let employee = auth.employee_ref()?;
    let body = payload.into_inner();

    let created = service
        .create_time_off(CreateTimeOff {
            employee,
            time_off_type: body.time_off_type,
            starts_at: body.starts_at,
            ends_at: body.ends_at,
            reason: body.reason,
        })
        .await?;

    Ok(HttpResponse::Created().json(TimeOffResponse::from(created)))
}

/* =========================
List time-off requests
========================= */
#[utoipa::path(
    get,
    path = "/api/time-offs",
    params(TimeOffListParams),
    responses(
        (status = 200, description = "Paginated time-off requests", body = TimeOffListResponse),
        (status = 400, description = "Invalid filter, sort or pagination"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "TimeOff"
)]
#[instrument(name = "api_list_time_offs", skip_all, fields(user_id = auth.user_id))]
pub async fn list_time_offs(
    auth: AuthUser,
    service: web::Data<TimeOffService>,
    params: web::Query<TimeOffListParams>,
) -> Result<HttpResponse, AppError> {
    let params = params.into_inner();

    // non-reviewers only ever see their own requests
    let employee = if auth.is_reviewer() {
        params
            .employee_id
            .as_deref()
            .map(|raw| parse_ref("employee_id", raw))
            .transpose()?
    } else {
        Some(auth.employee_ref()?)
    };

    let filter = TimeOffFilter {
        status: parse_enum("status", params.status.as_deref())?,
        time_off_type: parse_enum("time_off_type", params.time_off_type.as_deref())?,
        employee,
        starts_at: DateBounds {
            from: optional_date("starts_from", params.starts_from.as_deref())?,
            before: optional_date("starts_before", params.starts_before.as_deref())?,
        },
        ends_at: DateBounds {
            from: optional_date("ends_from", params.ends_from.as_deref())?,
            before: optional_date("ends_before", params.ends_before.as_deref())?,
        },
    };
    let sort = parse_sort(params.sort.as_deref())?;
    let page = PageRequest {
        page: params.page,
        offset: params.offset,
        limit: params.limit,
    };

    let result = service.get_time_offs(filter, sort, page).await?;
    Ok(HttpResponse::Ok().json(TimeOffListResponse::from(result)))
}

/* =========================
Statistics
========================= */
#[utoipa::path(
    get,
    path = "/api/time-offs/stats",
    params(StatsParams),
    responses(
        (status = 200, description = "Counts and total days grouped by status, then type", body = [crate::service::query::StatusStats]),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "TimeOff"
)]
#[instrument(name = "api_time_off_stats", skip_all, fields(user_id = auth.user_id))]
pub async fn time_off_stats(
    auth: AuthUser,
    service: web::Data<TimeOffService>,
    params: web::Query<StatsParams>,
) -> Result<HttpResponse, AppError> {
    let requested = params
        .employee_id
        .as_deref()
        .map(|raw| parse_ref("employee_id", raw))
        .transpose()?;
    let employee = if auth.is_reviewer() {
        requested
    } else {
        let own = auth.employee_ref()?;
        if let Some(requested) = requested {
            // compare the employees both refs point at, not how they were spelled
            let target = service.resolve_employee(&requested).await?.map(|e| e.id);
            if target.is_none() || target != auth.employee_id {
                return Err(AppError::forbidden("Only reviewers may query other employees"));
            }
        }
        Some(own)
    };

    let stats = service.get_time_off_stats(employee.as_ref()).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/* =========================
Get one request
========================= */
#[utoipa::path(
    get,
    path = "/api/time-offs/{id}",
    params(
        ("id", Path, description = "Time-off request id")
    ),
    responses(
        (status = 200, description = "Time-off request", body = TimeOffResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Request belongs to another employee"),
        (status = 404, description = "Time off request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "TimeOff"
)]
#[instrument(name = "api_get_time_off", skip_all, fields(user_id = auth.user_id, time_off_id = *path))]
pub async fn get_time_off(
    auth: AuthUser,
    service: web::Data<TimeOffService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let record = service.get_time_off(path.into_inner()).await?;
    if !auth.is_reviewer() && auth.employee_id != Some(record.employee_id) {
        return Err(AppError::forbidden(
            "Not authorized to view this time off request",
        ));
    }
    Ok(HttpResponse::Ok().json(TimeOffResponse::from(record)))
}

/* =========================
Review (approve / reject)
========================= */
#[utoipa::path(
    patch,
    path = "/api/time-offs/{id}/review",
    params(
        ("id", Path, description = "Time-off request id")
    ),
    request_body = ReviewBody,
    responses(
        (status = 200, description = "Request reviewed", body = TimeOffResponse),
        (status = 400, description = "Not pending or insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not a reviewer, or own request"),
        (status = 404, description = "Request or reviewer not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "TimeOff"
)]
#[instrument(name = "api_review_time_off", skip_all, fields(user_id = auth.user_id, time_off_id = *path))]
pub async fn review_time_off(
    auth: AuthUser,
    service: web::Data<TimeOffService>,
    path: web::Path<u64>,
    payload: web::Json<ReviewBody>,
) -> Result<HttpResponse, AppError> {
    auth.require_reviewer()?;
    let reviewer = auth.employee_ref()?;
    let body = payload.into_inner();

    let updated = service
        .review_time_off(
            path.into_inner(),
            &reviewer,
            ReviewTimeOff {
                decision: body.status,
                review_note: body.review_note,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(TimeOffResponse::from(updated)))
}

/* =========================
Cancel own pending request
========================= */
#[utoipa::path(
    patch,
    path = "/api/time-offs/{id}/cancel",
    params(
        ("id", Path, description = "Time-off request id")
    ),
    responses(
        (status = 200, description = "Request cancelled (now Rejected)", body = TimeOffResponse),
        (status = 400, description = "Request is no longer pending"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Request belongs to another employee"),
        (status = 404, description = "Time off request not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "TimeOff"
)]
#[instrument(name = "api_cancel_time_off", skip_all, fields(user_id = auth.user_id, time_off_id = *path))]
pub async fn cancel_time_off(
    auth: AuthUser,
    service: web::Data<TimeOffService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let employee = auth.employee_ref()?;
    let updated = service.cancel_time_off(path.into_inner(), &employee).await?;
    Ok(HttpResponse::Ok().json(TimeOffResponse::from(updated)))
}
