use std::str::FromStr;

use actix_web::{HttpRequest, HttpResponse, Responder, get};
use serde_json::json;

use crate::{error::AppError, model::employee::EmployeeRef};

pub mod employee;
pub mod time_off;

/// Liveness probe. Does not touch storage.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = Object, example = json!({ "status": "ok" }))
    ),
    tag = "Health"
)]
#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub(crate) fn parse_ref(field: &str, raw: &str) -> Result<EmployeeRef, AppError> {
    raw.parse()
        .map_err(|e| AppError::invalid_input(format!("Invalid {field}: {e}")))
}

/// Parses enum query values like `pending` or `ANNUAL`.
pub(crate) fn parse_enum<T: FromStr>(field: &str, raw: Option<&str>) -> Result<Option<T>, AppError> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| AppError::invalid_input(format!("Invalid {field}: '{v}'")))
        })
        .transpose()
}

/// Maps extractor failures (bad JSON, query or path) to the common error body.
pub fn extractor_error(err: impl std::fmt::Display, req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(path = %req.path(), error = %err, "Rejected malformed request");
    AppError::invalid_input(err.to_string()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::time_off::TimeOffStatus;

    #[test]
    fn enum_query_values() {
        assert_eq!(
            parse_enum::<TimeOffStatus>("status", Some("approved")).unwrap(),
            Some(TimeOffStatus::Approved)
        );
        assert_eq!(parse_enum::<TimeOffStatus>("status", Some(" ")).unwrap(), None);
        assert_eq!(parse_enum::<TimeOffStatus>("status", None).unwrap(), None);
        assert!(parse_enum::<TimeOffStatus>("status", Some("cancelled")).is_err());
    }

    #[test]
    fn employee_refs() {
        assert_eq!(parse_ref("employee_id", "12").unwrap(), EmployeeRef::Id(12));
        assert_eq!(
            parse_ref("employee_id", "EMP-012").unwrap(),
            EmployeeRef::Code("EMP-012".into())
        );
        assert!(parse_ref("employee_id", "").is_err());
    }
}
