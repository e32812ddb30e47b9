use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::store::StoreError;

/// Every failure the lifecycle can surface, with its HTTP mapping.
#[derive(Debug, Display, PartialEq)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    InvalidInput(String),
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "{}", _0)]
    InvalidState(String),
    #[display(fmt = "{}", _0)]
    InsufficientBalance(String),
    #[display(fmt = "{}", _0)]
    OverlapConflict(String),
    #[display(fmt = "{}", _0)]
    Unauthorized(String),
    #[display(fmt = "{}", _0)]
    Internal(String),
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::InsufficientBalance(_) => "INSUFFICIENT_BALANCE",
            AppError::OverlapConflict(_) => "OVERLAP_CONFLICT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        AppError::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_)
            | AppError::InvalidState(_)
            | AppError::InsufficientBalance(_)
            | AppError::OverlapConflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // internal details stay in the log
        let message = match self {
            AppError::Internal(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "error": message,
            "code": self.code(),
        }))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Overlap => {
                AppError::OverlapConflict("Time-off request overlaps with an existing request".into())
            }
            StoreError::StaleState(status) => AppError::InvalidState(format!(
                "Time off request is already {}",
                status.as_ref().to_lowercase()
            )),
            StoreError::NegativeBalance => {
                AppError::InsufficientBalance("Leave balance cannot go below zero".into())
            }
            StoreError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::time_off::TimeOffStatus;
    use actix_web::body::to_bytes;

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(AppError::invalid_input("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidState("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InsufficientBalance("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::OverlapConflict("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Internal("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn store_errors_map_to_kinds() {
        assert_eq!(AppError::from(StoreError::Overlap).code(), "OVERLAP_CONFLICT");
        assert_eq!(
            AppError::from(StoreError::StaleState(TimeOffStatus::Approved)),
            AppError::InvalidState("Time off request is already approved".into())
        );
        assert_eq!(AppError::from(StoreError::NegativeBalance).code(), "INSUFFICIENT_BALANCE");
        assert_eq!(
            AppError::from(StoreError::NotFound("Employee")),
            AppError::NotFound("Employee not found".into())
        );
        assert_eq!(AppError::from(StoreError::Poisoned).code(), "INTERNAL_ERROR");
    }

    #[actix_web::test]
    async fn internal_details_are_not_leaked() {
        let resp = AppError::Internal("connection refused".into()).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Internal Server Error");
        assert_eq!(value["code"], "INTERNAL_ERROR");
    }
}
