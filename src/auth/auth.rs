use crate::{
    error::AppError,
    model::{employee::EmployeeRef, role::Role},
};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

/// Caller identity, placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| AppError::Unauthorized("Missing authentication".into())),
        )
    }
}

impl AuthUser {
    /// The caller's own employee record, required for any self-service action.
    pub fn employee_ref(&self) -> Result<EmployeeRef, AppError> {
        self.employee_id
            .map(EmployeeRef::from)
            .ok_or_else(|| AppError::forbidden("No employee profile"))
    }

    pub fn is_reviewer(&self) -> bool {
        self.role.can_review()
    }

    pub fn require_reviewer(&self) -> Result<(), AppError> {
        if self.is_reviewer() {
            Ok(())
        } else {
            Err(AppError::forbidden("Manager/HR/Admin only"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 10,
            username: "jane".into(),
            role,
            employee_id,
        }
    }

    #[test]
    fn reviewer_gate() {
        assert!(user(Role::Manager, Some(2)).require_reviewer().is_ok());
        assert!(matches!(
            user(Role::Employee, Some(1)).require_reviewer(),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn employee_ref_needs_a_profile() {
        assert_eq!(user(Role::Employee, Some(4)).employee_ref().unwrap(), EmployeeRef::Exact(4));
        assert!(user(Role::Admin, None).employee_ref().is_err());
    }
}
