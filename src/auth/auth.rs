use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::error::EvaluationError;
use crate::model::role::Role;

/// Caller identity placed in the request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user = req.extensions().get::<AuthUser>().cloned();

        ready(user.ok_or_else(|| {
            EvaluationError::Unauthorized("Missing authenticated user".to_string()).into()
        }))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), EvaluationError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(EvaluationError::Forbidden("Admin only".to_string()))
        }
    }
}
