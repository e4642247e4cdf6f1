use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

use crate::api::response::ApiResponse;

/// Every failure an evaluation operation can surface to a caller.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// Malformed or out-of-range input, rejected before any write
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Key collision or an edit that would overwrite a Final evaluation
    #[error("{0}")]
    Conflict(String),

    /// Lifecycle transition not allowed from the record's current status
    #[error("{0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EvaluationError>;

// MySQL reports deadlocks between concurrent first writes of a key as 40001.
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";

impl From<sqlx::Error> for EvaluationError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return EvaluationError::Conflict(
                    "An evaluation already exists for this user and period".to_string(),
                );
            }
            if db_err.code().as_deref() == Some(SQLSTATE_SERIALIZATION_FAILURE) {
                return EvaluationError::Conflict(
                    "The evaluation was modified concurrently, please retry".to_string(),
                );
            }
        }

        EvaluationError::Internal(err.to_string())
    }
}

impl ResponseError for EvaluationError {
    fn status_code(&self) -> StatusCode {
        match self {
            EvaluationError::Validation(_) => StatusCode::BAD_REQUEST,
            EvaluationError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            EvaluationError::Forbidden(_) => StatusCode::FORBIDDEN,
            EvaluationError::NotFound(_) => StatusCode::NOT_FOUND,
            EvaluationError::Conflict(_) | EvaluationError::InvalidState(_) => StatusCode::CONFLICT,
            EvaluationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let EvaluationError::Internal(details) = self {
            tracing::error!(error = %details, "Evaluation request failed");
        }

        HttpResponse::build(self.status_code()).json(ApiResponse::failure(self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_errors_map_to_conflict_status() {
        assert_eq!(
            EvaluationError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            EvaluationError::InvalidState("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            EvaluationError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn row_not_found_is_internal() {
        let err: EvaluationError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, EvaluationError::Internal(_)));
    }
}
