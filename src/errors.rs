use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound => AppError::NotFound,
            DomainError::DuplicateKey => {
                AppError::Conflict("A record with this key already exists".to_string())
            }
            DomainError::InsufficientStock { .. }
            | DomainError::InsufficientFunds
            | DomainError::InvalidAmount => AppError::Validation(e.to_string()),
            DomainError::Inconsistent(msg) | DomainError::Internal(msg) => {
                AppError::Internal(msg)
            }
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound => HttpResponse::NotFound().json(serde_json::json!({
                "error": self.to_string()
            })),
            AppError::Conflict(_) => HttpResponse::Conflict().json(serde_json::json!({
                "error": self.to_string()
            })),
            AppError::Validation(_) => HttpResponse::BadRequest().json(serde_json::json!({
                "error": self.to_string()
            })),
            AppError::Internal(_) => HttpResponse::InternalServerError().json(
                serde_json::json!({
                    "error": "Internal server error"
                }),
            ),
        }
    }
}
