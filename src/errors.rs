// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for services and handlers

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use thiserror::Error;

/// Application-specific error types
/// DOCUMENTATION: Every service returns Result<_, VangoError>.
/// "Nothing there" is expressed as Ok(None) by the services, so NotFound is
/// only raised where an HTTP route needs a 404.
#[derive(Error, Debug)]
pub enum VangoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Missing required fields")]
    MissingFields,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,
}

impl VangoError {
    fn code(&self) -> &'static str {
        match self {
            VangoError::NotFound(_) => "NOT_FOUND",
            VangoError::AlreadyExists(_) => "ALREADY_EXISTS",
            VangoError::DatabaseError(_) => "DATABASE_ERROR",
            VangoError::StorageError(_) => "STORAGE_ERROR",
            VangoError::InvalidInput(_) => "INVALID_INPUT",
            VangoError::ValidationError(_) => "VALIDATION_ERROR",
            VangoError::MissingFields => "MISSING_FIELDS",
            VangoError::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            VangoError::InternalError(_) => "INTERNAL_ERROR",
            VangoError::ExternalApiError(_) => "EXTERNAL_API_ERROR",
            VangoError::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
        }
    }
}

/// Convert VangoError to HTTP response
/// DOCUMENTATION: Body is {message, code, timestamp}; `message` is what
/// clients display.
impl ResponseError for VangoError {
    fn error_response(&self) -> HttpResponse {
        let body = json!({
            "message": self.to_string(),
            "code": self.code(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        HttpResponse::build(self.status_code()).json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            VangoError::NotFound(_) => StatusCode::NOT_FOUND,
            VangoError::AlreadyExists(_) => StatusCode::CONFLICT,
            VangoError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            VangoError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            VangoError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            VangoError::ValidationError(_) => StatusCode::BAD_REQUEST,
            VangoError::MissingFields => StatusCode::BAD_REQUEST,
            VangoError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            VangoError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            VangoError::ExternalApiError(_) => StatusCode::BAD_GATEWAY,
            VangoError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_rt::test]
    async fn test_missing_fields_body() {
        let response = VangoError::MissingFields.error_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Missing required fields");
        assert_eq!(body["code"], "MISSING_FIELDS");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            VangoError::MethodNotAllowed.status_code(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            VangoError::AlreadyExists("card".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            VangoError::ExternalApiError("down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }
}
