//! Error handling for the splitbill HTTP relay
//!
//! Every failure is turned into a JSON body of the form
//! `{ "error": ..., "code": ..., "details": ... }` with a matching status code.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use splitbill_core::SplitError;
use thiserror::Error;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    /// Validation errors (400 Bad Request)
    #[error("Validation error: {message}")]
    Validation { message: String, details: Option<serde_json::Value> },

    /// Resource not found (404 Not Found)
    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    /// Request conflicts (409 Conflict)
    #[error("Request conflict: {message}")]
    Conflict { message: String },

    /// Image larger than the configured limit (413 Payload Too Large)
    #[error("Receipt image exceeds {limit_bytes} bytes")]
    PayloadTooLarge { limit_bytes: usize },

    /// Upload that is not an image (415 Unsupported Media Type)
    #[error("Unsupported media type: {mime_type}")]
    UnsupportedMediaType { mime_type: String },

    /// External service errors (502 Bad Gateway)
    #[error("External service error: {service}: {message}")]
    ExternalService { service: String, message: String },

    /// Internal server errors (500 Internal Server Error)
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ApiError {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::ExternalService { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Conflict { .. } => "CONFLICT",
            ApiError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            ApiError::UnsupportedMediaType { .. } => "UNSUPPORTED_MEDIA_TYPE",
            ApiError::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
            ApiError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Convert to ApiErrorResponse format for JSON serialization
    pub fn to_response(&self) -> ApiErrorResponse {
        let details = match self {
            ApiError::Validation { details, .. } => details.clone(),
            ApiError::ExternalService { service, .. } => {
                Some(serde_json::json!({ "service": service }))
            }
            ApiError::PayloadTooLarge { limit_bytes } => {
                Some(serde_json::json!({ "limitBytes": limit_bytes }))
            }
            _ => None,
        };

        ApiErrorResponse {
            error: self.user_message(),
            code: self.error_code().to_string(),
            details,
        }
    }

    /// Message shown to the user, without the category prefix
    fn user_message(&self) -> String {
        match self {
            ApiError::Validation { message, .. }
            | ApiError::Conflict { message }
            | ApiError::ExternalService { message, .. }
            | ApiError::Internal { message } => message.clone(),
            _ => self.to_string(),
        }
    }
}

/// JSON-serializable error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Human-readable message
    pub error: String,

    /// Error code
    pub code: String,

    /// Additional error details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "Request rejected");
        }
        (status, Json(self.to_response())).into_response()
    }
}

/// Convenience constructors for common error scenarios
impl ApiError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), details: None }
    }

    /// Create a simple internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}

impl From<SplitError> for ApiError {
    fn from(err: SplitError) -> Self {
        tracing::debug!(
            category = err.category(),
            recoverable = err.is_recoverable(),
            "Session operation failed"
        );
        match err {
            SplitError::Validation { errors } => {
                let details: Vec<serde_json::Value> = errors
                    .iter()
                    .map(|error| {
                        serde_json::json!({ "field": error.field(), "message": error.to_string() })
                    })
                    .collect();
                let message = errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
                ApiError::Validation { message, details: Some(serde_json::Value::Array(details)) }
            }
            SplitError::NotFound { kind, id } => ApiError::NotFound { resource: format!("{kind} {id}") },
            error @ SplitError::ExtractionInProgress => {
                ApiError::Conflict { message: error.to_string() }
            }
            SplitError::Extraction { message, .. } => {
                ApiError::ExternalService { service: "receipt-extractor".to_string(), message }
            }
        }
    }
}

/// A request body that could not be read as the expected JSON
///
/// Oversized bodies are handled by the caller, which knows the limit.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        let field = rejected_field(&message);
        ApiError::Validation {
            details: Some(serde_json::json!([{ "field": field, "message": message }])),
            message,
        }
    }
}

/// Field named by a JSON deserialization message, `body` when there is none
///
/// Handles missing-field messages and path-prefixed ones such as
/// `price: invalid type: ...`.
fn rejected_field(message: &str) -> String {
    let detail = message.split_once("target type: ").map_or(message, |(_, rest)| rest);

    let missing = detail.strip_prefix("missing field `").and_then(|rest| rest.split_once('`'));
    if let Some((field, _)) = missing {
        return field.to_string();
    }
    match detail.split_once(": ") {
        Some((path, _)) if !path.is_empty() && !path.contains(char::is_whitespace) => {
            path.to_string()
        }
        _ => "body".to_string(),
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use splitbill_core::{EntityKind, FieldError};

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::validation("bad").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(SplitError::item_not_found("x")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(SplitError::ExtractionInProgress).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(SplitError::extraction("timeout")).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::PayloadTooLarge { limit_bytes: 10 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_validation_details_list_each_field() {
        let error = ApiError::from(SplitError::validation(vec![
            FieldError::NameTooShort { kind: EntityKind::Product },
            FieldError::PriceTooHigh,
        ]));
        let body = error.to_response();

        assert_eq!(body.code, "VALIDATION_ERROR");
        assert_eq!(
            body.error,
            "Product name must be at least 2 characters; Price must not exceed 1,000,000"
        );
        let details = body.details.unwrap();
        assert_eq!(details[0]["field"], "name");
        assert_eq!(details[1]["field"], "price");
    }

    #[test]
    fn test_error_body_omits_empty_details() {
        let error = ApiError::NotFound { resource: "Person 42".to_string() };
        let body = serde_json::to_value(error.to_response()).unwrap();
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["error"], "Resource not found: Person 42");
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_rejected_field_names_the_offending_field() {
        let prefix = "Failed to deserialize the JSON body into the target type: ";
        assert_eq!(
            rejected_field(&format!("{prefix}missing field `name` at line 1 column 12")),
            "name"
        );
        assert_eq!(
            rejected_field(&format!(
                "{prefix}price: invalid type: string \"abc\", expected f64 at line 1 column 27"
            )),
            "price"
        );
        assert_eq!(
            rejected_field("Failed to parse the request body as JSON: EOF while parsing"),
            "body"
        );
        assert_eq!(
            rejected_field("Expected request with `Content-Type: application/json`"),
            "body"
        );
    }
}
