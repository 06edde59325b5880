//! Error handling for bill session operations
//!
//! A failed call never leaves the bill half-changed. Only extraction
//! failures are worth retrying with the same input. The HTTP layer maps
//! these variants onto status codes.

use thiserror::Error;

use crate::validation::{EntityKind, FieldError};

/// Error type for bill session operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplitError {
    /// One or more fields of a new entry or charge update were rejected
    #[error("Validation failed: {}", join_messages(.errors))]
    Validation { errors: Vec<FieldError> },

    /// A person or line item id that is not part of the bill
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// A receipt extraction is already pending for this session
    #[error("Receipt extraction already in progress")]
    ExtractionInProgress,

    /// The extraction collaborator failed
    #[error("Extraction error: {message}")]
    Extraction { message: String, source_details: Option<String> },
}

fn join_messages(errors: &[FieldError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

impl SplitError {
    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            SplitError::Validation { .. } => "validation",
            SplitError::NotFound { .. } => "not_found",
            SplitError::ExtractionInProgress => "extraction_in_progress",
            SplitError::Extraction { .. } => "extraction",
        }
    }

    /// Check if retrying the same call can succeed without changing the input
    pub fn is_recoverable(&self) -> bool {
        match self {
            SplitError::Validation { .. } => false,
            SplitError::NotFound { .. } => false,
            SplitError::ExtractionInProgress => true,
            SplitError::Extraction { .. } => true,
        }
    }

    /// Field errors carried by a validation failure, empty otherwise
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            SplitError::Validation { errors } => errors,
            _ => &[],
        }
    }
}

/// Result type alias for session operations
pub type SplitResult<T> = Result<T, SplitError>;

/// Convenience constructors for common error scenarios
impl SplitError {
    /// Create a validation error from the collected field errors
    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self::Validation { errors }
    }

    /// Create a validation error for a single field
    pub fn invalid_field(error: FieldError) -> Self {
        Self::Validation { errors: vec![error] }
    }

    /// Create a not-found error for a person
    pub fn person_not_found(id: impl ToString) -> Self {
        Self::NotFound { kind: EntityKind::Person, id: id.to_string() }
    }

    /// Create a not-found error for a line item
    pub fn item_not_found(id: impl ToString) -> Self {
        Self::NotFound { kind: EntityKind::Product, id: id.to_string() }
    }

    /// Create an extraction error
    pub fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction { message: message.into(), source_details: None }
    }

    /// Create an extraction error with details from the underlying failure
    pub fn extraction_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Extraction { message: message.into(), source_details: Some(details.into()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(SplitError::validation(vec![]).category(), "validation");
        assert_eq!(SplitError::person_not_found("p-1").category(), "not_found");
        assert_eq!(SplitError::ExtractionInProgress.category(), "extraction_in_progress");
        assert_eq!(SplitError::extraction("boom").category(), "extraction");
    }

    #[test]
    fn test_recoverability() {
        assert!(SplitError::ExtractionInProgress.is_recoverable());
        assert!(SplitError::extraction("timeout").is_recoverable());
        assert!(!SplitError::person_not_found("p-1").is_recoverable());
        assert!(!SplitError::invalid_field(FieldError::PriceTooHigh).is_recoverable());
    }

    #[test]
    fn test_validation_message_lists_every_field() {
        let error = SplitError::validation(vec![
            FieldError::NameRequired { kind: EntityKind::Product },
            FieldError::PriceNotPositive,
        ]);
        assert_eq!(
            error.to_string(),
            "Validation failed: Product name is required; Price must be greater than 0"
        );
        assert_eq!(error.field_errors().len(), 2);
        assert!(SplitError::ExtractionInProgress.field_errors().is_empty());
    }

    #[test]
    fn test_not_found_display() {
        let error = SplitError::item_not_found("abc");
        assert_eq!(error.to_string(), "Product not found: abc");
    }
}
