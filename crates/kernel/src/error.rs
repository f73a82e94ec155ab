//! Domain error types.
//!
//! Registration failures are split into the domain taxonomy (censorship,
//! configuration precondition, validation) and infrastructure failures that
//! are surfaced unchanged to the caller. Content errors are opaque wrappers
//! around formatter failures.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A formatter failed to parse, unparse or render content.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("formatter '{formatter}' failed: {source}")]
    Format {
        formatter: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ContentError {
    /// Wrap a formatter failure with the formatter's name.
    pub fn format(formatter: &str, source: anyhow::Error) -> Self {
        Self::Format {
            formatter: formatter.to_string(),
            source,
        }
    }
}

/// Result type alias for content operations.
pub type ContentResult<T> = Result<T, ContentError>;

/// A submitted text was rejected by the censorship collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("field '{field}' contains a banned phrase: {phrase}")]
pub struct CensorshipViolation {
    /// Field tag the text was submitted under (e.g. `username`).
    pub field: String,
    /// The offending phrase, as reported by the censor.
    pub phrase: String,
}

/// A single field-level constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name (payload key).
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    /// Create a field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validation failed with one or more per-field violations.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub errors: Vec<FieldError>,
}

impl ValidationFailure {
    /// Build a failure from collected field errors.
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Whether any violation concerns `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Messages for one field, in reported order.
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (i, e) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

/// Registration workflow errors.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Censorship(#[from] CensorshipViolation),

    #[error("configuration precondition failed: {0}")]
    ConfigurationPrecondition(String),

    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("infrastructure failure")]
    Infrastructure(#[from] anyhow::Error),
}

impl RegistrationError {
    /// Whether this is a domain failure (as opposed to infrastructure).
    pub fn is_domain(&self) -> bool {
        !matches!(self, RegistrationError::Infrastructure(_))
    }
}

/// Result type alias for the registration workflow.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn validation_failure_display_lists_fields() {
        let failure = ValidationFailure::new(vec![
            FieldError::new("username", "required"),
            FieldError::new("password", "too short"),
        ]);
        assert_eq!(
            failure.to_string(),
            "validation failed: username: required; password: too short"
        );
        assert!(failure.has_field("password"));
        assert!(!failure.has_field("captcha"));
    }

    #[test]
    fn censorship_converts_into_registration_error() {
        let err: RegistrationError = CensorshipViolation {
            field: "username".into(),
            phrase: "admin".into(),
        }
        .into();
        assert!(err.is_domain());
        assert!(err.to_string().contains("username"));
    }

    #[test]
    fn infrastructure_is_not_domain() {
        let err = RegistrationError::from(anyhow::anyhow!("db down"));
        assert!(!err.is_domain());
    }

    #[test]
    fn content_error_names_formatter() {
        let err = ContentError::format("markdown", anyhow::anyhow!("boom"));
        assert_eq!(err.to_string(), "formatter 'markdown' failed: boom");
    }
}
