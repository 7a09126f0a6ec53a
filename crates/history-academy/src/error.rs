//! Error taxonomy for the store
//!
//! Integrity failures (validation, uniqueness, references, missing rows, restricted
//! deletes) are recoverable and surfaced to the caller with the offending entity and
//! field. Everything else is an infrastructure failure.

use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity}.{field} is invalid: {message}")]
    Validation {
        entity: &'static str,
        field: String,
        message: String,
    },

    #[error("{entity}.{field} must be unique, '{value}' is already taken")]
    UniqueConstraint {
        entity: &'static str,
        field: String,
        value: String,
    },

    #[error("{entity}.{field} references missing {target} {id}")]
    ForeignKey {
        entity: &'static str,
        field: String,
        target: &'static str,
        id: i64,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{entity} {id} is still referenced by {dependent}")]
    Restricted {
        entity: &'static str,
        id: i64,
        dependent: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl StoreError {
    pub fn validation(entity: &'static str, field: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Validation {
            entity,
            field: field.into(),
            message: message.into(),
        }
    }

    /// Collapse `validator` output into a single error naming the first offending field.
    ///
    /// Fields are reported in name order so the same payload always yields the same error;
    /// the message lists every failing field.
    pub fn from_validation(entity: &'static str, errors: ValidationErrors) -> Self {
        let mut failures: Vec<(&'static str, String)> = errors
            .errors()
            .iter()
            .map(|(field, kind)| (*field, describe(kind)))
            .collect();
        failures.sort_by(|a, b| a.0.cmp(b.0));

        let field = failures
            .first()
            .map(|(field, _)| field.to_string())
            .unwrap_or_default();
        let message = failures
            .iter()
            .map(|(field, reason)| format!("{}: {}", field, reason))
            .collect::<Vec<_>>()
            .join("; ");

        StoreError::Validation { entity, field, message }
    }

    /// True for the caller-facing integrity failures.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(
            self,
            StoreError::Validation { .. }
                | StoreError::UniqueConstraint { .. }
                | StoreError::ForeignKey { .. }
                | StoreError::NotFound { .. }
                | StoreError::Restricted { .. }
        )
    }

    /// Name of the offending field, when the error concerns one.
    pub fn field(&self) -> Option<&str> {
        match self {
            StoreError::Validation { field, .. }
            | StoreError::UniqueConstraint { field, .. }
            | StoreError::ForeignKey { field, .. } => Some(field),
            _ => None,
        }
    }
}

fn describe(kind: &ValidationErrorsKind) -> String {
    match kind {
        ValidationErrorsKind::Field(errors) => errors
            .iter()
            .map(|e| match &e.message {
                Some(message) => message.to_string(),
                None => match e.params.get("value") {
                    Some(value) => format!("{} (got {})", e.code, value),
                    None => e.code.to_string(),
                },
            })
            .collect::<Vec<_>>()
            .join(", "),
        ValidationErrorsKind::Struct(_) | ValidationErrorsKind::List(_) => "nested value is invalid".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    #[test]
    fn test_error_display() {
        let err = StoreError::NotFound { entity: "User", id: 42 };
        assert_eq!(err.to_string(), "User 42 not found");

        let err = StoreError::UniqueConstraint {
            entity: "VocabularyTerm",
            field: "term".into(),
            value: "Pharaoh".into(),
        };
        assert!(err.to_string().contains("'Pharaoh' is already taken"));
    }

    #[test]
    fn test_from_validation_reports_first_field_by_name() {
        let mut errors = ValidationErrors::new();
        errors.add("strength", ValidationError::new("range"));
        errors.add("connection_type", ValidationError::new("length"));

        let err = StoreError::from_validation("TermConnection", errors);
        match err {
            StoreError::Validation { entity, field, message } => {
                assert_eq!(entity, "TermConnection");
                assert_eq!(field, "connection_type");
                assert!(message.contains("strength: range"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_integrity_classification() {
        assert!(StoreError::NotFound { entity: "Badge", id: 1 }.is_integrity_violation());
        assert!(!StoreError::Migration("boom".into()).is_integrity_violation());
        assert_eq!(
            StoreError::validation("User", "role", "unknown tag").field(),
            Some("role")
        );
    }
}
