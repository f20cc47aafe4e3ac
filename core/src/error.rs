//! Domain error taxonomy.
//!
//! Display strings double as the user-facing messages, so the web layer maps
//! variants to statuses without rewording them.

use crate::ordering::ReorderError;
use crate::store::StoreError;
use thiserror::Error;

/// A field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// The offending field, wire-named.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl FieldError {
    /// A new field error.
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Why a catalog operation failed. No partial writes survive any of these.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A reorder request failed validation (unknown ids or incomplete
    /// coverage). Not-found class; nothing was written.
    #[error(transparent)]
    Reorder(#[from] ReorderError),

    /// The addressed event does not exist.
    #[error("The requested event does not exist.")]
    EventNotFound,

    /// The addressed item does not exist within the event.
    #[error("The requested product does not exist.")]
    ItemNotFound,

    /// The addressed category does not exist within the event.
    #[error("The requested product category does not exist.")]
    CategoryNotFound,

    /// The addressed question does not exist within the event.
    #[error("The requested question does not exist.")]
    QuestionNotFound,

    /// The addressed quota does not exist within the event.
    #[error("The requested quota does not exist.")]
    QuotaNotFound,

    /// The actor lacks the required capability; checked before any domain
    /// logic, so no side effects occurred.
    #[error("permission denied")]
    PermissionDenied,

    /// Submitted fields failed validation.
    #[error("validation failed")]
    Validation(Vec<FieldError>),

    /// The persistence layer failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    /// Shorthand for a single-field validation failure.
    #[must_use]
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorder_messages_surface_verbatim() {
        let err = CatalogError::from(ReorderError::UnknownIds);
        assert_eq!(err.to_string(), "Some of the provided object ids are invalid.");
        let err = CatalogError::from(ReorderError::IncompleteSelection);
        assert_eq!(err.to_string(), "Not all objects have been selected.");
    }

    #[test]
    fn lookup_misses_name_their_entity() {
        assert_eq!(
            CatalogError::ItemNotFound.to_string(),
            "The requested product does not exist."
        );
        assert_eq!(
            CatalogError::CategoryNotFound.to_string(),
            "The requested product category does not exist."
        );
    }
}
