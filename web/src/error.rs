//! Error types for web handlers.
//!
//! [`AppError`] bridges [`CatalogError`] and HTTP: domain Display strings
//! become response messages unchanged, statuses follow the variant, and
//! storage failures stay opaque to the client while the source is logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use marquee_core::error::{CatalogError, FieldError};
use marquee_core::store::StoreError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Application error type for web handlers.
///
/// Implements Axum's `IntoResponse` so handlers can return
/// `Result<_, AppError>` and let `?` do the mapping.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Per-field validation messages, when the failure is field-shaped
    errors: Option<BTreeMap<&'static str, Vec<String>>>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            errors: None,
            source: None,
        }
    }

    /// Attach the underlying error for server-side logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            message.into(),
            "FORBIDDEN".to_string(),
        )
    }

    /// Create a 404 Not Found error. The message is sent verbatim.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            message.into(),
            "NOT_FOUND".to_string(),
        )
    }

    /// Create a 422 Unprocessable Entity error from field failures.
    #[must_use]
    pub fn validation(fields: Vec<FieldError>) -> Self {
        let mut grouped: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for field in fields {
            grouped.entry(field.field).or_default().push(field.message);
        }
        let mut error = Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation failed".to_string(),
            "VALIDATION_ERROR".to_string(),
        );
        error.errors = Some(grouped);
        error
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<CatalogError> for AppError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::Reorder(_)
            | CatalogError::EventNotFound
            | CatalogError::ItemNotFound
            | CatalogError::CategoryNotFound
            | CatalogError::QuestionNotFound
            | CatalogError::QuotaNotFound => Self::not_found(error.to_string()),
            CatalogError::PermissionDenied => Self::forbidden(error.to_string()),
            CatalogError::Validation(fields) => Self::validation(fields),
            CatalogError::Store(inner) => Self::from(inner),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        Self::internal("An internal error occurred").with_source(anyhow::Error::new(error))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
    /// Per-field messages, present only for validation failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<BTreeMap<&'static str, Vec<String>>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log internal errors
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
            errors: self.errors,
        };

        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use marquee_core::ordering::ReorderError;

    #[test]
    fn domain_messages_pass_through_unchanged() {
        let err = AppError::from(CatalogError::ItemNotFound);
        assert_eq!(
            err.to_string(),
            "[NOT_FOUND] The requested product does not exist."
        );

        let err = AppError::from(CatalogError::from(ReorderError::IncompleteSelection));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.message, "Not all objects have been selected.");
    }

    #[test]
    fn validation_groups_messages_by_field() {
        let err = AppError::from(CatalogError::Validation(vec![
            FieldError::new("name", "This field is required."),
            FieldError::new("name", "Too long."),
            FieldError::new("size", "May not be negative."),
        ]));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        let grouped = err.errors.unwrap();
        assert_eq!(grouped["name"].len(), 2);
        assert_eq!(grouped["size"], vec!["May not be negative.".to_string()]);
    }

    #[test]
    fn storage_failures_stay_opaque() {
        let err = AppError::from(StoreError::Database("connection reset".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message, "An internal error occurred");
        assert!(err.source.is_some());
    }
}
