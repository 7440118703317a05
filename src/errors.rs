use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Field-level and form-level messages collected while validating a submission.
///
/// `fields` maps a field name to the messages reported against it; `non_field`
/// holds messages that concern the submission as a whole (a taken slot, a
/// datetime already in the past).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FormErrors {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_field: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add_field(name, message);
        errors
    }

    pub fn form(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add_non_field(message);
        errors
    }

    pub fn add_field(&mut self, name: &str, message: impl Into<String>) {
        self.fields
            .entry(name.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    pub fn merge(&mut self, other: FormErrors) {
        for (name, messages) in other.fields {
            self.fields.entry(name).or_default().extend(messages);
        }
        self.non_field.extend(other.non_field);
    }

    /// `Ok(())` when nothing was collected, otherwise the errors themselves.
    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn summary(&self) -> String {
        let mut parts: Vec<String> = self.non_field.clone();
        for (name, messages) in &self.fields {
            parts.push(format!("{}: {}", name, messages.join(" ")));
        }
        parts.join("; ")
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.summary())
    }
}

impl From<validator::ValidationErrors> for FormErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut form = FormErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for err in field_errors {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid value ({})", err.code));
                // Struct-level checks report under "__all__".
                if field == "__all__" {
                    form.add_non_field(message);
                } else {
                    form.add_field(field, message);
                }
            }
        }
        form
    }
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Bad Request",
    "message": "Form validation failed",
    "field_errors": {"fields": {"time": ["Appointments can only be booked from 09:00."]}},
    "request_id": "req-abc123xyz",
    "timestamp": "2025-03-14T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Per-field messages for rejected form submissions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<FormErrors>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Form validation failed: {0}")]
    FormErrors(FormErrors),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock. Available: {available}")]
    InsufficientStock { available: i32 },

    #[error("Hash error: {0}")]
    HashError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::FormErrors(err.into())
    }
}

impl From<FormErrors> for ServiceError {
    fn from(err: FormErrors) -> Self {
        ServiceError::FormErrors(err)
    }
}

impl ServiceError {
    pub fn not_found(what: &str, key: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {} not found", what, key))
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::FormErrors(_) | Self::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InsufficientStock { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DatabaseError(_)
            | Self::HashError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::HashError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            Self::FormErrors(_) => "Form validation failed".to_string(),
            _ => self.to_string(),
        }
    }

    fn field_errors(&self) -> Option<FormErrors> {
        match self {
            Self::FormErrors(errors) => Some(errors.clone()),
            _ => None,
        }
    }

    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            details: None,
            field_errors: self.field_errors(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        (status, body)
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, body) = self.to_error_response();
        (status, Json(body)).into_response()
    }
}

/// API Error type for HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Validation error: {0}")]
    ValidationError(FormErrors),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let service_error = match self {
            ApiError::ServiceError(err) => err,
            ApiError::ValidationError(errors) => ServiceError::FormErrors(errors),
            ApiError::NotFound(msg) => ServiceError::NotFound(msg),
            ApiError::Unauthorized => {
                ServiceError::Unauthorized("Login required".to_string())
            }
            ApiError::Forbidden(msg) => ServiceError::Forbidden(msg),
            ApiError::BadRequest(msg) => ServiceError::InvalidInput(msg),
        };
        service_error.into_response()
    }
}

/// True when the database rejected a write because of a unique index.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert!(payload.field_errors.is_none());
    }

    #[tokio::test]
    async fn form_errors_are_serialized_with_the_response() {
        let mut errors = FormErrors::field("time", "Appointments can only be booked from 09:00.");
        errors.add_non_field("That slot is taken.");

        let response = ApiError::ValidationError(errors.clone()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.message, "Form validation failed");
        assert_eq!(payload.field_errors, Some(errors));
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::FormErrors(FormErrors::form("x")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Unauthorized("x".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::InsufficientStock { available: 3 }.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::HashError("sensitive".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("table x".into())).response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::InsufficientStock { available: 4 }.response_message(),
            "Insufficient stock. Available: 4"
        );
    }

    #[test]
    fn form_errors_merge_keeps_every_message() {
        let mut a = FormErrors::field("date", "first");
        let mut b = FormErrors::field("date", "second");
        b.add_non_field("whole form");
        a.merge(b);

        assert_eq!(a.fields["date"], vec!["first", "second"]);
        assert_eq!(a.non_field, vec!["whole form"]);
        assert!(a.into_result().is_err());
        assert!(FormErrors::new().into_result().is_ok());
    }
}
