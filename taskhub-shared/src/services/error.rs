/// Service-level error taxonomy
///
/// Every resource service returns [`ServiceResult`]. Store, authorization and
/// crypto failures are classified here, once, so the HTTP layer only has to
/// map kinds to status codes.

use serde::Serialize;
use validator::ValidationErrors;

use crate::auth::authorization::AuthzError;
use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::store::StoreError;

/// Result alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// A single failed field check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A uniqueness rule rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Field-level validation failed
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    /// Anything the caller cannot fix; details are logged, not returned
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ServiceError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::Conflict(message.into())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { field } => match field.as_str() {
                "email" => ServiceError::conflict("Email already in use"),
                "username" => ServiceError::conflict("Username already in use"),
                other => ServiceError::Conflict(format!("Duplicate value for {}", other)),
            },
            StoreError::ForeignKeyViolation(constraint) => {
                tracing::warn!(constraint = %constraint, "Foreign key violation");
                ServiceError::bad_request("Invalid reference: Foreign key constraint failed")
            }
            StoreError::Database(msg) => {
                tracing::error!(error = %msg, "Store operation failed");
                ServiceError::Internal(msg)
            }
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Forbidden => ServiceError::Forbidden("Access denied".to_string()),
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ServiceError {
    fn from(err: JwtError) -> Self {
        ServiceError::Internal(format!("Token operation failed: {}", err))
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| FieldError {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ServiceError::Validation(details)
    }
}
