/// Error handling for the API server
///
/// Handlers return `Result<T, ApiError>`; each variant maps to one HTTP status
/// and a JSON body of the form:
///
/// ```json
/// { "error": "validation_error", "message": "...", "details": [...] }
/// ```
///
/// Internal failures are logged with their cause and answered with a generic
/// message. Store errors, hashing failures and token signing failures never
/// reach the client verbatim.
///
/// # Example
///
/// ```
/// use regnum_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(found: bool) -> ApiResult<Json<serde_json::Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Item not found".to_string()));
///     }
///     Ok(Json(json!({ "success": true })))
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use regnum_shared::auth::authorization::AuthzError;
use regnum_shared::auth::jwt::JwtError;
use regnum_shared::auth::middleware::AuthError;
use regnum_shared::auth::password::{PasswordError, StrengthViolation};
use regnum_shared::db::gateway::DbError;
use regnum_shared::models::user::EMAIL_UNIQUE_CONSTRAINT;
use serde::{Deserialize, Serialize};
use std::fmt;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - e.g., duplicate email
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<StrengthViolation> for ValidationErrorDetail {
    fn from(violation: StrengthViolation) -> Self {
        Self::new("password", violation.to_string())
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Logged here, never echoed to the client
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Convert data-access errors to API errors
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        if let Some(constraint) = err.unique_violation() {
            if constraint == EMAIL_UNIQUE_CONSTRAINT {
                return ApiError::Conflict("User with this email already exists".to_string());
            }
            return ApiError::Conflict(format!("Constraint violation: {}", constraint));
        }

        match err {
            DbError::Sqlx(sqlx::Error::RowNotFound) => {
                ApiError::NotFound("Resource not found".to_string())
            }
            DbError::Sqlx(sqlx::Error::PoolTimedOut) => {
                tracing::warn!("Database pool exhausted");
                ApiError::ServiceUnavailable("Database is busy, try again later".to_string())
            }
            DbError::Sqlx(sqlx::Error::Database(db_err))
                if db_err.is_foreign_key_violation() || db_err.is_check_violation() =>
            {
                ApiError::BadRequest(format!(
                    "Request references invalid data ({})",
                    db_err.constraint().unwrap_or("constraint")
                ))
            }
            other => ApiError::InternalError(format!("Database error: {}", other)),
        }
    }
}

/// Flattens `validator` errors into response details, ordered by field
pub fn validation_details(errors: &validator::ValidationErrors) -> Vec<ValidationErrorDetail> {
    let mut details: Vec<ValidationErrorDetail> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                ValidationErrorDetail::new(
                    field.to_string(),
                    error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                )
            })
        })
        .collect();
    details.sort_by(|a, b| a.field.cmp(&b.field));
    details
}

/// Convert request body validation failures to API errors
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(validation_details(&errors))
    }
}

/// Convert authentication errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Authorization required".to_string())
            }
            AuthError::InvalidToken => ApiError::Unauthorized("Invalid or expired token".to_string()),
        }
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        ApiError::InternalError(format!("Token issuance failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regnum_shared::models::user::Role;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[test]
    fn test_validation_error() {
        let errors = vec![
            ValidationErrorDetail::new("email", "Invalid email format"),
            ValidationErrorDetail::new("password", "Password too short"),
        ];

        let err = ApiError::ValidationError(errors);
        assert_eq!(err.to_string(), "Validation failed: 2 errors");
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::BadRequest(String::new()), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized(String::new()), StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden(String::new()), StatusCode::FORBIDDEN),
            (ApiError::Conflict(String::new()), StatusCode::CONFLICT),
            (ApiError::ValidationError(vec![]), StatusCode::UNPROCESSABLE_ENTITY),
            (ApiError::InternalError(String::new()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_authz_errors_are_forbidden() {
        let err = ApiError::from(AuthzError::RoleNotAllowed(Role::HealthStaff));
        assert!(matches!(err, ApiError::Forbidden(ref msg) if msg.contains("Health_Staff")));

        let err = ApiError::from(AuthzError::MissingOrganization);
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_db_errors() {
        assert!(matches!(
            ApiError::from(DbError::Sqlx(sqlx::Error::PoolTimedOut)),
            ApiError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            ApiError::from(DbError::Sqlx(sqlx::Error::RowNotFound)),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(DbError::Sqlx(sqlx::Error::PoolClosed)),
            ApiError::InternalError(_)
        ));
    }

    #[test]
    fn test_strength_violation_detail() {
        let detail = ValidationErrorDetail::from(StrengthViolation::MissingDigit);
        assert_eq!(detail.field, "password");
        assert_eq!(detail.message, "Password must contain at least one number");
    }
}
