/// Authentication endpoints
///
/// - `POST /api/auth/register` - Register a new user
/// - `POST /api/auth/login` - Exchange credentials for a session token
/// - `GET /api/auth/me` - Echo the verified session claims
///
/// Emails are trimmed and lowercased before they are stored or looked up.
/// Login answers unknown emails and wrong passwords with the same 401.

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use regnum_shared::{
    auth::{jwt::SessionClaims, password},
    models::user::{NewUser, Role, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Display name
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Plaintext password, checked against every strength rule
    pub password: String,

    /// One of `Admin`, `Supplier`, `Pharmacist`, `Clinic`, `Health_Staff`
    pub role: String,

    /// Creates a new organization for the user when set
    #[validate(length(min = 1, max = 255, message = "Organization name must be between 1 and 255 characters"))]
    pub organization_name: Option<String>,
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub organization_id: Option<i64>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.user_id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            organization_id: user.organization_id,
        }
    }
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserProfile,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,

    /// Signed session token for the `Authorization: Bearer` header
    pub token: String,

    pub user: UserProfile,
}

/// Current session response
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: SessionClaims,
}

/// Trims and lowercases an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Register a new user
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "name": "Dana Reyes",
///   "email": "dana@clinic.example",
///   "password": "Str0ng!Pass",
///   "role": "Clinic",
///   "organizationName": "Northside Clinic"
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: every failed field rule and every violated
///   password strength rule
/// - `409 Conflict`: Email already exists
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    Json(mut req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    req.name = req.name.trim().to_string();
    req.email = normalize_email(&req.email);

    let mut details = match req.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => validation_details(&errors),
    };

    let role = match req.role.parse::<Role>() {
        Ok(role) => Some(role),
        Err(_) => {
            details.push(ValidationErrorDetail::new(
                "role",
                "Role must be one of Admin, Supplier, Pharmacist, Clinic, Health_Staff",
            ));
            None
        }
    };

    details.extend(
        password::check_strength(&req.password)
            .violations
            .into_iter()
            .map(ValidationErrorDetail::from),
    );

    let role = match role {
        Some(role) if details.is_empty() => role,
        _ => return Err(ApiError::ValidationError(details)),
    };

    if User::email_exists(state.db.as_ref(), &req.email).await? {
        return Err(ApiError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = NewUser {
        name: req.name,
        email: req.email,
        password_hash,
        role,
        organization_name: req.organization_name,
    }
    .create(state.db.as_ref())
    .await?;

    tracing::info!(
        user_id = user.user_id,
        role = %user.role,
        organization_id = ?user.organization_id,
        "User registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: UserProfile::from(&user),
        }),
    ))
}

/// Login with email and password
///
/// ```text
/// POST /api/auth/login
/// Content-Type: application/json
///
/// { "email": "dana@clinic.example", "password": "Str0ng!Pass" }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Missing email or password
/// - `401 Unauthorized`: Unknown email, inactive account or wrong password
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    let email = normalize_email(&req.email);

    let user = match User::find_active_by_email(state.db.as_ref(), &email).await? {
        Some(user) => user,
        None => {
            tracing::debug!("Login attempt for unknown or inactive account");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = user.user_id, "Login attempt with wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    User::update_last_login(state.db.as_ref(), user.user_id).await?;

    let token = state.tokens.issue(&user.identity())?;

    tracing::info!(user_id = user.user_id, role = %user.role, "User logged in");

    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: UserProfile::from(&user),
    }))
}

/// Returns the verified claims of the calling session
pub async fn me(Extension(claims): Extension<SessionClaims>) -> Json<MeResponse> {
    Json(MeResponse { user: claims })
}
