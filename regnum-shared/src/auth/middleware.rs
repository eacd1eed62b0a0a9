/// Authentication middleware for Axum
///
/// Validates `Authorization: Bearer <token>` headers with a [`TokenCodec`]
/// and inserts the verified [`SessionClaims`] into request extensions.
/// Handlers read them with `Extension<SessionClaims>`.
///
/// Every verification failure produces the same 401 response so the client
/// cannot tell a bad signature from an expired token.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use chrono::Duration;
/// use regnum_shared::auth::jwt::{SessionClaims, TokenCodec};
/// use regnum_shared::auth::middleware::create_jwt_middleware;
/// use std::sync::Arc;
///
/// async fn whoami(Extension(claims): Extension<SessionClaims>) -> String {
///     claims.email
/// }
///
/// let codec = Arc::new(TokenCodec::new("test-secret-key-at-least-32-bytes-long", Duration::days(7)));
/// let app: Router = Router::new()
///     .route("/me", get(whoami))
///     .layer(middleware::from_fn(create_jwt_middleware(codec)));
/// ```

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::{future::Future, pin::Pin, sync::Arc};

use super::jwt::{extract_bearer_token, SessionClaims, TokenCodec};

/// Error type for authentication middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No usable `Authorization: Bearer` header
    MissingCredentials,

    /// Token failed verification
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingCredentials => "Authorization required",
            AuthError::InvalidToken => "Invalid or expired token",
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "unauthorized", "message": message })),
        )
            .into_response()
    }
}

/// Authenticates a request from its headers
///
/// # Errors
///
/// - `AuthError::MissingCredentials` when there is no bearer token
/// - `AuthError::InvalidToken` when the token does not verify
pub fn authenticate(codec: &TokenCodec, headers: &HeaderMap) -> Result<SessionClaims, AuthError> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = extract_bearer_token(header_value).ok_or(AuthError::MissingCredentials)?;

    codec.verify(token).ok_or(AuthError::InvalidToken)
}

/// JWT authentication middleware
///
/// On success the request continues with `SessionClaims` in its extensions.
pub async fn jwt_auth_middleware(
    codec: Arc<TokenCodec>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let claims = authenticate(&codec, req.headers())?;

    tracing::debug!(user_id = claims.user_id, role = %claims.role, "Request authenticated");
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Creates a JWT authentication middleware closure
///
/// Captures the codec and returns a function usable with
/// `axum::middleware::from_fn`.
pub fn create_jwt_middleware(
    codec: Arc<TokenCodec>,
) -> impl Fn(Request, Next) -> Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>>
       + Clone {
    move |req, next| {
        let codec = codec.clone();
        Box::pin(jwt_auth_middleware(codec, req, next))
    }
}
