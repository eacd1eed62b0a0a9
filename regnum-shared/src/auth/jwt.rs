/// Session token issuance and verification
///
/// Session claims are carried in compact HS256 JWTs. The server keeps no
/// session store: a claim is valid exactly while its signature verifies and
/// the current time is before `exp`.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: Configurable, 7 days by default
/// - **Failure reporting**: `verify` collapses every failure (bad signature,
///   malformed token, expired) into `None`
/// - **Secret Management**: The symmetric secret is read once from
///   configuration; there is no runtime rotation
///
/// # Example
///
/// ```
/// use regnum_shared::auth::jwt::{extract_bearer_token, SessionIdentity, TokenCodec};
/// use regnum_shared::models::user::Role;
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let codec = TokenCodec::new("test-secret-key-at-least-32-bytes-long", Duration::days(7));
///
/// let token = codec.issue(&SessionIdentity {
///     user_id: 42,
///     email: "clinic@example.com".to_string(),
///     role: Role::Clinic,
///     organization_id: Some(5),
/// })?;
///
/// let header = format!("Bearer {}", token);
/// let presented = extract_bearer_token(Some(&header)).unwrap();
/// let claims = codec.verify(presented).unwrap();
/// assert_eq!(claims.user_id, 42);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::user::Role;

/// Default claim lifetime
pub const DEFAULT_TOKEN_LIFETIME_DAYS: i64 = 7;

/// Authorization scheme accepted by [`extract_bearer_token`]
const BEARER_PREFIX: &str = "Bearer ";

/// Error type for token issuance
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),
}

/// Identity and authorization facts copied from a credential record at login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    /// User ID
    pub user_id: i64,

    /// Login email
    pub email: String,

    /// Role at issuance time
    pub role: Role,

    /// Organization the user belongs to, if any
    pub organization_id: Option<i64>,
}

/// Claims embedded in a session token
///
/// Field names follow the camelCase payload the web client reads
/// (`userId`, `organizationId`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    /// User ID
    pub user_id: i64,

    /// Login email
    pub email: String,

    /// Role at issuance time
    pub role: Role,

    /// Organization the user belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i64>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    /// Builds claims for `identity` issued at `issued_at` and living for `lifetime`
    ///
    /// # Errors
    ///
    /// Returns `JwtError::CreateError` if the expiry is out of range
    pub fn new(
        identity: &SessionIdentity,
        issued_at: DateTime<Utc>,
        lifetime: Duration,
    ) -> Result<Self, JwtError> {
        let expires_at = issued_at.checked_add_signed(lifetime).ok_or_else(|| {
            JwtError::CreateError(format!("Token lifetime {} is out of range", lifetime))
        })?;

        Ok(Self {
            user_id: identity.user_id,
            email: identity.email.clone(),
            role: identity.role,
            organization_id: identity.organization_id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        })
    }

    /// Checks whether the claims have expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Issues and verifies session tokens with a single symmetric secret
///
/// Build one at startup and share it; every method takes `&self` and the
/// codec holds no mutable state.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenCodec {
    /// Creates a codec signing with `secret` and issuing claims valid for `lifetime`
    pub fn new(secret: &str, lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by hand so that `now == exp` is already expired
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime,
        }
    }

    /// Lifetime given to newly issued claims
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issues a signed token for `identity`, valid from now
    ///
    /// # Errors
    ///
    /// Returns `JwtError::CreateError` if signing fails
    pub fn issue(&self, identity: &SessionIdentity) -> Result<String, JwtError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issues a signed token for `identity` as if the current time were `now`
    pub fn issue_at(
        &self,
        identity: &SessionIdentity,
        now: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        self.sign(&SessionClaims::new(identity, now, self.lifetime)?)
    }

    /// Signs an already built set of claims
    pub fn sign(&self, claims: &SessionClaims) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
    }

    /// Verifies a token and returns its claims
    ///
    /// Returns `None` for a bad signature, a malformed token, or an expired
    /// token. Callers treat `None` as "unauthenticated" without further
    /// distinction.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies a token as if the current time were `now`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<SessionClaims> {
        let claims = match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(error = %e, "Session token rejected");
                return None;
            }
        };

        if claims.is_expired_at(now) {
            tracing::debug!(user_id = claims.user_id, exp = claims.exp, "Session token expired");
            return None;
        }

        Some(claims)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"<redacted>")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

/// Extracts the token from an `Authorization` header value
///
/// Only the `Bearer <token>` scheme is accepted. A missing header, another
/// scheme, or an empty token all yield `None`.
///
/// # Example
///
/// ```
/// use regnum_shared::auth::jwt::extract_bearer_token;
///
/// assert_eq!(extract_bearer_token(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
/// assert_eq!(extract_bearer_token(Some("Basic dXNlcjpwYXNz")), None);
/// assert_eq!(extract_bearer_token(None), None);
/// ```
pub fn extract_bearer_token(header_value: Option<&str>) -> Option<&str> {
    header_value?
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
}
