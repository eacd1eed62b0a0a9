/// Authentication and authorization utilities
///
/// This module provides the authentication core for Regnum Pecunia:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength checks
/// - [`jwt`]: Session token issuance, verification and bearer extraction
/// - [`authorization`]: Role and organization access predicates
/// - [`middleware`]: Axum middleware that authenticates bearer tokens
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with a fixed cost, PHC string output
/// - **Session Tokens**: HS256 signing, 7 day default lifetime
/// - **Stateless Sessions**: No server-side session store; claims are trusted
///   until they expire
///
/// # Example
///
/// ```no_run
/// use regnum_shared::auth::jwt::{SessionIdentity, TokenCodec};
/// use regnum_shared::auth::password::{hash_password, verify_password};
/// use regnum_shared::models::user::Role;
/// use chrono::Duration;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Correct#Horse9")?;
/// assert!(verify_password("Correct#Horse9", &hash)?);
///
/// let codec = TokenCodec::new("a-secret-of-at-least-thirty-two-bytes!!", Duration::days(7));
/// let token = codec.issue(&SessionIdentity {
///     user_id: 1,
///     email: "pharmacist@example.com".to_string(),
///     role: Role::Pharmacist,
///     organization_id: Some(3),
/// })?;
/// assert!(codec.verify(&token).is_some());
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
