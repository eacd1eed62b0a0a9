/// Authorization helpers and permission checks
///
/// Access decisions are made from the verified session claims alone. The
/// store is never consulted: a claim's role and organization are trusted
/// until the claim expires.
///
/// # Permission Model
///
/// 1. **Role membership**: the caller's role must be in the route's allowed set
/// 2. **Organization scope**: organization-scoped resources are reachable only
///    from the same organization, except by `Admin`
///
/// An organization-scoped check never matches when either side has no
/// organization id. Two absent ids are *not* equal.
///
/// # Example
///
/// ```
/// use regnum_shared::auth::authorization::{has_organization_access, has_role};
/// use regnum_shared::models::user::Role;
///
/// assert!(has_role(Role::Clinic, &[Role::Clinic, Role::Pharmacist]));
/// assert!(has_organization_access(Some(5), Some(5), Role::Clinic));
/// assert!(!has_organization_access(Some(5), Some(6), Role::Clinic));
/// assert!(!has_organization_access(None, Some(5), Role::Clinic));
/// assert!(has_organization_access(Some(1), Some(2), Role::Admin));
/// ```

use crate::auth::jwt::SessionClaims;
use crate::models::user::Role;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Caller's role is not in the allowed set
    #[error("Role {0} is not allowed to perform this action")]
    RoleNotAllowed(Role),

    /// Caller belongs to a different organization than the resource
    #[error("Not authorized to access this organization's resources")]
    OrganizationMismatch,

    /// Caller's claims carry no organization but the action needs one
    #[error("An organization is required for this action")]
    MissingOrganization,
}

/// Checks whether `actual` is one of `allowed`
pub fn has_role(actual: Role, allowed: &[Role]) -> bool {
    allowed.contains(&actual)
}

/// Checks whether a caller may touch a resource owned by `resource_org`
///
/// `Admin` callers always pass. Everyone else passes only when both ids are
/// present and equal. Total: never fails, only answers `false`.
pub fn has_organization_access(
    claim_org: Option<i64>,
    resource_org: Option<i64>,
    claim_role: Role,
) -> bool {
    if claim_role == Role::Admin {
        return true;
    }

    matches!((claim_org, resource_org), (Some(mine), Some(theirs)) if mine == theirs)
}

/// Requires the caller's role to be one of `allowed`
///
/// # Errors
///
/// Returns `AuthzError::RoleNotAllowed` otherwise
pub fn require_role(claims: &SessionClaims, allowed: &[Role]) -> Result<(), AuthzError> {
    if !has_role(claims.role, allowed) {
        return Err(AuthzError::RoleNotAllowed(claims.role));
    }

    Ok(())
}

/// Requires organization access to a resource owned by `resource_org`
///
/// # Errors
///
/// Returns `AuthzError::OrganizationMismatch` if [`has_organization_access`]
/// denies the caller
pub fn require_organization_access(
    claims: &SessionClaims,
    resource_org: Option<i64>,
) -> Result<(), AuthzError> {
    if !has_organization_access(claims.organization_id, resource_org, claims.role) {
        return Err(AuthzError::OrganizationMismatch);
    }

    Ok(())
}

/// Returns the caller's organization, failing if the claims carry none
pub fn require_organization(claims: &SessionClaims) -> Result<i64, AuthzError> {
    claims.organization_id.ok_or(AuthzError::MissingOrganization)
}
