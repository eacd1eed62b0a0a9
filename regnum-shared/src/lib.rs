//! # Regnum Pecunia Shared Library
//!
//! This crate contains the authentication core, the data-access gateway and
//! the record models used by the Regnum Pecunia API server.
//!
//! ## Module Organization
//!
//! - `auth`: Credential hashing, session tokens, authorization predicates
//! - `db`: Connection pool, data-access gateway, migrations
//! - `models`: Users, inventory and audit records

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the Regnum Pecunia shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
