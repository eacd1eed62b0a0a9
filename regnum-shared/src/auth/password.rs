/// Credential hashing module using Argon2id
///
/// Passwords are hashed with Argon2id at a fixed cost and stored as PHC
/// strings, so the salt and parameters travel with the hash and verification
/// never needs outside configuration.
///
/// # Cost
///
/// - **Memory**: 19 MiB (19456 KiB)
/// - **Iterations**: 2 passes
/// - **Parallelism**: 1 lane
///
/// This lands around 100ms per hash on commodity hardware.
///
/// # Example
///
/// ```
/// use regnum_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Pharm@cy2024")?;
/// assert!(verify_password("Pharm@cy2024", &hash)?);
/// assert!(!verify_password("pharmacy2024", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use serde::Serialize;
use std::fmt;

/// Argon2 memory cost in KiB
pub const MEMORY_COST_KIB: u32 = 19_456;

/// Argon2 iteration count
pub const TIME_COST: u32 = 2;

/// Argon2 lane count
pub const PARALLELISM: u32 = 1;

/// Minimum accepted password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Characters that satisfy the symbol rule
const SYMBOLS: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?";

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password using Argon2id with the fixed cost parameters
///
/// A fresh 16-byte salt is drawn from the OS RNG for every call, so hashing
/// the same password twice yields different strings.
///
/// # Returns
///
/// PHC string format hash, e.g.
/// ```text
/// $argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHRzYWx0$hash...
/// ```
///
/// # Errors
///
/// Returns `PasswordError::HashError` if the underlying library fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(MEMORY_COST_KIB)
        .t_cost(TIME_COST)
        .p_cost(PARALLELISM)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash
///
/// Comparison is done by the argon2 crate in constant time. A wrong password
/// is `Ok(false)`; only a stored hash that cannot be parsed is an error.
///
/// # Errors
///
/// - `PasswordError::InvalidHash` if `hash` is not a PHC string
/// - `PasswordError::VerifyError` for any other library failure
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    // Parameters are embedded in the hash
    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// A single password rule that was not met
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthViolation {
    /// Fewer than [`MIN_PASSWORD_LENGTH`] characters
    TooShort,

    /// No ASCII uppercase letter
    MissingUppercase,

    /// No ASCII lowercase letter
    MissingLowercase,

    /// No ASCII digit
    MissingDigit,

    /// No character from the accepted symbol set
    MissingSymbol,
}

impl fmt::Display for StrengthViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            StrengthViolation::TooShort => "Password must be at least 8 characters long",
            StrengthViolation::MissingUppercase => {
                "Password must contain at least one uppercase letter"
            }
            StrengthViolation::MissingLowercase => {
                "Password must contain at least one lowercase letter"
            }
            StrengthViolation::MissingDigit => "Password must contain at least one number",
            StrengthViolation::MissingSymbol => {
                "Password must contain at least one special character"
            }
        };
        f.write_str(message)
    }
}

/// Result of a password strength check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordStrength {
    /// True when no rule was violated
    pub valid: bool,

    /// Every violated rule, in rule order
    pub violations: Vec<StrengthViolation>,
}

/// Checks a password against every strength rule
///
/// Unlike a first-failure check, all violated rules are reported so a client
/// can show the full list at once.
///
/// # Example
///
/// ```
/// use regnum_shared::auth::password::{check_strength, StrengthViolation};
///
/// let report = check_strength("abc");
/// assert!(!report.valid);
/// assert_eq!(report.violations, vec![
///     StrengthViolation::TooShort,
///     StrengthViolation::MissingUppercase,
///     StrengthViolation::MissingDigit,
///     StrengthViolation::MissingSymbol,
/// ]);
///
/// assert!(check_strength("Abcd1234!").valid);
/// ```
pub fn check_strength(password: &str) -> PasswordStrength {
    let mut violations = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        violations.push(StrengthViolation::TooShort);
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        violations.push(StrengthViolation::MissingUppercase);
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        violations.push(StrengthViolation::MissingLowercase);
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push(StrengthViolation::MissingDigit);
    }

    if !password.chars().any(|c| SYMBOLS.contains(c)) {
        violations.push(StrengthViolation::MissingSymbol);
    }

    PasswordStrength {
        valid: violations.is_empty(),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").expect("Hash should succeed");

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
        assert!(hash.contains("m=19456"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=1"));
    }

    #[test]
    fn test_hash_password_produces_different_salts() {
        let hash1 = hash_password("same_password").expect("Hash 1 should succeed");
        let hash2 = hash_password("same_password").expect("Hash 2 should succeed");

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_verify_password_correct() {
        let hash = hash_password("correct_password").expect("Hash should succeed");

        let result = verify_password("correct_password", &hash).expect("Verify should succeed");
        assert!(result, "Correct password should verify");
    }

    #[test]
    fn test_verify_password_incorrect() {
        let hash = hash_password("correct_password").expect("Hash should succeed");

        let result = verify_password("wrong_password", &hash).expect("Verify should succeed");
        assert!(!result, "Wrong password should not verify");
    }

    #[test]
    fn test_verify_password_empty() {
        let hash = hash_password("password").expect("Hash should succeed");

        let result = verify_password("", &hash).expect("Verify should succeed");
        assert!(!result);
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        let result = verify_password("password", "invalid_hash");
        assert!(matches!(result, Err(PasswordError::InvalidHash(_))));
    }

    #[test]
    fn test_verify_password_malformed_hash() {
        let result = verify_password("password", "$argon2id$invalid");
        assert!(result.is_err(), "Malformed hash should return error");
    }

    #[test]
    fn test_hash_verify_roundtrip() {
        let passwords = [
            "simple",
            "with spaces",
            "with-special-chars!@#$%",
            "unicode-密码-パスワード",
            "very_long_password_that_is_longer_than_usual_passwords_123456789",
        ];

        for password in passwords {
            let hash = hash_password(password).expect("Hash should succeed");
            assert!(
                verify_password(password, &hash).expect("Verify should succeed"),
                "Password '{}' should verify",
                password
            );
        }
    }

    #[test]
    fn test_check_strength_reports_every_violation() {
        let report = check_strength("abc");

        assert!(!report.valid);
        assert_eq!(
            report.violations,
            vec![
                StrengthViolation::TooShort,
                StrengthViolation::MissingUppercase,
                StrengthViolation::MissingDigit,
                StrengthViolation::MissingSymbol,
            ]
        );
    }

    #[test]
    fn test_check_strength_valid() {
        for password in ["Abcd1234!", "MyP@ssw0rd!", "Str0ng!Pass", "S3cur3$Password"] {
            let report = check_strength(password);
            assert!(report.valid, "Password '{}' should be valid", password);
            assert!(report.violations.is_empty());
        }
    }

    #[test]
    fn test_check_strength_single_rules() {
        assert_eq!(check_strength("Sh0rt!").violations, vec![StrengthViolation::TooShort]);
        assert_eq!(
            check_strength("lowercase1!").violations,
            vec![StrengthViolation::MissingUppercase]
        );
        assert_eq!(
            check_strength("UPPERCASE1!").violations,
            vec![StrengthViolation::MissingLowercase]
        );
        assert_eq!(
            check_strength("NoDigits!!").violations,
            vec![StrengthViolation::MissingDigit]
        );
        assert_eq!(
            check_strength("NoSymbol123").violations,
            vec![StrengthViolation::MissingSymbol]
        );
    }

    #[test]
    fn test_check_strength_empty() {
        let report = check_strength("");
        assert_eq!(report.violations.len(), 5);
    }

    #[test]
    fn test_check_strength_counts_characters_not_bytes() {
        // 7 characters, more than 8 bytes
        let report = check_strength("Aé1!ééé");
        assert!(report.violations.contains(&StrengthViolation::TooShort));
    }

    #[test]
    fn test_backtick_and_tilde_are_not_symbols() {
        let report = check_strength("Abcd1234`~");
        assert_eq!(report.violations, vec![StrengthViolation::MissingSymbol]);
    }

    #[test]
    fn test_violation_messages() {
        assert!(StrengthViolation::TooShort.to_string().contains("at least 8 characters"));
        assert!(StrengthViolation::MissingSymbol.to_string().contains("special character"));
    }
}
