/// Configuration management for the API server
///
/// Configuration is read once at startup from environment variables (and a
/// `.env` file when present) into an explicit [`Config`]. Every missing
/// required variable is reported in a single error so the process fails fast
/// with the full list.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `DB_HOST`, `DB_USER`, `DB_NAME`: PostgreSQL server (required)
/// - `DB_PORT`: PostgreSQL port (default: 5432)
/// - `DB_PASSWORD`: PostgreSQL password (default: empty)
/// - `DB_MAX_CONNECTIONS`: Pool capacity (default: 10)
/// - `DB_ACQUIRE_TIMEOUT_SECONDS`: Pool acquire timeout (default: 60)
/// - `JWT_SECRET`: Token signing secret, at least 32 characters (required)
/// - `JWT_EXPIRES_IN`: Token lifetime such as `7d`, `24h`, `30m` or `3600`
///   seconds (default: 7d, at most 365d)
/// - `RUST_LOG`: Log filter (default: `regnum_api=debug,regnum_shared=debug,tower_http=debug`)
///
/// # Example
///
/// ```no_run
/// use regnum_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use regnum_shared::auth::jwt::{TokenCodec, DEFAULT_TOKEN_LIFETIME_DAYS};
use regnum_shared::db::pool::DatabaseConfig;
use std::env;
use std::fmt;
use std::str::FromStr;

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Longest accepted `JWT_EXPIRES_IN`
pub const MAX_TOKEN_LIFETIME_DAYS: i64 = 365;

const REQUIRED_VARS: [&str; 4] = ["DB_HOST", "DB_USER", "DB_NAME", "JWT_SECRET"];

/// Error type for configuration loading
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// One or more required variables are unset or empty
    #[error("Missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    /// A variable is set but unusable
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database pool configuration
    pub database: DatabaseConfig,

    /// Session token configuration
    pub jwt: JwtSettings,
}

/// API server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

/// Session token configuration
#[derive(Clone)]
pub struct JwtSettings {
    /// Symmetric signing secret
    pub secret: String,

    /// Lifetime of issued tokens
    pub expires_in: Duration,
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Missing` listing every unset required variable
    /// - `ConfigError::Invalid` for the first malformed value
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let missing: Vec<&'static str> = REQUIRED_VARS
            .into_iter()
            .filter(|name| var(*name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        let jwt_secret = var("JWT_SECRET").unwrap_or_default();
        if jwt_secret.chars().count() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                reason: format!("must be at least {MIN_JWT_SECRET_LENGTH} characters long"),
            });
        }

        let expires_in = match var("JWT_EXPIRES_IN") {
            Some(raw) => parse_lifetime(&raw).map_err(|reason| ConfigError::Invalid {
                name: "JWT_EXPIRES_IN",
                reason,
            })?,
            None => Duration::days(DEFAULT_TOKEN_LIFETIME_DAYS),
        };

        let cors_origins = var("CORS_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec!["*".to_string()]);

        let defaults = DatabaseConfig::default();

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or("API_PORT", var("API_PORT"), 8080)?,
                cors_origins,
            },
            database: DatabaseConfig {
                host: var("DB_HOST").unwrap_or_default(),
                port: parse_or("DB_PORT", var("DB_PORT"), defaults.port)?,
                user: var("DB_USER").unwrap_or_default(),
                password: lookup("DB_PASSWORD").unwrap_or_default(),
                database: var("DB_NAME").unwrap_or_default(),
                max_connections: parse_or(
                    "DB_MAX_CONNECTIONS",
                    var("DB_MAX_CONNECTIONS"),
                    defaults.max_connections,
                )?,
                acquire_timeout_seconds: parse_or(
                    "DB_ACQUIRE_TIMEOUT_SECONDS",
                    var("DB_ACQUIRE_TIMEOUT_SECONDS"),
                    defaults.acquire_timeout_seconds,
                )?,
                ..defaults
            },
            jwt: JwtSettings {
                secret: jwt_secret,
                expires_in,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Builds the token codec for the configured secret and lifetime
    pub fn token_codec(&self) -> TokenCodec {
        TokenCodec::new(&self.jwt.secret, self.jwt.expires_in)
    }
}

fn parse_or<T: FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("'{raw}' is not a valid number"),
        }),
        None => Ok(default),
    }
}

/// Parses a token lifetime such as `7d`, `24h`, `30m`, `45s`, `2w` or a bare
/// number of seconds, up to [`MAX_TOKEN_LIFETIME_DAYS`]
pub fn parse_lifetime(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let (digits, unit_seconds) = match raw.char_indices().last() {
        Some((index, unit)) if unit.is_ascii_alphabetic() => {
            let seconds = match unit.to_ascii_lowercase() {
                's' => 1,
                'm' => 60,
                'h' => 3_600,
                'd' => 86_400,
                'w' => 604_800,
                other => return Err(format!("unknown unit '{other}'")),
            };
            (&raw[..index], seconds)
        }
        Some(_) => (raw, 1),
        None => return Err("must not be empty".to_string()),
    };

    let amount: i64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a duration"))?;
    if amount <= 0 {
        return Err("must be positive".to_string());
    }

    amount
        .checked_mul(unit_seconds)
        .filter(|seconds| *seconds <= MAX_TOKEN_LIFETIME_DAYS * 86_400)
        .and_then(Duration::try_seconds)
        .ok_or_else(|| format!("'{raw}' exceeds {MAX_TOKEN_LIFETIME_DAYS} days"))
}
