/// User model and database operations
///
/// Credential records for everyone who can sign in. A user holds exactly one
/// [`Role`] and belongs to at most one organization.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     user_id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     role VARCHAR(32) NOT NULL,
///     organization_id BIGINT REFERENCES organizations (organization_id),
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login TIMESTAMPTZ,
///     CONSTRAINT users_email_key UNIQUE (email)
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use regnum_shared::db::gateway::DataGateway;
/// use regnum_shared::models::user::{NewUser, Role, User};
///
/// # async fn example(db: &dyn DataGateway) -> Result<(), Box<dyn std::error::Error>> {
/// let user = NewUser {
///     name: "Dana Reyes".to_string(),
///     email: "dana@clinic.example".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: Role::Clinic,
///     organization_name: Some("Northside Clinic".to_string()),
/// }
/// .create(db)
/// .await?;
///
/// let found = User::find_active_by_email(db, "dana@clinic.example").await?;
/// assert_eq!(found.map(|u| u.user_id), Some(user.user_id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

use crate::auth::jwt::SessionIdentity;
use crate::db::gateway::{decode_record, DataGateway, DbError, QueryDescriptor};
use crate::models::audit::{AuditAction, AuditEntry};

const USER_COLUMNS: &str =
    "user_id, name, email, password_hash, role, organization_id, is_active, created_at, last_login";

/// Constraint that guards against duplicate registrations
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "users_email_key";

/// Access role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Supplier,
    Pharmacist,
    Clinic,
    #[serde(rename = "Health_Staff")]
    HealthStaff,
}

impl Role {
    /// Every role, in declaration order
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Supplier,
        Role::Pharmacist,
        Role::Clinic,
        Role::HealthStaff,
    ];

    /// Wire and storage name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Supplier => "Supplier",
            Role::Pharmacist => "Pharmacist",
            Role::Clinic => "Clinic",
            Role::HealthStaff => "Health_Staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known role
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// A credential record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,

    pub name: String,

    /// Stored trimmed and lowercased
    pub email: String,

    /// Argon2id PHC string, never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub role: Role,

    pub organization_id: Option<i64>,

    /// Inactive users cannot sign in
    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    /// None until the first successful login
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Identity facts carried into a session token
    pub fn identity(&self) -> SessionIdentity {
        SessionIdentity {
            user_id: self.user_id,
            email: self.email.clone(),
            role: self.role,
            organization_id: self.organization_id,
        }
    }

    /// Finds an active user by email
    ///
    /// Returns `Ok(None)` for unknown and for deactivated accounts alike.
    pub async fn find_active_by_email(
        db: &dyn DataGateway,
        email: &str,
    ) -> Result<Option<User>, DbError> {
        let rows = db
            .query(
                &QueryDescriptor::new(format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND is_active = TRUE"
                ))
                .bind(email),
            )
            .await?;

        rows.into_iter().next().map(decode_record).transpose()
    }

    /// Whether any user, active or not, already uses `email`
    pub async fn email_exists(db: &dyn DataGateway, email: &str) -> Result<bool, DbError> {
        let rows = db
            .query(&QueryDescriptor::new("SELECT user_id FROM users WHERE email = $1").bind(email))
            .await?;

        Ok(!rows.is_empty())
    }

    /// Stamps the last successful login
    pub async fn update_last_login(db: &dyn DataGateway, user_id: i64) -> Result<(), DbError> {
        db.query(
            &QueryDescriptor::new("UPDATE users SET last_login = NOW() WHERE user_id = $1")
                .bind(user_id),
        )
        .await?;

        Ok(())
    }
}

/// Input for registering a user
///
/// When `organization_name` is set, a new organization is created in the same
/// transaction and the user joins it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    /// Argon2id hash, not the plaintext password
    pub password_hash: String,
    pub role: Role,
    pub organization_name: Option<String>,
}

impl NewUser {
    /// Ordered statements for the registration transaction
    ///
    /// The user insert returns the full row. Its position is given by
    /// [`NewUser::user_statement_index`].
    pub fn statements(&self) -> Vec<QueryDescriptor> {
        let mut statements = Vec::with_capacity(3);

        let user_insert = match &self.organization_name {
            Some(organization_name) => {
                statements.push(
                    QueryDescriptor::new(
                        "INSERT INTO organizations (name) VALUES ($1) RETURNING organization_id",
                    )
                    .bind(organization_name.as_str()),
                );
                QueryDescriptor::new(format!(
                    "INSERT INTO users (name, email, password_hash, role, organization_id) \
                     VALUES ($1, $2, $3, $4, currval(pg_get_serial_sequence('organizations', 'organization_id'))) \
                     RETURNING {USER_COLUMNS}"
                ))
            }
            None => QueryDescriptor::new(format!(
                "INSERT INTO users (name, email, password_hash, role, organization_id) \
                 VALUES ($1, $2, $3, $4, NULL) \
                 RETURNING {USER_COLUMNS}"
            )),
        };

        statements.push(
            user_insert
                .bind(self.name.as_str())
                .bind(self.email.as_str())
                .bind(self.password_hash.as_str())
                .bind(self.role.as_str()),
        );

        let audit = AuditEntry {
            user_id: None,
            action: AuditAction::UserRegistration,
            table_name: "users",
            new_values: json!({
                "email": self.email,
                "role": self.role,
                "organizationName": self.organization_name,
            }),
        };
        statements.push(audit.insert_for_last_row("user_id"));

        statements
    }

    /// Position of the user insert within [`NewUser::statements`]
    pub fn user_statement_index(&self) -> usize {
        usize::from(self.organization_name.is_some())
    }

    /// Creates the user, its optional organization and the audit row atomically
    ///
    /// # Errors
    ///
    /// A duplicate email surfaces as a unique violation on
    /// [`EMAIL_UNIQUE_CONSTRAINT`]; nothing is written in that case.
    pub async fn create(&self, db: &dyn DataGateway) -> Result<User, DbError> {
        let outcomes = db.transaction(&self.statements()).await?;

        outcomes
            .into_iter()
            .nth(self.user_statement_index())
            .and_then(|outcome| outcome.rows.into_iter().next())
            .ok_or(DbError::Sqlx(sqlx::Error::RowNotFound))
            .and_then(decode_record)
    }
}
