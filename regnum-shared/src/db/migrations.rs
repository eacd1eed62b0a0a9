/// Database migration runner
///
/// Migrations live in `regnum-shared/migrations/` and are embedded into the
/// binary at compile time. Each is a `{version}_{name}.sql` file applied once
/// and recorded in `_sqlx_migrations`.
///
/// # Example
///
/// ```no_run
/// use regnum_shared::db::migrations::{get_migration_status, run_migrations};
/// use regnum_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example(config: DatabaseConfig) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(&config).await?;
/// run_migrations(&pool).await?;
///
/// let status = get_migration_status(&pool).await?;
/// assert!(status.is_up_to_date);
/// # Ok(())
/// # }
/// ```

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::PgPool;
use tracing::{debug, info, warn};

/// Schema migrations embedded from `migrations/`
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Migration status information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Number of migrations that have been applied
    pub applied_migrations: usize,

    /// Latest applied migration version
    pub latest_version: Option<i64>,

    /// Whether every embedded migration has been applied
    pub is_up_to_date: bool,
}

/// Version of the newest embedded migration
pub fn latest_embedded_version() -> Option<i64> {
    MIGRATOR.iter().map(|m| m.version).max()
}

/// Runs all pending database migrations
///
/// # Errors
///
/// Returns an error if a migration fails to apply; the failing migration is
/// rolled back by sqlx.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!("Starting database migrations");

    match MIGRATOR.run(pool).await {
        Ok(()) => {
            info!("All database migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}

/// Gets the current migration status
///
/// # Errors
///
/// Returns an error if the migrations table cannot be queried
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    debug!("Checking migration status");

    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
            is_up_to_date: latest_embedded_version().is_none(),
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version)
         FROM _sqlx_migrations
         WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    debug!(
        applied_migrations = count,
        latest_version = ?latest_version,
        "Migration status retrieved"
    );

    Ok(MigrationStatus {
        applied_migrations: count as usize,
        latest_version,
        is_up_to_date: latest_version >= latest_embedded_version(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_embedded() {
        assert!(MIGRATOR.iter().count() >= 1);
        assert!(latest_embedded_version().is_some());
    }

    #[test]
    fn test_migration_versions_are_unique() {
        let mut versions: Vec<i64> = MIGRATOR.iter().map(|m| m.version).collect();
        let total = versions.len();
        versions.sort_unstable();
        versions.dedup();
        assert_eq!(versions.len(), total);
    }
}
