/// Data-access gateway
///
/// Every statement the application runs goes through a [`DataGateway`]. The
/// production implementation, [`PgGateway`], owns a bounded `PgPool`:
///
/// - [`DataGateway::query`] checks out one connection, binds the parameters
///   positionally (never by string concatenation), runs the statement and
///   returns the connection to the pool on every path, including errors.
/// - [`DataGateway::transaction`] checks out one connection, begins a
///   transaction, runs the statements in order and commits. On the first
///   failure it rolls back and returns that original error.
///
/// No retries happen here and no statement timeout is imposed beyond the
/// driver defaults. A pool timeout surfaces as `sqlx::Error::PoolTimedOut`.
///
/// Rows come back as JSON objects keyed by column name so callers can
/// deserialize them into their own record types with `serde`.
///
/// # Example
///
/// ```no_run
/// use regnum_shared::db::gateway::{DataGateway, QueryDescriptor};
///
/// # async fn example(db: &dyn DataGateway) -> Result<(), Box<dyn std::error::Error>> {
/// let rows = db
///     .query(
///         &QueryDescriptor::new("SELECT user_id FROM users WHERE email = $1")
///             .bind("pharmacist@example.com"),
///     )
///     .await?;
///
/// let results = db
///     .transaction(&[
///         QueryDescriptor::new("UPDATE stock_levels SET current_stock = current_stock - $1 WHERE stock_id = $2")
///             .bind(5_i64)
///             .bind(10_i64),
///         QueryDescriptor::new("UPDATE stock_levels SET current_stock = current_stock + $1 WHERE stock_id = $2")
///             .bind(5_i64)
///             .bind(11_i64),
///     ])
///     .await?;
/// assert_eq!(results.len(), 2);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::TryStreamExt;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgConnection, PgPool, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Column, Either, Row, TypeInfo};
use tracing::{debug, warn};

use super::pool::health_check;

/// A result row keyed by column name
pub type Record = Map<String, Value>;

/// Error type for data access
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Error from the driver or the pool, passed through unchanged
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    /// A result column has a type the gateway cannot represent
    #[error("Unsupported column type {type_name} for column {column}")]
    UnsupportedColumn { column: String, type_name: String },

    /// A record did not match the shape the caller asked for
    #[error("Failed to decode record: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DbError {
    /// Name of the violated unique constraint, if this is a unique violation
    pub fn unique_violation(&self) -> Option<String> {
        match self {
            DbError::Sqlx(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Some(db_err.constraint().unwrap_or_default().to_string())
            }
            _ => None,
        }
    }
}

/// A positional statement parameter
///
/// Every variant carries an `Option` so NULLs keep their SQL type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Bool(Option<bool>),
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    Timestamp(Option<DateTime<Utc>>),
    Date(Option<NaiveDate>),
    Json(Option<Value>),
}

macro_rules! impl_sql_param_from {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for SqlParam {
            fn from(value: $ty) -> Self {
                SqlParam::$variant(Some(value.into()))
            }
        }

        impl From<Option<$ty>> for SqlParam {
            fn from(value: Option<$ty>) -> Self {
                SqlParam::$variant(value.map(Into::into))
            }
        }
    };
}

impl_sql_param_from!(Bool, bool);
impl_sql_param_from!(Int, i64);
impl_sql_param_from!(Int, i32);
impl_sql_param_from!(Float, f64);
impl_sql_param_from!(Text, String);
impl_sql_param_from!(Text, &str);
impl_sql_param_from!(Timestamp, DateTime<Utc>);
impl_sql_param_from!(Date, NaiveDate);
impl_sql_param_from!(Json, Value);

/// A statement template with its ordered parameters
///
/// Placeholders are PostgreSQL positional markers (`$1`, `$2`, ...), bound in
/// the order the parameters were added.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescriptor {
    /// Statement template
    pub statement: String,

    /// Parameters, in placeholder order
    pub params: Vec<SqlParam>,
}

impl QueryDescriptor {
    /// Creates a descriptor with no parameters
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            params: Vec::new(),
        }
    }

    /// Appends the next positional parameter
    pub fn bind(mut self, param: impl Into<SqlParam>) -> Self {
        self.params.push(param.into());
        self
    }
}

/// Output of one statement inside a transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementOutcome {
    /// Rows returned (e.g. by `RETURNING`)
    pub rows: Vec<Record>,

    /// Rows inserted, updated or deleted
    pub rows_affected: u64,
}

/// Executes parameterized statements against the relational store
///
/// Handlers depend on `Arc<dyn DataGateway>` so tests can substitute an
/// in-memory implementation.
#[async_trait]
pub trait DataGateway: Send + Sync {
    /// Runs one statement on a pooled connection and returns its rows
    async fn query(&self, descriptor: &QueryDescriptor) -> Result<Vec<Record>, DbError>;

    /// Runs `statements` in order inside one transaction
    ///
    /// Either every statement takes effect or none does.
    async fn transaction(
        &self,
        statements: &[QueryDescriptor],
    ) -> Result<Vec<StatementOutcome>, DbError>;

    /// Checks that the store is reachable
    async fn ping(&self) -> Result<(), DbError>;
}

/// [`DataGateway`] backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    /// Wraps an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DataGateway for PgGateway {
    async fn query(&self, descriptor: &QueryDescriptor) -> Result<Vec<Record>, DbError> {
        // The connection goes back to the pool when `conn` drops, on every path
        let mut conn = self.pool.acquire().await?;

        let outcome = run_statement(&mut conn, descriptor).await;
        if let Err(e) = &outcome {
            debug!(error = %e, "Query failed");
        }

        outcome.map(|o| o.rows)
    }

    async fn transaction(
        &self,
        statements: &[QueryDescriptor],
    ) -> Result<Vec<StatementOutcome>, DbError> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = sqlx::Connection::begin(&mut *conn).await?;

        let mut outcomes = Vec::with_capacity(statements.len());
        for (index, descriptor) in statements.iter().enumerate() {
            match run_statement(&mut tx, descriptor).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    debug!(statement_index = index, error = %e, "Transaction statement failed");
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!(error = %rollback_err, "Transaction rollback failed");
                    }
                    return Err(e);
                }
            }
        }

        tx.commit().await?;
        debug!(statements = statements.len(), "Transaction committed");

        Ok(outcomes)
    }

    async fn ping(&self) -> Result<(), DbError> {
        health_check(&self.pool).await.map_err(DbError::from)
    }
}

/// Deserializes a record into a caller-defined row type
pub fn decode_record<T: DeserializeOwned>(record: Record) -> Result<T, DbError> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

/// Deserializes every record of a result set
pub fn decode_records<T: DeserializeOwned>(records: Vec<Record>) -> Result<Vec<T>, DbError> {
    records.into_iter().map(decode_record).collect()
}

fn bind_params<'q>(
    statement: &'q str,
    params: &'q [SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    params
        .iter()
        .fold(sqlx::query(statement), |query, param| match param {
            SqlParam::Bool(value) => query.bind(*value),
            SqlParam::Int(value) => query.bind(*value),
            SqlParam::Float(value) => query.bind(*value),
            SqlParam::Text(value) => query.bind(value.as_deref()),
            SqlParam::Timestamp(value) => query.bind(*value),
            SqlParam::Date(value) => query.bind(*value),
            SqlParam::Json(value) => query.bind(value.as_ref().map(sqlx::types::Json)),
        })
}

async fn run_statement(
    conn: &mut PgConnection,
    descriptor: &QueryDescriptor,
) -> Result<StatementOutcome, DbError> {
    debug!(
        statement = %descriptor.statement,
        params = descriptor.params.len(),
        "Executing statement"
    );

    let mut outcome = StatementOutcome::default();
    let mut results = bind_params(&descriptor.statement, &descriptor.params).fetch_many(conn);

    while let Some(item) = results.try_next().await? {
        match item {
            Either::Left(done) => outcome.rows_affected += done.rows_affected(),
            Either::Right(row) => outcome.rows.push(row_to_record(&row)?),
        }
    }

    Ok(outcome)
}

fn row_to_record(row: &PgRow) -> Result<Record, DbError> {
    let mut record = Record::new();

    for column in row.columns() {
        let index = column.ordinal();
        let value = match column.type_info().name() {
            "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::from),
            "INT2" => row.try_get::<Option<i16>, _>(index)?.map(Value::from),
            "INT4" => row.try_get::<Option<i32>, _>(index)?.map(Value::from),
            "INT8" => row.try_get::<Option<i64>, _>(index)?.map(Value::from),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(index)?
                .map(|v| Value::from(f64::from(v))),
            "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(Value::from),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                row.try_get::<Option<String>, _>(index)?.map(Value::from)
            }
            "TIMESTAMPTZ" => row
                .try_get::<Option<DateTime<Utc>>, _>(index)?
                .map(|v| Value::from(v.to_rfc3339())),
            "TIMESTAMP" => row
                .try_get::<Option<NaiveDateTime>, _>(index)?
                .map(|v| Value::from(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
            "DATE" => row
                .try_get::<Option<NaiveDate>, _>(index)?
                .map(|v| Value::from(v.to_string())),
            "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(index)?,
            other => {
                return Err(DbError::UnsupportedColumn {
                    column: column.name().to_string(),
                    type_name: other.to_string(),
                })
            }
        };

        record.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_descriptor_binds_in_order() {
        let descriptor = QueryDescriptor::new("SELECT * FROM users WHERE email = $1 AND is_active = $2")
            .bind("a@example.com")
            .bind(true);

        assert_eq!(
            descriptor.params,
            vec![
                SqlParam::Text(Some("a@example.com".to_string())),
                SqlParam::Bool(Some(true)),
            ]
        );
    }

    #[test]
    fn test_null_params_keep_their_type() {
        assert_eq!(SqlParam::from(None::<i64>), SqlParam::Int(None));
        assert_eq!(SqlParam::from(None::<String>), SqlParam::Text(None));
        assert_eq!(SqlParam::from(Some(7_i32)), SqlParam::Int(Some(7)));
    }

    #[test]
    fn test_decode_record() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Row {
            id: i64,
            name: Option<String>,
        }

        let record = json!({ "id": 4, "name": null }).as_object().cloned().unwrap();
        let row: Row = decode_record(record).unwrap();
        assert_eq!(row, Row { id: 4, name: None });
    }

    #[test]
    fn test_decode_record_shape_mismatch() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Row {
            id: i64,
        }

        let record = json!({ "id": "four" }).as_object().cloned().unwrap();
        let result: Result<Row, _> = decode_record(record);
        assert!(matches!(result, Err(DbError::Decode(_))));
    }

    #[test]
    fn test_unique_violation_only_for_database_errors() {
        assert_eq!(DbError::Sqlx(sqlx::Error::PoolTimedOut).unique_violation(), None);
    }

    #[test]
    fn test_pool_timeout_passes_through() {
        let err = DbError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(err.to_string(), sqlx::Error::PoolTimedOut.to_string());
    }
}
