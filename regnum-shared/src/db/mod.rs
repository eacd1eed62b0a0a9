/// Database layer for Regnum Pecunia
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool construction and health checks
/// - `gateway`: Parameterized queries and ordered transactions over the pool
/// - `migrations`: Schema migration runner
///
/// # Example
///
/// ```no_run
/// use regnum_shared::db::gateway::{DataGateway, PgGateway, QueryDescriptor};
/// use regnum_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         host: "localhost".to_string(),
///         user: "regnum".to_string(),
///         database: "regnum_pecunia_db".to_string(),
///         ..Default::default()
///     };
///
///     let gateway = PgGateway::new(create_pool(&config).await?);
///     let rows = gateway
///         .query(&QueryDescriptor::new("SELECT $1::BIGINT AS answer").bind(42_i64))
///         .await?;
///     assert_eq!(rows[0]["answer"], 42);
///     Ok(())
/// }
/// ```

pub mod gateway;
pub mod migrations;
pub mod pool;
