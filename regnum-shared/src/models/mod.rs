/// Record models
///
/// Each model builds the [`QueryDescriptor`](crate::db::gateway::QueryDescriptor)s
/// it needs and decodes gateway records into typed rows. Models never hold a
/// pool; they take a `&dyn DataGateway`.
///
/// - `user`: Credential records, roles, registration
/// - `inventory`: Pharmaceuticals, stock levels, supplier links
/// - `audit`: Append-only audit log entries

pub mod audit;
pub mod inventory;
pub mod user;
