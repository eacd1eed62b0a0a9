/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, current session
/// - `inventory`: Role-scoped inventory listing and creation

pub mod auth;
pub mod health;
pub mod inventory;
