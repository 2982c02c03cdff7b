/// API route handlers
///
/// Handlers are thin: extract, call the matching service function, wrap the
/// result in the response envelope.
///
/// - `health`: Health check endpoint
/// - `auth`: Registration and login
/// - `users`: Self-service (`/me`) and admin user management
/// - `admin`: Admin account creation and updates
/// - `projects`: Project CRUD
/// - `tasks`: Task CRUD

pub mod admin;
pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;
