/// Resource services
///
/// Each service function takes the store and the calling [`Principal`] (or a
/// [`SelfScope`] for `/me` routes), validates input, asks the access control
/// engine for a decision and only then touches the store.
///
/// - `users`: accounts, credentials, self-service and admin management
/// - `projects`: projects owned by their creator
/// - `tasks`: tasks owned through their parent project
///
/// [`Principal`]: crate::auth::authorization::Principal
/// [`SelfScope`]: crate::auth::middleware::SelfScope

pub mod error;
pub mod projects;
pub mod tasks;
pub mod users;

pub use error::{FieldError, ServiceError, ServiceResult};

/// Trimmed value of an optional string, treating blank as missing
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
