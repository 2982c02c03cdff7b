/// Entity store: persistence for users, projects and tasks
///
/// The [`EntityStore`] trait is the only way services touch persistent state.
/// Two implementations ship with the crate:
///
/// - [`postgres::PgStore`]: production store backed by a sqlx `PgPool`
/// - [`memory::MemoryStore`]: in-process store used by tests and local runs
///
/// # Integrity rules
///
/// Both implementations enforce the same rules, so services never re-implement
/// them:
///
/// | Relation                 | On parent delete |
/// |--------------------------|------------------|
/// | `projects.created_by`    | set to NULL      |
/// | `tasks.project_id`       | cascade delete   |
/// | `tasks.assigned_to`      | set to NULL      |
///
/// `users.email` is always unique and `users.username` is unique when
/// present. Violations surface as [`StoreError::UniqueViolation`] naming the
/// offending field; dangling references surface as
/// [`StoreError::ForeignKeyViolation`].
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::store::{memory::MemoryStore, EntityStore, OwnerFilter};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), taskhub_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// let mine = store.list_projects(OwnerFilter::OwnedBy(Uuid::new_v4())).await?;
/// assert!(mine.is_empty());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    CreateProject, CreateTask, CreateUser, Project, Task, TaskWithProject, UpdateProject,
    UpdateTask, UpdateUser, User,
};

pub mod memory;
pub mod postgres;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Duplicate value for {field}")]
    UniqueViolation { field: String },

    /// A reference pointed at a row that does not exist
    #[error("Foreign key constraint failed: {0}")]
    ForeignKeyViolation(String),

    /// Any other failure of the underlying engine
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn unique(field: impl Into<String>) -> Self {
        StoreError::UniqueViolation {
            field: field.into(),
        }
    }
}

/// Maps a unique constraint name to the user-facing field it protects
pub fn field_for_constraint(constraint: &str) -> &str {
    match constraint {
        "users_email_key" => "email",
        "users_username_key" => "username",
        other => other,
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or("unknown");
            match db_err.kind() {
                sqlx::error::ErrorKind::UniqueViolation => {
                    return StoreError::unique(field_for_constraint(constraint));
                }
                sqlx::error::ErrorKind::ForeignKeyViolation => {
                    return StoreError::ForeignKeyViolation(constraint.to_string());
                }
                _ => {}
            }
        }

        StoreError::Database(err.to_string())
    }
}

/// Which rows a listing may return
///
/// Listing filters are applied inside the store query so rows the caller may
/// not see are never loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerFilter {
    /// Every row (admins)
    All,

    /// Projects created by this user, or tasks inside such projects
    OwnedBy(Uuid),
}

/// Repository interface over users, projects and tasks
///
/// Every method is a single atomic unit: either all of its writes are
/// visible or none are. Update and delete methods return `None`/`false` when
/// the target row does not exist at write time.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Verifies the store is reachable
    async fn ping(&self) -> StoreResult<()>;

    // Users

    /// Inserts a user, rejecting a duplicate email or username
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Lists all users, newest first
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;

    /// Deletes a user, orphaning their projects and unassigning their tasks
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    // Projects

    async fn create_project(&self, data: CreateProject) -> StoreResult<Project>;

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>>;

    /// Lists projects visible under `filter`, newest first
    async fn list_projects(&self, filter: OwnerFilter) -> StoreResult<Vec<Project>>;

    async fn update_project(&self, id: Uuid, data: UpdateProject) -> StoreResult<Option<Project>>;

    /// Deletes a project together with all of its tasks
    async fn delete_project(&self, id: Uuid) -> StoreResult<bool>;

    // Tasks

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task>;

    /// Loads a task joined with its parent project
    async fn find_task(&self, id: Uuid) -> StoreResult<Option<TaskWithProject>>;

    /// Lists tasks (with projects) visible under `filter`, newest first
    async fn list_tasks(&self, filter: OwnerFilter) -> StoreResult<Vec<TaskWithProject>>;

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>>;

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool>;

    /// Number of tasks in a project
    async fn count_tasks(&self, project_id: Uuid) -> StoreResult<i64>;
}
