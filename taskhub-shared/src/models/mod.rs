/// Data records for TaskHub
///
/// Plain structs describing rows and the inputs used to create or patch them.
/// Persistence lives behind [`crate::store::EntityStore`]; nothing in this
/// module talks to a database.
///
/// # Models
///
/// - `user`: Accounts, roles and status
/// - `project`: Projects owned by their creator
/// - `task`: Tasks owned transitively through their project

pub mod project;
pub mod task;
pub mod user;

pub use project::{CreateProject, Project, ProjectStatus, UpdateProject};
pub use task::{CreateTask, Task, TaskPriority, TaskStatus, TaskWithProject, UpdateTask};
pub use user::{CreateUser, Role, UpdateUser, User, UserStatus};
