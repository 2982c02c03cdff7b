/// In-memory implementation of [`EntityStore`]
///
/// Holds all rows behind a single `tokio::sync::RwLock`. Each trait method
/// takes the lock once, so every method is atomic with respect to the others,
/// matching the transactional guarantees of the Postgres store. Unique and
/// foreign-key rules mirror the SQL schema.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EntityStore, OwnerFilter, StoreError, StoreResult};
use crate::models::{
    CreateProject, CreateTask, CreateUser, Project, Task, TaskWithProject, UpdateProject,
    UpdateTask, UpdateUser, User,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    tasks: HashMap<Uuid, Task>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn username_taken(&self, username: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.username.as_deref() == Some(username) && Some(u.id) != except)
    }

    fn join_project(&self, task: &Task) -> Option<TaskWithProject> {
        self.projects.get(&task.project_id).map(|project| TaskWithProject {
            task: task.clone(),
            project: project.clone(),
        })
    }

    fn check_assignee(&self, assigned_to: Option<Uuid>) -> StoreResult<()> {
        match assigned_to {
            Some(user_id) if !self.users.contains_key(&user_id) => Err(
                StoreError::ForeignKeyViolation("tasks_assigned_to_fkey".to_string()),
            ),
            _ => Ok(()),
        }
    }
}

/// Store keeping every row in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        if tables.email_taken(&data.email, None) {
            return Err(StoreError::unique("email"));
        }
        if let Some(username) = data.username.as_deref() {
            if tables.username_taken(username, None) {
                return Err(StoreError::unique("username"));
            }
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            username: data.username,
            email: data.email,
            password_hash: data.password_hash,
            role: data.role,
            status: data.status,
            created_at: now,
            updated_at: now,
        };

        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username.as_deref() == Some(username))
            .cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&id) {
            return Ok(None);
        }
        if let Some(email) = data.email.as_deref() {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::unique("email"));
            }
        }
        if let Some(Some(username)) = data.username.as_ref() {
            if tables.username_taken(username, Some(id)) {
                return Err(StoreError::unique("username"));
            }
        }

        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = data.name {
            user.name = name;
        }
        if let Some(username) = data.username {
            user.username = username;
        }
        if let Some(email) = data.email {
            user.email = email;
        }
        if let Some(password_hash) = data.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(role) = data.role {
            user.role = role;
        }
        if let Some(status) = data.status {
            user.status = status;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }

        // ON DELETE SET NULL for projects.created_by and tasks.assigned_to
        for project in tables.projects.values_mut() {
            if project.created_by == Some(id) {
                project.created_by = None;
            }
        }
        for task in tables.tasks.values_mut() {
            if task.assigned_to == Some(id) {
                task.assigned_to = None;
            }
        }

        Ok(true)
    }

    async fn create_project(&self, data: CreateProject) -> StoreResult<Project> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&data.created_by) {
            return Err(StoreError::ForeignKeyViolation(
                "projects_created_by_fkey".to_string(),
            ));
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            status: data.status,
            due_date: data.due_date,
            created_by: Some(data.created_by),
            created_at: now,
            updated_at: now,
        };

        tables.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(self.tables.read().await.projects.get(&id).cloned())
    }

    async fn list_projects(&self, filter: OwnerFilter) -> StoreResult<Vec<Project>> {
        let tables = self.tables.read().await;
        let mut projects: Vec<Project> = tables
            .projects
            .values()
            .filter(|p| match filter {
                OwnerFilter::All => true,
                OwnerFilter::OwnedBy(owner) => p.created_by == Some(owner),
            })
            .cloned()
            .collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn update_project(&self, id: Uuid, data: UpdateProject) -> StoreResult<Option<Project>> {
        let mut tables = self.tables.write().await;

        let Some(project) = tables.projects.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = data.name {
            project.name = name;
        }
        if let Some(description) = data.description {
            project.description = Some(description);
        }
        if let Some(status) = data.status {
            project.status = status;
        }
        if let Some(due_date) = data.due_date {
            project.due_date = Some(due_date);
        }
        project.updated_at = Utc::now();

        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        if tables.projects.remove(&id).is_none() {
            return Ok(false);
        }

        // ON DELETE CASCADE for tasks.project_id
        tables.tasks.retain(|_, task| task.project_id != id);

        Ok(true)
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;

        if !tables.projects.contains_key(&data.project_id) {
            return Err(StoreError::ForeignKeyViolation(
                "tasks_project_id_fkey".to_string(),
            ));
        }
        tables.check_assignee(data.assigned_to)?;

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            project_id: data.project_id,
            assigned_to: data.assigned_to,
            title: data.title,
            description: data.description,
            priority: data.priority,
            status: data.status,
            due_date: data.due_date,
            created_at: now,
            updated_at: now,
        };

        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<TaskWithProject>> {
        let tables = self.tables.read().await;
        Ok(tables.tasks.get(&id).and_then(|task| tables.join_project(task)))
    }

    async fn list_tasks(&self, filter: OwnerFilter) -> StoreResult<Vec<TaskWithProject>> {
        let tables = self.tables.read().await;
        let mut tasks: Vec<TaskWithProject> = tables
            .tasks
            .values()
            .filter_map(|task| tables.join_project(task))
            .filter(|joined| match filter {
                OwnerFilter::All => true,
                OwnerFilter::OwnedBy(owner) => joined.project.created_by == Some(owner),
            })
            .collect();
        tasks.sort_by(|a, b| b.task.created_at.cmp(&a.task.created_at));
        Ok(tasks)
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.write().await;

        if !tables.tasks.contains_key(&id) {
            return Ok(None);
        }
        tables.check_assignee(data.assigned_to)?;

        let Some(task) = tables.tasks.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = data.title {
            task.title = title;
        }
        if let Some(description) = data.description {
            task.description = Some(description);
        }
        if let Some(priority) = data.priority {
            task.priority = priority;
        }
        if let Some(status) = data.status {
            task.status = status;
        }
        if let Some(due_date) = data.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(assigned_to) = data.assigned_to {
            task.assigned_to = Some(assigned_to);
        }
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.tables.write().await.tasks.remove(&id).is_some())
    }

    async fn count_tasks(&self, project_id: Uuid) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .values()
            .filter(|task| task.project_id == project_id)
            .count() as i64)
    }
}
