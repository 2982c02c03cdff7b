/// Task service
///
/// Tasks inherit their owner from the parent project. The assignee is
/// recorded but never consulted for access decisions, and is not required to
/// be the project owner.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::error::{ServiceError, ServiceResult};
use super::non_blank;
use crate::auth::authorization::{require, visibility, Action, Principal, Target};
use crate::models::{CreateTask, TaskPriority, TaskStatus, TaskWithProject, UpdateTask};
use crate::store::EntityStore;

const TASK_NOT_FOUND: &str = "Task not found";

/// Body of `POST /api/tasks`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub project_id: Option<Uuid>,

    #[validate(length(max = 150, message = "Title must be at most 150 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
}

/// Body of `PATCH /api/tasks/:id`; absent and null fields are left alone
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(max = 150, message = "Title must be at most 150 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
}

async fn load_authorized(
    store: &dyn EntityStore,
    principal: &Principal,
    id: Uuid,
    action: Action,
) -> ServiceResult<TaskWithProject> {
    let task = store
        .find_task(id)
        .await?
        .ok_or_else(|| ServiceError::not_found(TASK_NOT_FOUND))?;

    require(principal, action, Target::Task(&task))?;
    Ok(task)
}

/// Adds a task to a project the caller owns (or any project, for admins)
pub async fn create_task(
    store: &dyn EntityStore,
    principal: &Principal,
    req: CreateTaskRequest,
) -> ServiceResult<TaskWithProject> {
    let (Some(project_id), Some(title)) = (req.project_id, non_blank(&req.title)) else {
        return Err(ServiceError::bad_request("Project ID and title are required"));
    };
    req.validate()?;

    let project = store
        .find_project(project_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Project not found"))?;
    require(principal, Action::CreateChild, Target::Project(&project))?;

    let task = store
        .create_task(CreateTask {
            project_id,
            assigned_to: req.assigned_to,
            title: title.to_string(),
            description: req.description.clone(),
            priority: req.priority.unwrap_or_default(),
            status: req.status.unwrap_or_default(),
            due_date: req.due_date,
        })
        .await?;

    tracing::info!(
        task_id = %task.id,
        project_id = %project_id,
        user_id = %principal.user_id,
        "Task created"
    );
    Ok(TaskWithProject { task, project })
}

/// Tasks in projects the caller may see, newest first
pub async fn list_tasks(
    store: &dyn EntityStore,
    principal: &Principal,
) -> ServiceResult<Vec<TaskWithProject>> {
    Ok(store.list_tasks(visibility(principal)).await?)
}

pub async fn get_task(
    store: &dyn EntityStore,
    principal: &Principal,
    id: Uuid,
) -> ServiceResult<TaskWithProject> {
    load_authorized(store, principal, id, Action::Read).await
}

pub async fn update_task(
    store: &dyn EntityStore,
    principal: &Principal,
    id: Uuid,
    req: UpdateTaskRequest,
) -> ServiceResult<TaskWithProject> {
    let current = load_authorized(store, principal, id, Action::Update).await?;

    if matches!(req.title.as_deref(), Some(title) if title.trim().is_empty()) {
        return Err(ServiceError::bad_request("Title cannot be empty"));
    }
    req.validate()?;

    let task = store
        .update_task(
            id,
            UpdateTask {
                title: req.title.map(|t| t.trim().to_string()),
                description: req.description,
                priority: req.priority,
                status: req.status,
                due_date: req.due_date,
                assigned_to: req.assigned_to,
            },
        )
        .await?
        .ok_or_else(|| ServiceError::not_found(TASK_NOT_FOUND))?;

    tracing::info!(
        task_id = %id,
        user_id = %principal.user_id,
        status = task.status.as_str(),
        "Task updated"
    );
    Ok(TaskWithProject {
        task,
        project: current.project,
    })
}

pub async fn delete_task(
    store: &dyn EntityStore,
    principal: &Principal,
    id: Uuid,
) -> ServiceResult<()> {
    load_authorized(store, principal, id, Action::Delete).await?;

    if !store.delete_task(id).await? {
        return Err(ServiceError::not_found(TASK_NOT_FOUND));
    }

    tracing::info!(task_id = %id, user_id = %principal.user_id, "Task deleted");
    Ok(())
}
