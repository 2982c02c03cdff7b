/// Project service
///
/// A project belongs to the user who created it. Non-admins see and change
/// only their own projects; admins see and change all of them. A project that
/// exists but belongs to someone else is reported as Forbidden, never as
/// NotFound.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::error::{ServiceError, ServiceResult};
use super::non_blank;
use crate::auth::authorization::{require, visibility, Action, Principal, Target};
use crate::models::{CreateProject, Project, ProjectStatus, UpdateProject};
use crate::store::EntityStore;

const PROJECT_NOT_FOUND: &str = "Project not found";

/// Body of `POST /api/projects`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[validate(length(max = 150, message = "Project name must be at most 150 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Body of `PATCH /api/projects/:id`; absent and null fields are left alone
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[validate(length(max = 150, message = "Project name must be at most 150 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Loads a project and checks `action` against it
async fn load_authorized(
    store: &dyn EntityStore,
    principal: &Principal,
    id: Uuid,
    action: Action,
) -> ServiceResult<Project> {
    let project = store
        .find_project(id)
        .await?
        .ok_or_else(|| ServiceError::not_found(PROJECT_NOT_FOUND))?;

    require(principal, action, Target::Project(&project))?;
    Ok(project)
}

pub async fn create_project(
    store: &dyn EntityStore,
    principal: &Principal,
    req: CreateProjectRequest,
) -> ServiceResult<Project> {
    let Some(name) = non_blank(&req.name) else {
        return Err(ServiceError::bad_request("Project name is required"));
    };
    req.validate()?;

    let project = store
        .create_project(CreateProject {
            name: name.to_string(),
            description: req.description.clone(),
            status: req.status.unwrap_or_default(),
            due_date: req.due_date,
            created_by: principal.user_id,
        })
        .await?;

    tracing::info!(project_id = %project.id, user_id = %principal.user_id, "Project created");
    Ok(project)
}

/// Projects the caller may see, newest first
pub async fn list_projects(
    store: &dyn EntityStore,
    principal: &Principal,
) -> ServiceResult<Vec<Project>> {
    Ok(store.list_projects(visibility(principal)).await?)
}

pub async fn get_project(
    store: &dyn EntityStore,
    principal: &Principal,
    id: Uuid,
) -> ServiceResult<Project> {
    load_authorized(store, principal, id, Action::Read).await
}

pub async fn update_project(
    store: &dyn EntityStore,
    principal: &Principal,
    id: Uuid,
    req: UpdateProjectRequest,
) -> ServiceResult<Project> {
    load_authorized(store, principal, id, Action::Update).await?;

    if matches!(req.name.as_deref(), Some(name) if name.trim().is_empty()) {
        return Err(ServiceError::bad_request("Project name cannot be empty"));
    }
    req.validate()?;

    let project = store
        .update_project(
            id,
            UpdateProject {
                name: req.name.map(|n| n.trim().to_string()),
                description: req.description,
                status: req.status,
                due_date: req.due_date,
            },
        )
        .await?
        .ok_or_else(|| ServiceError::not_found(PROJECT_NOT_FOUND))?;

    tracing::info!(project_id = %id, user_id = %principal.user_id, "Project updated");
    Ok(project)
}

/// Deletes a project and every task in it
pub async fn delete_project(
    store: &dyn EntityStore,
    principal: &Principal,
    id: Uuid,
) -> ServiceResult<()> {
    load_authorized(store, principal, id, Action::Delete).await?;

    let task_count = store.count_tasks(id).await?;
    if !store.delete_project(id).await? {
        return Err(ServiceError::not_found(PROJECT_NOT_FOUND));
    }

    tracing::info!(
        project_id = %id,
        user_id = %principal.user_id,
        tasks_removed = task_count,
        "Project deleted"
    );
    Ok(())
}
