/// Task endpoints
///
/// - `POST   /api/tasks` - Create a task in a project the caller owns
/// - `GET    /api/tasks` - Tasks in visible projects, each with its `project`
/// - `GET    /api/tasks/:id`
/// - `PATCH  /api/tasks/:id` - Partial update
/// - `DELETE /api/tasks/:id`
///
/// Access follows the parent project's owner; the assignee has no say.

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath},
    response::{created, ApiResponse},
};
use axum::{extract::State, http::StatusCode};
use taskhub_shared::{
    auth::authorization::Principal,
    models::TaskWithProject,
    services::tasks::{self, CreateTaskRequest, UpdateTaskRequest},
};
use uuid::Uuid;

pub async fn create_task(
    State(state): State<AppState>,
    principal: Principal,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, ApiResponse<TaskWithProject>)> {
    let task = tasks::create_task(state.store(), &principal, req).await?;
    Ok(created(ApiResponse::data(task)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<ApiResponse<Vec<TaskWithProject>>> {
    let tasks = tasks::list_tasks(state.store(), &principal).await?;
    Ok(ApiResponse::data(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<TaskWithProject>> {
    let task = tasks::get_task(state.store(), &principal, id).await?;
    Ok(ApiResponse::data(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<ApiResponse<TaskWithProject>> {
    let task = tasks::update_task(state.store(), &principal, id, req).await?;
    Ok(ApiResponse::data(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    tasks::delete_task(state.store(), &principal, id).await?;
    Ok(ApiResponse::message("Task deleted successfully"))
}
