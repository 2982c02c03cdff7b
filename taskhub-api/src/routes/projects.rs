/// Project endpoints
///
/// - `POST   /api/projects` - Create a project owned by the caller
/// - `GET    /api/projects` - Admins see all, everyone else their own
/// - `GET    /api/projects/:id`
/// - `PATCH  /api/projects/:id` - Partial update
/// - `DELETE /api/projects/:id` - Also deletes the project's tasks
///
/// Single-project routes answer 404 when the project does not exist and 403
/// when it belongs to someone else.

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath},
    response::{created, ApiResponse},
};
use axum::{extract::State, http::StatusCode};
use taskhub_shared::{
    auth::authorization::Principal,
    models::Project,
    services::projects::{self, CreateProjectRequest, UpdateProjectRequest},
};
use uuid::Uuid;

pub async fn create_project(
    State(state): State<AppState>,
    principal: Principal,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, ApiResponse<Project>)> {
    let project = projects::create_project(state.store(), &principal, req).await?;
    Ok(created(ApiResponse::data(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<ApiResponse<Vec<Project>>> {
    let projects = projects::list_projects(state.store(), &principal).await?;
    Ok(ApiResponse::data(projects))
}

pub async fn get_project(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<Project>> {
    let project = projects::get_project(state.store(), &principal, id).await?;
    Ok(ApiResponse::data(project))
}

pub async fn update_project(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> ApiResult<ApiResponse<Project>> {
    let project = projects::update_project(state.store(), &principal, id, req).await?;
    Ok(ApiResponse::data(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    projects::delete_project(state.store(), &principal, id).await?;
    Ok(ApiResponse::message("Project deleted successfully"))
}
