/// User endpoints
///
/// # Self-service (any authenticated user)
///
/// - `GET    /api/users/me`
/// - `PATCH  /api/users/me` - name, username, email, password
/// - `DELETE /api/users/me`
///
/// # Admin only
///
/// - `GET    /api/users`
/// - `GET    /api/users/:id`
/// - `PATCH  /api/users/:id` - any field, including role and status
/// - `DELETE /api/users/:id`

use crate::{
    app::AppState,
    error::ApiResult,
    extract::{ApiJson, ApiPath},
    response::ApiResponse,
};
use axum::extract::State;
use taskhub_shared::{
    auth::{authorization::Principal, middleware::SelfScope},
    models::User,
    services::users::{self, UpdateUserRequest},
};
use uuid::Uuid;

pub async fn get_me(State(state): State<AppState>, me: SelfScope) -> ApiResult<ApiResponse<User>> {
    let user = users::get_current_user(state.store(), me).await?;
    Ok(ApiResponse::data(user))
}

/// Sending `role` or `status` here is rejected with 403
pub async fn update_me(
    State(state): State<AppState>,
    me: SelfScope,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<ApiResponse<User>> {
    let user = users::update_self(state.store(), me, req).await?;
    Ok(ApiResponse::data(user).with_message("Your account has been updated successfully"))
}

pub async fn delete_me(State(state): State<AppState>, me: SelfScope) -> ApiResult<ApiResponse<()>> {
    users::delete_self(state.store(), me).await?;
    Ok(ApiResponse::message("Your account has been deleted successfully"))
}

pub async fn list_users(
    State(state): State<AppState>,
    principal: Principal,
) -> ApiResult<ApiResponse<Vec<User>>> {
    let users = users::list_users(state.store(), &principal).await?;
    Ok(ApiResponse::data(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<User>> {
    let user = users::get_user(state.store(), &principal, id).await?;
    Ok(ApiResponse::data(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<ApiResponse<User>> {
    let user = users::update_user(state.store(), &principal, id, req).await?;
    Ok(ApiResponse::data(user).with_message("User updated successfully"))
}

pub async fn delete_user(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ApiResponse<()>> {
    users::delete_user(state.store(), &principal, id).await?;
    Ok(ApiResponse::message("User deleted successfully"))
}
