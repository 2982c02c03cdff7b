/// Admin user management
///
/// # Endpoints
///
/// - `POST  /api/admin/create-user` - Create an account with any role
/// - `PATCH /api/admin/users/:id` - Update any field of any account
///
/// Unlike the rest of the API, the update endpoint reports a duplicate email
/// or username as `400 Bad Request` rather than `409 Conflict`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiPath},
    response::{created, ApiResponse},
};
use axum::{extract::State, http::StatusCode};
use taskhub_shared::{
    auth::authorization::Principal,
    services::users::{self, CreateUserRequest, UpdateUserRequest},
};
use uuid::Uuid;

/// Create a user
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields, invalid role or invalid email
/// - `403 Forbidden`: Caller is not an admin
/// - `409 Conflict`: Email or username already in use
pub async fn create_user(
    State(state): State<AppState>,
    principal: Principal,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, ApiResponse<()>)> {
    let user = users::create_user(state.store(), &principal, req).await?;

    Ok(created(ApiResponse::user(
        "User created successfully by admin",
        user,
    )))
}

/// Update a user
///
/// # Errors
///
/// - `400 Bad Request`: Invalid role, invalid email, or duplicate field
/// - `403 Forbidden`: Caller is not an admin
/// - `404 Not Found`: No such user
pub async fn update_user(
    State(state): State<AppState>,
    principal: Principal,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<ApiResponse<()>> {
    let user = users::update_user(state.store(), &principal, id, req)
        .await
        .map_err(|e| ApiError::from(e).conflict_as_bad_request())?;

    Ok(ApiResponse::user("User updated successfully by admin", user))
}
