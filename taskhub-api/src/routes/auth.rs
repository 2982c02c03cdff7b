/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register a new account (role `user`)
/// - `POST /api/auth/login` - Exchange credentials for a token
///
/// Both answer with the user and a bearer token:
///
/// ```json
/// {
///   "success": true,
///   "message": "Login successful",
///   "user": { "id": "uuid", "name": "Ann", "email": "ann@example.com", ... },
///   "token": "eyJ..."
/// }
/// ```

use crate::{
    app::AppState,
    error::ApiResult,
    extract::ApiJson,
    response::{created, ApiResponse},
};
use axum::{extract::State, http::StatusCode};
use chrono::Duration;
use taskhub_shared::{
    auth::jwt,
    services::{
        users::{self, LoginRequest, RegisterRequest},
        ServiceError,
    },
};
use uuid::Uuid;

/// Signs a token for `user_id` with the configured lifetime
pub fn issue_token(state: &AppState, user_id: Uuid) -> ApiResult<String> {
    let claims = jwt::Claims::with_expiration(
        user_id,
        Duration::hours(state.config.jwt.expiration_hours),
    );

    Ok(jwt::create_token(&claims, state.jwt_secret()).map_err(ServiceError::from)?)
}

/// Register a new user
///
/// # Errors
///
/// - `400 Bad Request`: Missing name, email or password, or invalid email
/// - `409 Conflict`: Email or username already in use
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, ApiResponse<()>)> {
    let user = users::register_user(state.store(), req).await?;
    let token = issue_token(&state, user.id)?;

    Ok(created(
        ApiResponse::user("User registered successfully", user).with_token(token),
    ))
}

/// Login endpoint
///
/// # Errors
///
/// - `400 Bad Request`: Missing email or password
/// - `401 Unauthorized`: Invalid credentials
/// - `403 Forbidden`: Account is inactive
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<ApiResponse<()>> {
    let user = users::authenticate(state.store(), req).await?;
    let token = issue_token(&state, user.id)?;

    Ok(ApiResponse::user("Login successful", user).with_token(token))
}
