/// Authentication middleware for Axum
///
/// Validates the `Authorization: Bearer <token>` header, re-reads the user the
/// token names and adds a [`Principal`] to the request extensions. Handlers
/// pull it back out with the [`Principal`] or [`SelfScope`] extractors.
///
/// The user is re-read on every request, so a role change or a deletion takes
/// effect on the very next call with an old token.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{extract::Request, middleware::{self, Next}, routing::get, Router};
/// use taskhub_shared::auth::authorization::Principal;
/// use taskhub_shared::auth::middleware::{jwt_auth_middleware, AuthState};
/// use taskhub_shared::store::memory::MemoryStore;
///
/// async fn whoami(principal: Principal) -> String {
///     format!("Hello, user {}!", principal.user_id)
/// }
///
/// let auth = AuthState::new(Arc::new(MemoryStore::new()), "your-jwt-secret");
/// let app: Router = Router::new()
///     .route("/whoami", get(whoami))
///     .layer(middleware::from_fn(move |req: Request, next: Next| {
///         jwt_auth_middleware(auth.clone(), req, next)
///     }));
/// ```

use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use uuid::Uuid;

use super::authorization::Principal;
use super::jwt::{validate_token, JwtError};
use crate::store::EntityStore;

/// Everything the middleware needs to turn a token into a principal
#[derive(Clone)]
pub struct AuthState {
    pub store: Arc<dyn EntityStore>,
    pub secret: Arc<str>,
}

impl AuthState {
    pub fn new(store: Arc<dyn EntityStore>, secret: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            secret: secret.into(),
        }
    }
}

/// Error type for authentication middleware
#[derive(Debug)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Invalid authorization header format
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),

    /// Token names a user that no longer exists
    UnknownUser,

    /// Account has been deactivated
    Inactive,

    /// Store lookup failed
    StoreError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AuthError::MissingCredentials
            | AuthError::InvalidFormat(_)
            | AuthError::InvalidToken(_)
            | AuthError::UnknownUser => (StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized"),
            AuthError::Inactive => (StatusCode::FORBIDDEN, "forbidden", "Account is inactive"),
            AuthError::StoreError(ref e) => {
                tracing::error!(error = %e, "Failed to resolve principal");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };

        let body = json!({
            "success": false,
            "message": message,
            "error": code,
        });

        (status, Json(body)).into_response()
    }
}

/// Resolves the bearer token in `headers` to a [`Principal`]
async fn resolve_principal(auth: &AuthState, headers: &HeaderMap) -> Result<Principal, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_token(token, &auth.secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken(format!("Invalid token: {}", e)),
    })?;

    let user = auth
        .store
        .find_user(claims.sub)
        .await
        .map_err(|e| AuthError::StoreError(e.to_string()))?
        .ok_or(AuthError::UnknownUser)?;

    if !user.is_active() {
        return Err(AuthError::Inactive);
    }

    Ok(Principal::new(user.id, user.role))
}

/// JWT authentication middleware
///
/// # Errors
///
/// Returns 401 Unauthorized if the header is missing or malformed, the token
/// fails validation, or the user it names is gone. Returns 403 Forbidden for a
/// deactivated account.
pub async fn jwt_auth_middleware(
    auth: AuthState,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = resolve_principal(&auth, req.headers()).await.map_err(|e| {
        tracing::debug!(error = ?e, path = %req.uri().path(), "Authentication failed");
        e
    })?;

    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .copied()
            .ok_or(AuthError::MissingCredentials)
    }
}

/// Identity for `/me` routes
///
/// The target of a self-service call is always the caller; no ownership
/// lookup happens.
#[derive(Debug, Clone, Copy)]
pub struct SelfScope(pub Principal);

impl SelfScope {
    pub fn user_id(&self) -> Uuid {
        self.0.user_id
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SelfScope
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Principal::from_request_parts(parts, state).await.map(SelfScope)
    }
}
