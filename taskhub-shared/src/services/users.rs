/// User service
///
/// Account creation (by an admin or by self-registration), credential checks,
/// self-service and admin updates, listing and deletion.
///
/// # Update scopes
///
/// - **Self** (`/me`): name, username, email and password. Sending `role` or
///   `status` is rejected with Forbidden.
/// - **Admin**: every field, including `role` and `status`.
///
/// Both scopes use partial-update semantics; `username: null` clears the
/// username.

use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

use super::error::{FieldError, ServiceError, ServiceResult};
use super::non_blank;
use crate::auth::authorization::{require_admin, Principal};
use crate::auth::middleware::SelfScope;
use crate::auth::password::{hash_password, verify_password};
use crate::models::{CreateUser, Role, UpdateUser, User, UserStatus};
use crate::store::{EntityStore, StoreError};

const USER_NOT_FOUND: &str = "User not found";
const USERNAME_MAX_CHARS: usize = 100;

/// Distinguishes "field absent" (`None`) from "field is null" (`Some(None)`)
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Body of `POST /api/admin/create-user`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(max = 150, message = "Name must be at most 150 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 100, message = "Username must be at most 100 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password: Option<String>,

    /// Kept as text so an unknown role is a clear 400, not a parse failure
    pub role: Option<String>,
}

/// Body of `POST /api/auth/register`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(max = 150, message = "Name must be at most 150 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 100, message = "Username must be at most 100 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password: Option<String>,
}

/// Body of `POST /api/auth/login`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Body of every user PATCH endpoint
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(max = 150, message = "Name must be at most 150 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub username: Option<Option<String>>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password: Option<String>,

    pub role: Option<String>,

    pub status: Option<UserStatus>,
}

/// Who is asking for a user update, and therefore which fields it may touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateScope {
    /// The caller editing their own account
    Own,

    /// An administrator editing any account
    Admin,
}

fn parse_role(value: &str) -> ServiceResult<Role> {
    Role::parse(value.trim()).ok_or_else(|| ServiceError::bad_request("Invalid role specified"))
}

/// Shared insert path for admin-created and self-registered accounts
async fn insert_user(
    store: &dyn EntityStore,
    name: &str,
    username: Option<&str>,
    email: &str,
    password: &str,
    role: Role,
) -> ServiceResult<User> {
    if store.find_user_by_email(email).await?.is_some() {
        return Err(ServiceError::conflict("User already exists with this email"));
    }
    if let Some(username) = username {
        if store.find_user_by_username(username).await?.is_some() {
            return Err(ServiceError::conflict("Username already in use"));
        }
    }

    let password_hash = hash_password(password)?;

    let user = store
        .create_user(CreateUser {
            name: name.to_string(),
            username: username.map(str::to_string),
            email: email.to_string(),
            password_hash,
            role,
            status: UserStatus::Active,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation { ref field } if field == "email" => {
                ServiceError::conflict("User already exists with this email")
            }
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User created");
    Ok(user)
}

/// Creates an account on behalf of an admin
///
/// # Errors
///
/// - Forbidden unless `principal` is an admin
/// - BadRequest when name, email, password or role is missing, or the role
///   is not `user`/`admin`
/// - Conflict when the email or username is taken
pub async fn create_user(
    store: &dyn EntityStore,
    principal: &Principal,
    req: CreateUserRequest,
) -> ServiceResult<User> {
    require_admin(principal)?;

    let (Some(name), Some(email), Some(password), Some(role)) = (
        non_blank(&req.name),
        non_blank(&req.email),
        non_blank(&req.password),
        non_blank(&req.role),
    ) else {
        return Err(ServiceError::bad_request(
            "name, email, password, and role are required",
        ));
    };

    let role = parse_role(role)?;
    req.validate()?;

    let user = insert_user(store, name, non_blank(&req.username), email, password, role).await?;
    tracing::info!(admin_id = %principal.user_id, user_id = %user.id, "User created by admin");
    Ok(user)
}

/// Self-registration; the new account is always a plain `user`
pub async fn register_user(store: &dyn EntityStore, req: RegisterRequest) -> ServiceResult<User> {
    let (Some(name), Some(email), Some(password)) = (
        non_blank(&req.name),
        non_blank(&req.email),
        non_blank(&req.password),
    ) else {
        return Err(ServiceError::bad_request(
            "name, email, and password are required",
        ));
    };

    req.validate()?;

    insert_user(store, name, non_blank(&req.username), email, password, Role::User).await
}

/// Checks login credentials
///
/// Unknown email and wrong password produce the same error.
pub async fn authenticate(store: &dyn EntityStore, req: LoginRequest) -> ServiceResult<User> {
    let (Some(email), Some(password)) = (non_blank(&req.email), req.password.as_deref()) else {
        return Err(ServiceError::bad_request("Email and password are required"));
    };

    let invalid = || ServiceError::Unauthorized("Invalid email or password".to_string());

    let user = store.find_user_by_email(email).await?.ok_or_else(invalid)?;

    if !verify_password(password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "Failed login attempt");
        return Err(invalid());
    }

    if !user.is_active() {
        tracing::warn!(user_id = %user.id, "Login attempt on inactive account");
        return Err(ServiceError::Forbidden("Account is inactive".to_string()));
    }

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(user)
}

/// The caller's own account
pub async fn get_current_user(store: &dyn EntityStore, me: SelfScope) -> ServiceResult<User> {
    store
        .find_user(me.user_id())
        .await?
        .ok_or_else(|| ServiceError::not_found(USER_NOT_FOUND))
}

/// All accounts, newest first (admin only)
pub async fn list_users(store: &dyn EntityStore, principal: &Principal) -> ServiceResult<Vec<User>> {
    require_admin(principal)?;
    Ok(store.list_users().await?)
}

/// Any account by id (admin only)
pub async fn get_user(
    store: &dyn EntityStore,
    principal: &Principal,
    id: Uuid,
) -> ServiceResult<User> {
    require_admin(principal)?;

    store
        .find_user(id)
        .await?
        .ok_or_else(|| ServiceError::not_found(USER_NOT_FOUND))
}

/// Updates the caller's own account
pub async fn update_self(
    store: &dyn EntityStore,
    me: SelfScope,
    req: UpdateUserRequest,
) -> ServiceResult<User> {
    apply_update(store, UpdateScope::Own, me.user_id(), req).await
}

/// Updates any account (admin only)
pub async fn update_user(
    store: &dyn EntityStore,
    principal: &Principal,
    id: Uuid,
    req: UpdateUserRequest,
) -> ServiceResult<User> {
    require_admin(principal)?;
    let user = apply_update(store, UpdateScope::Admin, id, req).await?;

    tracing::info!(admin_id = %principal.user_id, user_id = %user.id, "User updated by admin");
    Ok(user)
}

async fn apply_update(
    store: &dyn EntityStore,
    scope: UpdateScope,
    target_id: Uuid,
    req: UpdateUserRequest,
) -> ServiceResult<User> {
    let role = match (scope, req.role.as_deref()) {
        (UpdateScope::Own, _) if req.role.is_some() || req.status.is_some() => {
            tracing::warn!(user_id = %target_id, "Attempt to change own role or status");
            return Err(ServiceError::Forbidden(
                "You cannot change your own role or status".to_string(),
            ));
        }
        (UpdateScope::Admin, Some(role)) => Some(parse_role(role)?),
        _ => None,
    };

    if matches!(req.name.as_deref(), Some(name) if name.trim().is_empty()) {
        return Err(ServiceError::bad_request("Name cannot be empty"));
    }
    if matches!(req.password.as_deref(), Some("")) {
        return Err(ServiceError::bad_request("Password cannot be empty"));
    }
    req.validate()?;

    // Blank usernames are stored as no username
    let username = req
        .username
        .map(|u| u.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()));

    // The derive cannot see through the double option
    if matches!(&username, Some(Some(u)) if u.chars().count() > USERNAME_MAX_CHARS) {
        return Err(ServiceError::Validation(vec![FieldError {
            field: "username".to_string(),
            message: "Username must be at most 100 characters".to_string(),
        }]));
    }

    let existing = store
        .find_user(target_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(USER_NOT_FOUND))?;

    // Best-effort pre-checks; the unique constraints are the final word
    if let Some(email) = req.email.as_deref() {
        if email != existing.email {
            if let Some(other) = store.find_user_by_email(email).await? {
                if other.id != target_id {
                    return Err(ServiceError::conflict("Email already in use"));
                }
            }
        }
    }
    if let Some(Some(new_username)) = username.as_ref() {
        if existing.username.as_ref() != Some(new_username) {
            if let Some(other) = store.find_user_by_username(new_username).await? {
                if other.id != target_id {
                    return Err(ServiceError::conflict("Username already in use"));
                }
            }
        }
    }

    let password_hash = match req.password.as_deref() {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let changes = UpdateUser {
        name: req.name.map(|n| n.trim().to_string()),
        username,
        email: req.email,
        password_hash,
        role,
        status: req.status,
    };

    if changes.is_empty() {
        return Ok(existing);
    }

    let user = store
        .update_user(target_id, changes)
        .await?
        .ok_or_else(|| ServiceError::not_found(USER_NOT_FOUND))?;

    tracing::info!(user_id = %user.id, scope = ?scope, "User updated");
    Ok(user)
}

/// Deletes the caller's own account
pub async fn delete_self(store: &dyn EntityStore, me: SelfScope) -> ServiceResult<()> {
    remove_user(store, me.user_id()).await
}

/// Deletes any account (admin only)
///
/// Projects the user created lose their owner and tasks assigned to them lose
/// their assignee; neither is deleted.
pub async fn delete_user(
    store: &dyn EntityStore,
    principal: &Principal,
    id: Uuid,
) -> ServiceResult<()> {
    require_admin(principal)?;
    remove_user(store, id).await
}

async fn remove_user(store: &dyn EntityStore, id: Uuid) -> ServiceResult<()> {
    if !store.delete_user(id).await? {
        return Err(ServiceError::not_found(USER_NOT_FOUND));
    }

    tracing::info!(user_id = %id, "User deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{seed_user, store};

    fn admin_request(email: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: Some("A".to_string()),
            username: None,
            email: Some(email.to_string()),
            password: Some("p".to_string()),
            role: Some("user".to_string()),
        }
    }

    #[tokio::test]
    async fn test_admin_creates_user() {
        let store = store();
        let admin = seed_user(&store, "admin@x.com", Role::Admin).await;

        let user = create_user(&store, &admin, admin_request("a@x.com")).await.unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.status, UserStatus::Active);
        assert!(user.password_hash.starts_with("$argon2id$"));

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_create_user_requires_admin() {
        let store = store();
        let user = seed_user(&store, "u@x.com", Role::User).await;

        let err = create_user(&store, &user, admin_request("a@x.com")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_create_user_input_checks() {
        let store = store();
        let admin = seed_user(&store, "admin@x.com", Role::Admin).await;

        let mut missing = admin_request("a@x.com");
        missing.password = None;
        let err = create_user(&store, &admin, missing).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::BadRequest(ref m) if m == "name, email, password, and role are required"
        ));

        let mut bad_role = admin_request("a@x.com");
        bad_role.role = Some("owner".to_string());
        let err = create_user(&store, &admin, bad_role).await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(ref m) if m == "Invalid role specified"));

        let err = create_user(&store, &admin, admin_request("nope")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = store();
        let admin = seed_user(&store, "admin@x.com", Role::Admin).await;

        let err = create_user(&store, &admin, admin_request("admin@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Conflict(ref m) if m == "User already exists with this email"
        ));
    }

    #[tokio::test]
    async fn test_self_update_cannot_touch_role() {
        let store = store();
        let user = seed_user(&store, "u@x.com", Role::User).await;

        let req = UpdateUserRequest {
            role: Some("admin".to_string()),
            ..Default::default()
        };
        let err = update_self(&store, SelfScope(user), req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let req = UpdateUserRequest {
            status: Some(UserStatus::Inactive),
            ..Default::default()
        };
        let err = update_self(&store, SelfScope(user), req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));

        let reloaded = store.find_user(user.user_id).await.unwrap().unwrap();
        assert_eq!(reloaded.role, Role::User);
        assert_eq!(reloaded.status, UserStatus::Active);
    }

    #[tokio::test]
    async fn test_self_update_username_and_clear() {
        let store = store();
        let user = seed_user(&store, "u@x.com", Role::User).await;

        let req: UpdateUserRequest = serde_json::from_str(r#"{"username":"neo"}"#).unwrap();
        let updated = update_self(&store, SelfScope(user), req).await.unwrap();
        assert_eq!(updated.username.as_deref(), Some("neo"));

        // Absent keeps it
        let req: UpdateUserRequest = serde_json::from_str(r#"{"name":"Neo"}"#).unwrap();
        let updated = update_self(&store, SelfScope(user), req).await.unwrap();
        assert_eq!(updated.username.as_deref(), Some("neo"));
        assert_eq!(updated.name, "Neo");

        // Null clears it
        let req: UpdateUserRequest = serde_json::from_str(r#"{"username":null}"#).unwrap();
        let updated = update_self(&store, SelfScope(user), req).await.unwrap();
        assert_eq!(updated.username, None);
    }

    #[tokio::test]
    async fn test_update_rejects_overlong_username() {
        let store = store();
        let admin = seed_user(&store, "root@x.com", Role::Admin).await;
        let user = seed_user(&store, "u@x.com", Role::User).await;

        let long = "n".repeat(101);
        let req = UpdateUserRequest {
            username: Some(Some(long.clone())),
            ..Default::default()
        };
        let err = update_self(&store, SelfScope(user), req.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Validation(ref errors) if errors[0].field == "username"
        ));

        let err = update_user(&store, &admin, user.user_id, req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let untouched = store.find_user(user.user_id).await.unwrap().unwrap();
        assert_eq!(untouched.username, None);

        // Exactly at the limit is fine
        let req = UpdateUserRequest {
            username: Some(Some(long[..100].to_string())),
            ..Default::default()
        };
        let updated = update_self(&store, SelfScope(user), req).await.unwrap();
        assert_eq!(updated.username.map(|u| u.len()), Some(100));
    }

    #[tokio::test]
    async fn test_update_rejects_taken_email_and_username() {
        let store = store();
        let admin = seed_user(&store, "admin@x.com", Role::Admin).await;
        let user = seed_user(&store, "u@x.com", Role::User).await;

        let req = UpdateUserRequest {
            username: Some(Some("taken".to_string())),
            ..Default::default()
        };
        update_self(&store, SelfScope(admin), req).await.unwrap();

        let req = UpdateUserRequest {
            email: Some("admin@x.com".to_string()),
            ..Default::default()
        };
        let err = update_self(&store, SelfScope(user), req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "Email already in use"));

        let req = UpdateUserRequest {
            username: Some(Some("taken".to_string())),
            ..Default::default()
        };
        let err = update_user(&store, &admin, user.user_id, req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "Username already in use"));
    }

    #[tokio::test]
    async fn test_admin_update_role_and_status() {
        let store = store();
        let admin = seed_user(&store, "admin@x.com", Role::Admin).await;
        let user = seed_user(&store, "u@x.com", Role::User).await;

        let req = UpdateUserRequest {
            role: Some("admin".to_string()),
            status: Some(UserStatus::Inactive),
            ..Default::default()
        };
        let updated = update_user(&store, &admin, user.user_id, req).await.unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.status, UserStatus::Inactive);

        let req = UpdateUserRequest {
            role: Some("root".to_string()),
            ..Default::default()
        };
        let err = update_user(&store, &admin, user.user_id, req).await.unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));

        let err = update_user(&store, &admin, Uuid::new_v4(), UpdateUserRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_register_and_authenticate() {
        let store = store();

        let user = register_user(
            &store,
            RegisterRequest {
                name: Some("Reg".to_string()),
                username: Some("reg".to_string()),
                email: Some("reg@x.com".to_string()),
                password: Some("p".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(user.role, Role::User);

        let login = |password: &str| LoginRequest {
            email: Some("reg@x.com".to_string()),
            password: Some(password.to_string()),
        };

        let authed = authenticate(&store, login("p")).await.unwrap();
        assert_eq!(authed.id, user.id);

        let err = authenticate(&store, login("wrong")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(ref m) if m == "Invalid email or password"));

        let err = authenticate(
            &store,
            LoginRequest {
                email: Some("ghost@x.com".to_string()),
                password: Some("p".to_string()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_delete_and_get_current_user() {
        let store = store();
        let admin = seed_user(&store, "admin@x.com", Role::Admin).await;
        let user = seed_user(&store, "u@x.com", Role::User).await;

        assert_eq!(
            get_current_user(&store, SelfScope(user)).await.unwrap().email,
            "u@x.com"
        );

        delete_self(&store, SelfScope(user)).await.unwrap();
        let err = get_current_user(&store, SelfScope(user)).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        let err = delete_user(&store, &admin, user.user_id).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        assert_eq!(list_users(&store, &admin).await.unwrap().len(), 1);
        let err = list_users(&store, &user).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }
}
