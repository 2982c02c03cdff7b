/// Access control engine
///
/// Decides whether a [`Principal`] may perform an [`Action`] on a [`Target`].
///
/// # Permission Model
///
/// 1. **Admin bypass**: admins are allowed everything
/// 2. **Ownership**: everyone else may act only on what they own
///    - a project is owned by its `created_by` user
///    - a task is owned by its parent project's `created_by` user
///    - an ownerless project (creator deleted) is admin-only
/// 3. **Admin-only operations**: user management outside `/me`
///
/// Denials are reported as [`AuthzError::Forbidden`], which callers keep
/// distinct from "not found". Decisions never cache ownership; callers pass in
/// rows they have just read.
///
/// # Example
///
/// ```
/// use taskhub_shared::auth::authorization::{authorize_owner, Decision, Principal};
/// use taskhub_shared::models::Role;
/// use uuid::Uuid;
///
/// let owner = Uuid::new_v4();
/// let alice = Principal::new(owner, Role::User);
/// let bob = Principal::new(Uuid::new_v4(), Role::User);
///
/// assert_eq!(authorize_owner(&alice, Some(owner)), Decision::Allow);
/// assert_eq!(authorize_owner(&bob, Some(owner)), Decision::Deny);
/// ```

use serde::Serialize;
use uuid::Uuid;

use crate::models::{Project, Role, TaskWithProject};
use crate::store::OwnerFilter;

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Principal is not allowed to act on the target
    #[error("Access denied")]
    Forbidden,
}

/// Authenticated caller, as resolved from a bearer token
///
/// The role is read from the store when the request is authenticated, never
/// from the token, so it reflects the latest admin decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Operation being attempted on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Update,
    Delete,

    /// Adding a child (a task) to the target project
    CreateChild,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::CreateChild => "create_child",
        }
    }
}

/// Resource an action is attempted on
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Project(&'a Project),
    Task(&'a TaskWithProject),
}

impl Target<'_> {
    /// User whose ownership decides access, if any
    pub fn owner_id(&self) -> Option<Uuid> {
        match self {
            Target::Project(project) => project.created_by,
            Target::Task(task) => task.owner_id(),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Target::Project(project) => project.id,
            Target::Task(task) => task.task.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Target::Project(_) => "project",
            Target::Task(_) => "task",
        }
    }
}

/// Outcome of an access decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// The ownership check every resource goes through
///
/// Admins are always allowed. Anyone else must be the recorded owner; a
/// missing owner allows nobody but admins.
pub fn authorize_owner(principal: &Principal, owner_id: Option<Uuid>) -> Decision {
    if principal.is_admin() {
        return Decision::Allow;
    }

    match owner_id {
        Some(owner) if owner == principal.user_id => Decision::Allow,
        _ => Decision::Deny,
    }
}

/// Decides whether `principal` may perform `action` on `target`
///
/// Every action currently has the same rule (owner or admin); the action is
/// carried for logging and so call sites read as what they do.
pub fn authorize(principal: &Principal, action: Action, target: Target<'_>) -> Decision {
    let decision = authorize_owner(principal, target.owner_id());

    if !decision.is_allowed() {
        tracing::warn!(
            user_id = %principal.user_id,
            action = action.as_str(),
            target = target.kind(),
            target_id = %target.id(),
            "Access denied"
        );
    }

    decision
}

/// Like [`authorize`] but turns a denial into [`AuthzError::Forbidden`]
pub fn require(principal: &Principal, action: Action, target: Target<'_>) -> Result<(), AuthzError> {
    match authorize(principal, action, target) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(AuthzError::Forbidden),
    }
}

/// Gates operations only admins may perform
pub fn require_admin(principal: &Principal) -> Result<(), AuthzError> {
    if principal.is_admin() {
        Ok(())
    } else {
        tracing::warn!(user_id = %principal.user_id, "Admin access required");
        Err(AuthzError::Forbidden)
    }
}

/// Listing filter for the rows `principal` may see
pub fn visibility(principal: &Principal) -> OwnerFilter {
    if principal.is_admin() {
        OwnerFilter::All
    } else {
        OwnerFilter::OwnedBy(principal.user_id)
    }
}
