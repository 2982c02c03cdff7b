/// PostgreSQL implementation of [`EntityStore`]
///
/// Referential rules are declared in the schema (see `migrations/`), so
/// cascades happen inside the same statement as the parent delete. Unique and
/// foreign-key violations are classified by `From<sqlx::Error> for StoreError`.
///
/// # Example
///
/// ```no_run
/// use taskhub_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskhub_shared::store::postgres::PgStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let store = PgStore::new(pool);
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::{EntityStore, OwnerFilter, StoreError, StoreResult};
use crate::db::pool::health_check;
use crate::models::{
    CreateProject, CreateTask, CreateUser, Project, ProjectStatus, Task, TaskPriority, TaskStatus,
    TaskWithProject, UpdateProject, UpdateTask, UpdateUser, User,
};

const USER_COLUMNS: &str =
    "id, name, username, email, password_hash, role, status, created_at, updated_at";

const PROJECT_COLUMNS: &str =
    "id, name, description, status, due_date, created_by, created_at, updated_at";

const TASK_COLUMNS: &str = "id, project_id, assigned_to, title, description, priority, status, \
                            due_date, created_at, updated_at";

/// Task columns joined with the parent project's columns (prefixed `p_`)
const TASK_WITH_PROJECT_SELECT: &str = r#"
    SELECT t.id, t.project_id, t.assigned_to, t.title, t.description, t.priority,
           t.status, t.due_date, t.created_at, t.updated_at,
           p.name AS p_name, p.description AS p_description, p.status AS p_status,
           p.due_date AS p_due_date, p.created_by AS p_created_by,
           p.created_at AS p_created_at, p.updated_at AS p_updated_at
    FROM tasks t
    INNER JOIN projects p ON p.id = t.project_id
"#;

/// Row shape of [`TASK_WITH_PROJECT_SELECT`]
#[derive(sqlx::FromRow)]
struct TaskProjectRow {
    id: Uuid,
    project_id: Uuid,
    assigned_to: Option<Uuid>,
    title: String,
    description: Option<String>,
    priority: TaskPriority,
    status: TaskStatus,
    due_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    p_name: String,
    p_description: Option<String>,
    p_status: ProjectStatus,
    p_due_date: Option<DateTime<Utc>>,
    p_created_by: Option<Uuid>,
    p_created_at: DateTime<Utc>,
    p_updated_at: DateTime<Utc>,
}

impl From<TaskProjectRow> for TaskWithProject {
    fn from(row: TaskProjectRow) -> Self {
        TaskWithProject {
            project: Project {
                id: row.project_id,
                name: row.p_name,
                description: row.p_description,
                status: row.p_status,
                due_date: row.p_due_date,
                created_by: row.p_created_by,
                created_at: row.p_created_at,
                updated_at: row.p_updated_at,
            },
            task: Task {
                id: row.id,
                project_id: row.project_id,
                assigned_to: row.assigned_to,
                title: row.title,
                description: row.description,
                priority: row.priority,
                status: row.status,
                due_date: row.due_date,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

/// Store backed by a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool (for health checks and shutdown)
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        health_check(&self.pool).await?;
        Ok(())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        // The existence check and the insert share a transaction; the unique
        // constraint still backs it up against concurrent inserts.
        let mut tx = self.pool.begin().await?;

        let email_taken: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(&data.email)
                .fetch_one(&mut *tx)
                .await?;

        if email_taken {
            debug!(email = %data.email, "Rejecting user insert, email taken");
            return Err(StoreError::unique("email"));
        }

        let sql = format!(
            "INSERT INTO users (id, name, username, email, password_hash, role, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {USER_COLUMNS}"
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.name)
            .bind(data.username)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.role)
            .bind(data.status)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(users)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.username.is_some() {
            bind_count += 1;
            query.push_str(&format!(", username = ${}", bind_count));
        }
        if data.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if data.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if data.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(username) = data.username {
            q = q.bind(username);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }

        let user = q.fetch_optional(&self.pool).await?;

        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        // projects.created_by and tasks.assigned_to are ON DELETE SET NULL
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_project(&self, data: CreateProject) -> StoreResult<Project> {
        let sql = format!(
            "INSERT INTO projects (id, name, description, status, due_date, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PROJECT_COLUMNS}"
        );

        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.name)
            .bind(data.description)
            .bind(data.status)
            .bind(data.due_date)
            .bind(data.created_by)
            .fetch_one(&self.pool)
            .await?;

        Ok(project)
    }

    async fn find_project(&self, id: Uuid) -> StoreResult<Option<Project>> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(project)
    }

    async fn list_projects(&self, filter: OwnerFilter) -> StoreResult<Vec<Project>> {
        let projects = match filter {
            OwnerFilter::All => {
                let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC");
                sqlx::query_as::<_, Project>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
            OwnerFilter::OwnedBy(owner) => {
                let sql = format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects \
                     WHERE created_by = $1 ORDER BY created_at DESC"
                );
                sqlx::query_as::<_, Project>(&sql)
                    .bind(owner)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(projects)
    }

    async fn update_project(&self, id: Uuid, data: UpdateProject) -> StoreResult<Option<Project>> {
        let sql = format!(
            "UPDATE projects \
             SET name = COALESCE($2, name), \
                 description = COALESCE($3, description), \
                 status = COALESCE($4, status), \
                 due_date = COALESCE($5, due_date), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {PROJECT_COLUMNS}"
        );

        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .bind(data.name)
            .bind(data.description)
            .bind(data.status)
            .bind(data.due_date)
            .fetch_optional(&self.pool)
            .await?;

        Ok(project)
    }

    async fn delete_project(&self, id: Uuid) -> StoreResult<bool> {
        // tasks.project_id is ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        let sql = format!(
            "INSERT INTO tasks (id, project_id, assigned_to, title, description, priority, status, due_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {TASK_COLUMNS}"
        );

        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(Uuid::new_v4())
            .bind(data.project_id)
            .bind(data.assigned_to)
            .bind(data.title)
            .bind(data.description)
            .bind(data.priority)
            .bind(data.status)
            .bind(data.due_date)
            .fetch_one(&self.pool)
            .await?;

        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<TaskWithProject>> {
        let sql = format!("{TASK_WITH_PROJECT_SELECT} WHERE t.id = $1");
        let row = sqlx::query_as::<_, TaskProjectRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(TaskWithProject::from))
    }

    async fn list_tasks(&self, filter: OwnerFilter) -> StoreResult<Vec<TaskWithProject>> {
        let rows = match filter {
            OwnerFilter::All => {
                let sql = format!("{TASK_WITH_PROJECT_SELECT} ORDER BY t.created_at DESC");
                sqlx::query_as::<_, TaskProjectRow>(&sql)
                    .fetch_all(&self.pool)
                    .await?
            }
            OwnerFilter::OwnedBy(owner) => {
                let sql = format!(
                    "{TASK_WITH_PROJECT_SELECT} WHERE p.created_by = $1 ORDER BY t.created_at DESC"
                );
                sqlx::query_as::<_, TaskProjectRow>(&sql)
                    .bind(owner)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.into_iter().map(TaskWithProject::from).collect())
    }

    async fn update_task(&self, id: Uuid, data: UpdateTask) -> StoreResult<Option<Task>> {
        let sql = format!(
            "UPDATE tasks \
             SET title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 priority = COALESCE($4, priority), \
                 status = COALESCE($5, status), \
                 due_date = COALESCE($6, due_date), \
                 assigned_to = COALESCE($7, assigned_to), \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {TASK_COLUMNS}"
        );

        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.priority)
            .bind(data.status)
            .bind(data.due_date)
            .bind(data.assigned_to)
            .fetch_optional(&self.pool)
            .await?;

        Ok(task)
    }

    async fn delete_task(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_tasks(&self, project_id: Uuid) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
