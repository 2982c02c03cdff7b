/// End-to-end tests for the TaskHub HTTP API
///
/// Requests go through the full router (auth middleware, extractors, error
/// mapping) against a fresh in-memory store per test.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::TestContext;
use serde_json::json;
use taskhub_shared::models::{Role, UserStatus};
use uuid::Uuid;

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();

    let (status, body) = ctx.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new();

    for uri in ["/api/projects", "/api/tasks", "/api/users/me", "/api/users"] {
        let (status, body) = ctx.send("GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["success"], false);
    }

    let (status, _) = ctx
        .send("GET", "/api/projects", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_inactive_account_is_forbidden() {
    let ctx = TestContext::new();
    let idle = ctx
        .seed_user_with_status("idle@example.com", Role::User, UserStatus::Inactive)
        .await;

    let (status, body) = ctx.get("/api/users/me", &idle).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Account is inactive");
}

#[tokio::test]
async fn test_register_and_login() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Ann",
                "email": "ann@example.com",
                "password": "correct horse"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["token"].is_string());

    let (status, body) = ctx
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ann@example.com", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Login successful");

    // The issued token works against protected routes
    let token = body["token"].as_str().unwrap().to_string();
    let (status, me) = ctx.send("GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["data"]["email"], "ann@example.com");

    let (status, body) = ctx
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "email": "ann@example.com", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_register_validation() {
    let ctx = TestContext::new();
    ctx.seed_user("taken@example.com", Role::User).await;

    let (status, body) = ctx
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ann", "email": "ann@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "name, email, and password are required");

    let (status, _) = ctx
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ann", "email": "not-an-email", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = ctx
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ann", "email": "taken@example.com", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "User already exists with this email");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = TestContext::new();
    let ann = ctx.seed_user("ann@example.com", Role::User).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/projects")
        .header("authorization", format!("Bearer {}", ann.token))
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();

    let (status, body) = ctx.send_request(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = ctx
        .post("/api/projects", &ann, json!({ "name": "X", "status": "archived" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx.get("/api/projects/not-a-uuid", &ann).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_project_ownership() {
    let ctx = TestContext::new();
    let ann = ctx.seed_user("ann@example.com", Role::User).await;
    let bob = ctx.seed_user("bob@example.com", Role::User).await;
    let admin = ctx.seed_user("root@example.com", Role::Admin).await;

    let project_id = ctx.create_project(&ann, "Apollo").await;
    ctx.create_project(&bob, "Gemini").await;

    let (status, body) = ctx.get("/api/projects", &ann).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Apollo"]);

    let (_, body) = ctx.get("/api/projects", &admin).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // Someone else's project is forbidden, a missing one is not found
    let uri = format!("/api/projects/{}", project_id);
    let (status, body) = ctx.get(&uri, &bob).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied");

    let (status, _) = ctx.patch(&uri, &bob, json!({ "name": "Hijacked" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx.delete(&uri, &bob).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .get(&format!("/api/projects/{}", Uuid::new_v4()), &bob)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Project not found");

    // Admins bypass ownership
    let (status, body) = ctx.get(&uri, &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["createdBy"], ann.id().to_string());
}

#[tokio::test]
async fn test_project_partial_update() {
    let ctx = TestContext::new();
    let ann = ctx.seed_user("ann@example.com", Role::User).await;

    let (_, body) = ctx
        .post(
            "/api/projects",
            &ann,
            json!({ "name": "Apollo", "description": "Moon" }),
        )
        .await;
    let uri = format!("/api/projects/{}", body["data"]["id"].as_str().unwrap());

    let (status, body) = ctx.patch(&uri, &ann, json!({ "status": "on_hold" })).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "on_hold");
    assert_eq!(body["data"]["name"], "Apollo");
    assert_eq!(body["data"]["description"], "Moon");

    let (status, body) = ctx.patch(&uri, &ann, json!({ "name": "  " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Project name cannot be empty");

    let (status, body) = ctx.post("/api/projects", &ann, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Project name is required");
}

#[tokio::test]
async fn test_deleting_project_removes_its_tasks() {
    let ctx = TestContext::new();
    let ann = ctx.seed_user("ann@example.com", Role::User).await;

    let project_id = ctx.create_project(&ann, "Apollo").await;
    let task_id = ctx.create_task(&ann, &project_id, "Launch").await;

    let (status, body) = ctx
        .delete(&format!("/api/projects/{}", project_id), &ann)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Project deleted successfully");

    let (status, _) = ctx.get(&format!("/api/tasks/{}", task_id), &ann).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = ctx.get("/api/tasks", &ann).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_task_access_follows_project_owner() {
    let ctx = TestContext::new();
    let ann = ctx.seed_user("ann@example.com", Role::User).await;
    let bob = ctx.seed_user("bob@example.com", Role::User).await;
    let admin = ctx.seed_user("root@example.com", Role::Admin).await;

    let project_id = ctx.create_project(&ann, "Apollo").await;

    // Bob cannot add tasks to Ann's project, even assigned to himself
    let (status, _) = ctx
        .post(
            "/api/tasks",
            &bob,
            json!({ "projectId": project_id, "title": "Sneak", "assignedTo": bob.id() }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .post(
            "/api/tasks",
            &ann,
            json!({
                "projectId": project_id,
                "title": "Launch",
                "priority": "high",
                "assignedTo": bob.id()
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["project"]["name"], "Apollo");
    let uri = format!("/api/tasks/{}", body["data"]["id"].as_str().unwrap());

    // Being the assignee grants nothing
    let (status, _) = ctx.get(&uri, &bob).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = ctx.get("/api/tasks", &bob).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = ctx.patch(&uri, &ann, json!({ "status": "in_progress" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "in_progress");
    assert_eq!(body["data"]["title"], "Launch");
    assert_eq!(body["data"]["priority"], "high");

    let (status, _) = ctx.get(&uri, &admin).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = ctx.delete(&uri, &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task deleted successfully");
}

#[tokio::test]
async fn test_task_creation_errors() {
    let ctx = TestContext::new();
    let ann = ctx.seed_user("ann@example.com", Role::User).await;
    let project_id = ctx.create_project(&ann, "Apollo").await;

    let (status, body) = ctx.post("/api/tasks", &ann, json!({ "title": "Orphan" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Project ID and title are required");

    let (status, body) = ctx
        .post(
            "/api/tasks",
            &ann,
            json!({ "projectId": Uuid::new_v4(), "title": "Lost" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Project not found");

    let (status, _) = ctx
        .post(
            "/api/tasks",
            &ann,
            json!({ "projectId": project_id, "title": "Ghost", "assignedTo": Uuid::new_v4() }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deleting_user_orphans_projects_and_unassigns_tasks() {
    let ctx = TestContext::new();
    let ann = ctx.seed_user("ann@example.com", Role::User).await;
    let bob = ctx.seed_user("bob@example.com", Role::User).await;
    let admin = ctx.seed_user("root@example.com", Role::Admin).await;

    let ann_project = ctx.create_project(&ann, "Apollo").await;
    let (_, body) = ctx
        .post(
            "/api/tasks",
            &ann,
            json!({ "projectId": ann_project, "title": "Launch", "assignedTo": bob.id() }),
        )
        .await;
    let task_uri = format!("/api/tasks/{}", body["data"]["id"].as_str().unwrap());
    let bob_project = ctx.create_project(&bob, "Gemini").await;

    let (status, body) = ctx
        .delete(&format!("/api/users/{}", bob.id()), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully");

    // Bob's token no longer resolves to anyone
    let (status, _) = ctx.get("/api/users/me", &bob).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, body) = ctx.get(&task_uri, &ann).await;
    assert!(body["data"]["assignedTo"].is_null());

    // The orphaned project survives but only admins can reach it
    let uri = format!("/api/projects/{}", bob_project);
    let (status, body) = ctx.get(&uri, &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["createdBy"].is_null());

    let (status, _) = ctx.get(&uri, &ann).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_self_service_account() {
    let ctx = TestContext::new();
    let ann = ctx.seed_user("ann@example.com", Role::User).await;
    ctx.seed_user("bob@example.com", Role::User).await;

    let (status, body) = ctx.get("/api/users/me", &ann).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], ann.id().to_string());
    assert!(body["data"].get("passwordHash").is_none());

    let (status, body) = ctx
        .patch("/api/users/me", &ann, json!({ "username": "annie" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["message"], "Your account has been updated successfully");
    assert_eq!(body["data"]["username"], "annie");
    assert_eq!(body["data"]["email"], "ann@example.com");

    let (status, body) = ctx
        .patch("/api/users/me", &ann, json!({ "username": "a".repeat(101) }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "username");

    let (status, body) = ctx
        .patch("/api/users/me", &ann, json!({ "role": "admin" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You cannot change your own role or status");

    let (status, body) = ctx
        .patch("/api/users/me", &ann, json!({ "email": "bob@example.com" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email already in use");

    let (status, body) = ctx.delete("/api/users/me", &ann).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Your account has been deleted successfully");

    let (status, _) = ctx.get("/api/users/me", &ann).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_administration_requires_admin() {
    let ctx = TestContext::new();
    let ann = ctx.seed_user("ann@example.com", Role::User).await;
    let bob = ctx.seed_user("bob@example.com", Role::User).await;

    let (status, _) = ctx.get("/api/users", &ann).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let uri = format!("/api/users/{}", bob.id());
    let (status, _) = ctx.get(&uri, &ann).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = ctx.patch(&uri, &ann, json!({ "name": "Robert" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = ctx.delete(&uri, &ann).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .post(
            "/api/admin/create-user",
            &ann,
            json!({ "name": "Eve", "email": "eve@example.com", "password": "pw", "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_user_management() {
    let ctx = TestContext::new();
    let admin = ctx.seed_user("root@example.com", Role::Admin).await;
    let ann = ctx.seed_user("ann@example.com", Role::User).await;

    let (status, body) = ctx.get("/api/users", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = ctx
        .post(
            "/api/admin/create-user",
            &admin,
            json!({ "name": "Eve", "email": "eve@example.com", "password": "pw", "role": "superuser" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid role specified");

    let (status, body) = ctx
        .post(
            "/api/admin/create-user",
            &admin,
            json!({ "name": "Eve", "email": "eve@example.com", "password": "pw", "role": "admin" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["message"], "User created successfully by admin");
    assert_eq!(body["user"]["role"], "admin");

    // Promotion takes effect on the next request with the old token
    let uri = format!("/api/users/{}", ann.id());
    let (status, body) = ctx.patch(&uri, &admin, json!({ "role": "admin" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User updated successfully");
    let (status, _) = ctx.get("/api/users", &ann).await;
    assert_eq!(status, StatusCode::OK);

    // Duplicate email: 409 here, 400 on the admin endpoint
    let (status, _) = ctx
        .patch(&uri, &admin, json!({ "email": "eve@example.com" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let admin_uri = format!("/api/admin/users/{}", ann.id());
    let (status, body) = ctx
        .patch(&admin_uri, &admin, json!({ "email": "eve@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already in use");

    let (status, body) = ctx
        .patch(&admin_uri, &admin, json!({ "status": "inactive" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User updated successfully by admin");
    assert_eq!(body["user"]["status"], "inactive");

    let (status, _) = ctx.get("/api/users/me", &ann).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = ctx
        .get(&format!("/api/users/{}", Uuid::new_v4()), &admin)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}
