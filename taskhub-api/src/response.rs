/// Success envelope shared by every endpoint
///
/// ```json
/// { "success": true, "message": "...", "data": { ... } }
/// ```
///
/// Account endpoints that hand back a single user (registration, login and
/// the admin endpoints) put it under `user` instead of `data`, optionally
/// alongside a `token`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use taskhub_shared::models::User;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl<T> ApiResponse<T> {
    fn empty() -> Self {
        Self {
            success: true,
            message: None,
            data: None,
            user: None,
            token: None,
        }
    }

    /// `{ success, data }`
    pub fn data(data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::empty()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// `{ success, message }`
    pub fn message(message: impl Into<String>) -> Self {
        Self::empty().with_message(message)
    }

    /// `{ success, message, user }`
    pub fn user(message: impl Into<String>, user: User) -> Self {
        Self {
            user: Some(user),
            ..Self::message(message)
        }
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// `201 Created` with an envelope body
pub fn created<T: Serialize>(body: ApiResponse<T>) -> (StatusCode, ApiResponse<T>) {
    (StatusCode::CREATED, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_only() {
        let json = serde_json::to_value(ApiResponse::message("Task deleted successfully")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": true, "message": "Task deleted successfully" })
        );
    }

    #[test]
    fn test_data_envelope() {
        let json = serde_json::to_value(ApiResponse::data(vec![1, 2, 3])).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], serde_json::json!([1, 2, 3]));
        assert!(json.get("message").is_none());
        assert!(json.get("user").is_none());
    }
}
