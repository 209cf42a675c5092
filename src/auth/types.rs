// Authentication types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable storage key holding the access token
pub const TOKEN_KEY: &str = "token";

/// Durable storage key holding the JSON-encoded user profile
pub const USER_INFO_KEY: &str = "userInfo";

/// Session-scoped marker set after a successful login
pub const LOGGED_IN_MARKER_KEY: &str = "has_logged_in";

/// Profile of the signed-in teacher as returned by `/api/users/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,

    /// Backend sends `user_type`; stored copies use `role`
    #[serde(alias = "user_type")]
    pub role: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Token and profile pair; exists only while both are stored
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

impl Session {
    pub fn new(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    /// Short token prefix that is safe to print
    pub fn token_preview(&self) -> String {
        token_preview(&self.token)
    }
}

/// First few characters of a token, for logs and status output
pub fn token_preview(token: &str) -> String {
    let head: String = token.chars().take(12).collect();
    if head.len() < token.len() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Result of asking the server whether a token is still good
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Server answered 2xx
    Valid,
    /// Server answered with a non-success status
    Invalid { status: u16 },
    /// Could not confirm either way (timeout, connection failure, abort)
    Indeterminate(String),
}

impl ValidationOutcome {
    /// Only an explicit rejection may end a session
    pub fn requires_logout(&self) -> bool {
        matches!(self, ValidationOutcome::Invalid { .. })
    }
}

/// The only auth state exposed to views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuthSnapshot {
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl AuthSnapshot {
    pub fn settled(is_authenticated: bool) -> Self {
        Self {
            is_authenticated,
            is_loading: false,
        }
    }
}

/// Login form payload
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response; accepts both `{access_token, token_type}` and
/// `{success, token, user}` shapes, plus error bodies
#[derive(Debug, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default, alias = "token")]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl LoginResponse {
    /// Human readable error carried by the body, if any
    pub fn error_text(&self) -> Option<String> {
        match &self.detail {
            Some(serde_json::Value::String(s)) => return Some(s.clone()),
            Some(serde_json::Value::Null) | None => {}
            Some(other) => return Some(other.to_string()),
        }
        self.message.clone()
    }
}
