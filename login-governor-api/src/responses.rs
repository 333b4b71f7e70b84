use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::UserType;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    pub user_type: UserType,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserResponse,
    pub expires_in: i64,
}

/// Lockout state attached to every failed login response.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LockoutInfo {
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts_remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<i64>,
}

impl LockoutInfo {
    pub fn open(attempts_remaining: Option<u32>) -> Self {
        Self {
            locked: false,
            attempts_remaining,
            locked_until: None,
            retry_after_seconds: None,
        }
    }

    pub fn locked(locked_until: DateTime<Utc>, retry_after_seconds: i64) -> Self {
        Self {
            locked: true,
            attempts_remaining: None,
            locked_until: Some(locked_until),
            retry_after_seconds: Some(retry_after_seconds),
        }
    }
}
