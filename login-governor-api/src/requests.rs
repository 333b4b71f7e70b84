use serde::{Deserialize, Serialize};

// -------- REQUEST DTOs --------

/// Body of `POST /auth/{portal}/login`.
///
/// Email portals post `email`, the member portal posts `member_id`.
/// Which one is required is decided by the portal, not here.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LoginRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    pub password: String, // Plain text
}
