use login_governor_api::{UserResponse, UserType};
use serde::Deserialize;
use uuid::Uuid;

/// Account as stored in the users file.
#[derive(Deserialize, Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub member_id: Option<String>,
    pub user_type: UserType,
    pub password_hash: String,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            member_id: user.member_id,
            user_type: user.user_type,
        }
    }
}
