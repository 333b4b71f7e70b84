use std::fmt;

use login_governor_api::UserType;
use serde::Deserialize;

/// Login entry point. Each portal admits a fixed set of user types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Portal {
    Customer,
    Admin,
    Member,
    Logistic,
}

/// Which form field carries the identifier on a portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierField {
    Email,
    MemberId,
}

impl IdentifierField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::MemberId => "member_id",
        }
    }
}

impl Portal {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Logistic => "logistic",
        }
    }

    /// User type that partitions this portal's lockout state.
    pub fn user_type(self) -> UserType {
        match self {
            Self::Customer => UserType::Customer,
            Self::Admin => UserType::Admin,
            Self::Member => UserType::Member,
            Self::Logistic => UserType::Logistic,
        }
    }

    pub fn identifier_field(self) -> IdentifierField {
        match self {
            Self::Member => IdentifierField::MemberId,
            Self::Customer | Self::Admin | Self::Logistic => IdentifierField::Email,
        }
    }

    pub fn admits(self, user_type: UserType) -> bool {
        match self {
            Self::Admin => matches!(user_type, UserType::Admin | UserType::Staff),
            other => other.user_type() == user_type,
        }
    }
}

impl fmt::Display for Portal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{user_type} accounts cannot sign in through the {portal} portal")]
pub struct WrongPortal {
    pub portal: Portal,
    pub user_type: UserType,
}

/// Separate from rate limiting: it only answers whether an account
/// belongs on the portal it used.
pub struct PortalGuard;

impl PortalGuard {
    pub fn check(portal: Portal, user_type: UserType) -> Result<(), WrongPortal> {
        if portal.admits(user_type) {
            Ok(())
        } else {
            Err(WrongPortal { portal, user_type })
        }
    }
}
