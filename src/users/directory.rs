use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

use anyhow::Context;

use super::model::User;
use crate::auth::governor::normalize_identifier;
use crate::auth::portal::IdentifierField;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Duplicate {field}: {value}")]
    Duplicate { field: &'static str, value: String },
    #[error("User {0} has neither email nor member_id")]
    MissingIdentifier(uuid::Uuid),
}

/// Read-only account lookup used by the login flow.
pub trait UserDirectory: Send + Sync {
    fn find(&self, field: IdentifierField, identifier: &str) -> Option<User>;
}

#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    by_email: HashMap<String, User>,
    by_member_id: HashMap<String, User>,
}

impl InMemoryUserDirectory {
    pub fn new(users: Vec<User>) -> Result<Self, DirectoryError> {
        let mut directory = Self::default();
        for user in users {
            if user.email.is_none() && user.member_id.is_none() {
                return Err(DirectoryError::MissingIdentifier(user.id));
            }
            let email = user.email.as_deref().map(normalize_identifier);
            let member_id = user.member_id.as_deref().map(normalize_identifier);
            if let Some(email) = email {
                match directory.by_email.entry(email) {
                    Entry::Occupied(taken) => {
                        return Err(DirectoryError::Duplicate {
                            field: "email",
                            value: taken.key().clone(),
                        });
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(user.clone());
                    }
                }
            }
            if let Some(member_id) = member_id {
                match directory.by_member_id.entry(member_id) {
                    Entry::Occupied(taken) => {
                        return Err(DirectoryError::Duplicate {
                            field: "member_id",
                            value: taken.key().clone(),
                        });
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(user);
                    }
                }
            }
        }
        Ok(directory)
    }

    /// Loads a JSON array of users.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading users file {}", path.display()))?;
        let users: Vec<User> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing users file {}", path.display()))?;
        let directory = Self::new(users)?;
        tracing::info!(count = directory.len(), path = %path.display(), "User directory loaded");
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.by_email
            .values()
            .map(|u| u.id)
            .chain(self.by_member_id.values().map(|u| u.id))
            .collect::<std::collections::HashSet<_>>()
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty() && self.by_member_id.is_empty()
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find(&self, field: IdentifierField, identifier: &str) -> Option<User> {
        let key = normalize_identifier(identifier);
        match field {
            IdentifierField::Email => self.by_email.get(&key),
            IdentifierField::MemberId => self.by_member_id.get(&key),
        }
        .cloned()
    }
}
