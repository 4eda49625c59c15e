use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Backer,
    Creator,
    Admin,
}

/// A platform user as seen by the campaign core: identity and role only.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl User {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Identity of a backer as reported back to callers.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct BackerSummary {
    pub id: UserId,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl BackerSummary {
    /// Summary for a backer the user directory no longer knows about.
    pub fn unknown(id: UserId) -> Self {
        Self {
            id,
            name: None,
            email: None,
        }
    }
}

impl From<&User> for BackerSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: Some(user.name.clone()),
            email: Some(user.email.clone()),
        }
    }
}
