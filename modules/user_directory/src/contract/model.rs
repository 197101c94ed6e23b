use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Backend-assigned user identifier. Never minted on the client side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A user record as stored by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub user_name: String,
    pub email: String,
}

/// User data without an identifier.
///
/// Sent as the body of a create (the backend assigns the id) and of an
/// update, where every field replaces the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFields {
    pub user_name: String,
    pub email: String,
}

impl UserFields {
    pub fn new(user_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            email: email.into(),
        }
    }
}

impl User {
    /// The record's fields without its id.
    pub fn fields(&self) -> UserFields {
        UserFields {
            user_name: self.user_name.clone(),
            email: self.email.clone(),
        }
    }
}
