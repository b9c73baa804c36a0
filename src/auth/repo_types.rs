use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::store::{lenient, timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Student,
    /// A role this service does not know, kept as stored. Grants nothing
    /// beyond an anonymous caller's reads and the user's own card.
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
            Role::Other(raw) => raw,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin" => Some(Role::Admin),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        Role::parse(&raw).unwrap_or(Role::Other(raw))
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User record as persisted in `users.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub username: String,
    #[serde(rename = "password", default, deserialize_with = "lenient::text")]
    pub password_hash: String, // unsalted SHA-256 hex unless PASSWORD_SCHEME=argon2
    #[serde(default = "unknown_role", deserialize_with = "role_or_unknown")]
    pub role: Role,
    #[serde(default, deserialize_with = "lenient::optional_text")]
    pub email: Option<String>,
    #[serde(
        default = "timestamp::epoch",
        serialize_with = "timestamp::serialize",
        deserialize_with = "timestamp::deserialize_or_epoch"
    )]
    pub created_at: OffsetDateTime,
}

fn unknown_role() -> Role {
    Role::Other(String::new())
}

fn role_or_unknown<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Role, D::Error> {
    lenient::text(deserializer).map(Role::from)
}
