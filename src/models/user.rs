use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// A staff member as stored in the `staff` document index.
///
/// Owned by the identity layer; the engines only read it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub role: Role,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Directory search criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSearch {
    /// One or two words matched as prefixes of first/last name.
    #[serde(default)]
    pub name: String,
    /// Exact (case-insensitive) position filter; empty means any.
    #[serde(default)]
    pub position: String,
}

impl UserSearch {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: String::new(),
        }
    }

    /// Whether `user` satisfies the criteria.
    ///
    /// Every word of the name query must be a prefix of the first or last name.
    pub fn matches(&self, user: &User) -> bool {
        let position = self.position.trim();
        if !position.is_empty() && !user.position.eq_ignore_ascii_case(position) {
            return false;
        }

        let first = user.first_name.to_lowercase();
        let last = user.last_name.to_lowercase();
        self.name
            .split_whitespace()
            .map(str::to_lowercase)
            .all(|word| first.starts_with(&word) || last.starts_with(&word))
    }
}
