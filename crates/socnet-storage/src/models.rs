// Database models (internal, may differ from public DTOs)

use chrono::NaiveDate;
use sqlx::FromRow;
use uuid::Uuid;

/// Maximum rows returned by a user search
pub const SEARCH_LIMIT: i64 = 100;

/// Public profile columns of `users`
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub first_name: String,
    pub second_name: String,
    pub birthdate: Option<NaiveDate>,
    pub biography: Option<String>,
    pub city: Option<String>,
}

/// Login lookup
#[derive(Debug, Clone, FromRow)]
pub struct CredentialsRow {
    pub id: Uuid,
    pub pwd_hash: String,
}

#[derive(Debug, Clone)]
pub struct CreateUserRow {
    pub first_name: String,
    pub second_name: String,
    pub birthdate: NaiveDate,
    pub biography: String,
    pub city: String,
    pub pwd_hash: String,
}

/// Prefix search on both name columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSearch {
    pub first_name: String,
    pub second_name: String,
}

impl UserSearch {
    pub fn new(first_name: impl Into<String>, second_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            second_name: second_name.into(),
        }
    }

    /// `LIKE` patterns matching the prefixes literally
    pub fn patterns(&self) -> (String, String) {
        (like_prefix(&self.first_name), like_prefix(&self.second_name))
    }

    pub fn matches(&self, user: &UserRow) -> bool {
        user.first_name.starts_with(&self.first_name)
            && user.second_name.starts_with(&self.second_name)
    }
}

// Escapes LIKE wildcards (backslash is the Postgres default escape)
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
