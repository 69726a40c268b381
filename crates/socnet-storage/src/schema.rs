// Schema bootstrap and optional indexes
// Decision: The users table ships as a sqlx migration embedded at compile time
// Decision: Search indexes are operator-managed (CLI), not part of migrations

use std::str::FromStr;

use sqlx::migrate::Migrator;

use crate::error::StorageError;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Indexes that can be added or dropped from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchIndex {
    /// B-tree over both name columns with `text_pattern_ops`, so that
    /// `LIKE 'prefix%'` can use it
    NamesSearch,
}

impl SearchIndex {
    pub const ALL: [SearchIndex; 1] = [SearchIndex::NamesSearch];

    /// Name accepted on the command line
    pub fn name(self) -> &'static str {
        match self {
            SearchIndex::NamesSearch => "names_search",
        }
    }

    /// Name of the index in the database
    pub fn index_name(self) -> &'static str {
        match self {
            SearchIndex::NamesSearch => "users_names_btree_idx",
        }
    }

    pub fn create_sql(self) -> &'static str {
        match self {
            SearchIndex::NamesSearch => {
                "CREATE INDEX IF NOT EXISTS users_names_btree_idx \
                 ON users (first_name text_pattern_ops, second_name text_pattern_ops)"
            }
        }
    }

    pub fn drop_sql(self) -> &'static str {
        match self {
            SearchIndex::NamesSearch => "DROP INDEX IF EXISTS users_names_btree_idx",
        }
    }
}

impl FromStr for SearchIndex {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|index| index.name() == s.trim())
            .ok_or_else(|| StorageError::UnknownIndex(s.to_string()))
    }
}

impl std::fmt::Display for SearchIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
