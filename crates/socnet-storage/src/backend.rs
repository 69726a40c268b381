// Storage backend abstraction
// Decision: Use enum dispatch for simplicity over trait objects
//
// Every method blocks and must run on a worker thread.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::Result;
use crate::memory::InMemoryDatabase;
use crate::models::*;
use crate::repositories::Database;
use crate::schema::SearchIndex;

/// Storage backend that can be either PostgreSQL or in-memory
#[derive(Clone)]
pub enum StorageBackend {
    /// PostgreSQL through the primary/replica connection pool
    Postgres(Database),
    /// In-memory database (dev mode)
    InMemory(Arc<InMemoryDatabase>),
}

impl StorageBackend {
    pub fn in_memory() -> Self {
        Self::InMemory(Arc::new(InMemoryDatabase::new()))
    }

    pub fn is_dev_mode(&self) -> bool {
        matches!(self, Self::InMemory(_))
    }

    /// The Postgres database, if any
    pub fn database(&self) -> Option<&Database> {
        match self {
            Self::Postgres(db) => Some(db),
            Self::InMemory(_) => None,
        }
    }

    pub fn create_user(&self, input: CreateUserRow) -> Result<Uuid> {
        match self {
            Self::Postgres(db) => db.create_user(input),
            Self::InMemory(db) => db.create_user(input),
        }
    }

    pub fn get_credentials(&self, id: Uuid) -> Result<Option<CredentialsRow>> {
        match self {
            Self::Postgres(db) => db.get_credentials(id),
            Self::InMemory(db) => db.get_credentials(id),
        }
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<UserRow>> {
        match self {
            Self::Postgres(db) => db.get_user(id),
            Self::InMemory(db) => db.get_user(id),
        }
    }

    pub fn search_users(&self, search: &UserSearch) -> Result<Vec<UserRow>> {
        match self {
            Self::Postgres(db) => db.search_users(search),
            Self::InMemory(db) => db.search_users(search),
        }
    }

    pub fn create_index(&self, index: SearchIndex) -> Result<()> {
        match self {
            Self::Postgres(db) => db.create_index(index),
            Self::InMemory(db) => db.create_index(index),
        }
    }

    pub fn drop_index(&self, index: SearchIndex) -> Result<()> {
        match self {
            Self::Postgres(db) => db.drop_index(index),
            Self::InMemory(db) => db.drop_index(index),
        }
    }

    /// Apply migrations; nothing to do in dev mode
    pub fn run_migrations(&self) -> Result<()> {
        match self {
            Self::Postgres(db) => db.run_migrations(),
            Self::InMemory(_) => Ok(()),
        }
    }
}

impl std::fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres(db) => f.debug_tuple("Postgres").field(db.pool()).finish(),
            Self::InMemory(_) => f.write_str("InMemory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_in_memory_dispatch() {
        let backend = StorageBackend::in_memory();
        assert!(backend.is_dev_mode());
        assert!(backend.database().is_none());

        let id = backend
            .create_user(CreateUserRow {
                first_name: "Olga".into(),
                second_name: "Sidorova".into(),
                birthdate: NaiveDate::from_ymd_opt(1985, 1, 1).unwrap(),
                biography: "Painting".into(),
                city: "Perm".into(),
                pwd_hash: "hash".into(),
            })
            .unwrap();

        assert!(backend.get_user(id).unwrap().is_some());
        assert_eq!(
            backend
                .search_users(&UserSearch::new("Ol", "Sid"))
                .unwrap()
                .len(),
            1
        );
        backend.run_migrations().unwrap();
        backend.create_index(SearchIndex::NamesSearch).unwrap();
    }
}
