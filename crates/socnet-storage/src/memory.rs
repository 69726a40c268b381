// In-memory storage implementation for dev mode
// Decision: Use parking_lot for thread-safe access
// Decision: UUIDs generated via uuid v7 (time-ordered)
//
// Same blocking API as Database, backed by a HashMap, so the service can run
// without Postgres. Data is lost on restart.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::schema::SearchIndex;

struct StoredUser {
    row: UserRow,
    pwd_hash: String,
}

#[derive(Default)]
pub struct InMemoryDatabase {
    users: RwLock<HashMap<Uuid, StoredUser>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_user(&self, input: CreateUserRow) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let row = UserRow {
            id,
            first_name: input.first_name,
            second_name: input.second_name,
            birthdate: Some(input.birthdate),
            biography: Some(input.biography),
            city: Some(input.city),
        };
        self.users.write().insert(
            id,
            StoredUser {
                row,
                pwd_hash: input.pwd_hash,
            },
        );
        Ok(id)
    }

    pub fn get_credentials(&self, id: Uuid) -> Result<Option<CredentialsRow>> {
        Ok(self.users.read().get(&id).map(|user| CredentialsRow {
            id,
            pwd_hash: user.pwd_hash.clone(),
        }))
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<UserRow>> {
        Ok(self.users.read().get(&id).map(|user| user.row.clone()))
    }

    pub fn search_users(&self, search: &UserSearch) -> Result<Vec<UserRow>> {
        let mut rows: Vec<UserRow> = self
            .users
            .read()
            .values()
            .filter(|user| search.matches(&user.row))
            .map(|user| user.row.clone())
            .collect();
        rows.sort_by_key(|row| row.id);
        rows.truncate(SEARCH_LIMIT as usize);
        Ok(rows)
    }

    pub fn create_index(&self, index: SearchIndex) -> Result<()> {
        tracing::debug!(index = index.index_name(), "Index ignored in dev mode");
        Ok(())
    }

    pub fn drop_index(&self, index: SearchIndex) -> Result<()> {
        tracing::debug!(index = index.index_name(), "Index ignored in dev mode");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn new_user(first_name: &str, second_name: &str) -> CreateUserRow {
        CreateUserRow {
            first_name: first_name.to_string(),
            second_name: second_name.to_string(),
            birthdate: NaiveDate::from_ymd_opt(2001, 2, 3).unwrap(),
            biography: String::new(),
            city: "Omsk".to_string(),
            pwd_hash: "$argon2id$fake".to_string(),
        }
    }

    #[test]
    fn test_create_and_get() {
        let db = InMemoryDatabase::new();
        let id = db.create_user(new_user("Ivan", "Ivanov")).unwrap();

        let user = db.get_user(id).unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.birthdate, NaiveDate::from_ymd_opt(2001, 2, 3));

        let credentials = db.get_credentials(id).unwrap().unwrap();
        assert_eq!(credentials.pwd_hash, "$argon2id$fake");

        assert!(db.get_user(Uuid::now_v7()).unwrap().is_none());
    }

    #[test]
    fn test_search_orders_by_id_and_limits() {
        let db = InMemoryDatabase::new();
        for _ in 0..120 {
            db.create_user(new_user("Petr", "Petrov")).unwrap();
        }
        db.create_user(new_user("Anna", "Petrova")).unwrap();

        let rows = db.search_users(&UserSearch::new("Pe", "Pet")).unwrap();
        assert_eq!(rows.len(), SEARCH_LIMIT as usize);
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
        assert!(rows.iter().all(|row| row.first_name == "Petr"));

        let rows = db.search_users(&UserSearch::new("An", "")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(db.len(), 121);
    }
}
