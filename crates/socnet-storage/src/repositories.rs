// Repository layer for database operations
// Decision: Methods are blocking; each one borrows exactly one pooled connection
// Decision: Writes go to the primary, reads prefer replicas

use std::sync::Arc;

use socnet_pool::{ConnectionPool, NodeConfig, PoolSettings, PooledConnection, Role};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::connector::PgConnector;
use crate::error::Result;
use crate::models::*;
use crate::schema::{SearchIndex, MIGRATOR};

pub type PgConnectionPool = ConnectionPool<PgConnector>;

#[derive(Clone)]
pub struct Database {
    pool: Arc<PgConnectionPool>,
}

impl Database {
    pub fn new(pool: Arc<PgConnectionPool>) -> Self {
        Self { pool }
    }

    /// Open every pooled connection up front
    ///
    /// Blocks; call from `spawn_blocking` or a plain thread.
    pub fn connect(
        connector: PgConnector,
        primaries: Vec<NodeConfig>,
        replicas: Vec<NodeConfig>,
        settings: PoolSettings,
    ) -> Result<Self> {
        let pool = ConnectionPool::new(connector, primaries, replicas, settings)?;
        Ok(Self::new(Arc::new(pool)))
    }

    pub fn pool(&self) -> &PgConnectionPool {
        &self.pool
    }

    /// Borrow a connection and count the request against its node
    fn checkout(&self, role: Role) -> Result<PooledConnection<'_, PgConnector>> {
        let conn = self.pool.get(role)?;
        metrics::counter!("http_requests_to_host_total", "host" => conn.node_tag().to_string())
            .increment(1);
        trace!(
            requested = %role,
            role = %conn.role(),
            node_index = conn.node_index(),
            node = conn.node_tag(),
            "Connection borrowed"
        );
        Ok(conn)
    }

    // ============================================
    // Users
    // ============================================

    pub fn create_user(&self, input: CreateUserRow) -> Result<Uuid> {
        let mut conn = self.checkout(Role::Primary)?;
        let id = self.pool.manager().block_on(
            sqlx::query_scalar::<_, Uuid>(
                r#"
                INSERT INTO users (first_name, second_name, birthdate, biography, city, pwd_hash)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
            .bind(&input.first_name)
            .bind(&input.second_name)
            .bind(input.birthdate)
            .bind(&input.biography)
            .bind(&input.city)
            .bind(&input.pwd_hash)
            .fetch_one(&mut *conn),
        )?;

        Ok(id)
    }

    pub fn get_credentials(&self, id: Uuid) -> Result<Option<CredentialsRow>> {
        let mut conn = self.checkout(Role::Replica)?;
        let row = self.pool.manager().block_on(
            sqlx::query_as::<_, CredentialsRow>(
                r#"
                SELECT id, pwd_hash
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&mut *conn),
        )?;

        Ok(row)
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<UserRow>> {
        let mut conn = self.checkout(Role::Replica)?;
        let row = self.pool.manager().block_on(
            sqlx::query_as::<_, UserRow>(
                r#"
                SELECT id, first_name, second_name, birthdate, biography, city
                FROM users
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&mut *conn),
        )?;

        Ok(row)
    }

    pub fn search_users(&self, search: &UserSearch) -> Result<Vec<UserRow>> {
        let (first_name, second_name) = search.patterns();
        let mut conn = self.checkout(Role::Replica)?;
        let rows = self.pool.manager().block_on(
            sqlx::query_as::<_, UserRow>(
                r#"
                SELECT id, first_name, second_name, birthdate, biography, city
                FROM users
                WHERE first_name LIKE $1 AND second_name LIKE $2
                ORDER BY id
                LIMIT $3
                "#,
            )
            .bind(first_name)
            .bind(second_name)
            .bind(SEARCH_LIMIT)
            .fetch_all(&mut *conn),
        )?;

        Ok(rows)
    }

    // ============================================
    // Schema
    // ============================================

    /// Apply pending migrations on the primary
    pub fn run_migrations(&self) -> Result<()> {
        let mut conn = self.checkout(Role::Primary)?;
        debug!(node = conn.node_tag(), "Running migrations");
        self.pool.manager().block_on(MIGRATOR.run(&mut *conn))?;
        Ok(())
    }

    pub fn create_index(&self, index: SearchIndex) -> Result<()> {
        let mut conn = self.checkout(Role::Primary)?;
        debug!(index = index.index_name(), "Creating index");
        self.pool
            .manager()
            .block_on(sqlx::query(index.create_sql()).execute(&mut *conn))?;
        Ok(())
    }

    pub fn drop_index(&self, index: SearchIndex) -> Result<()> {
        let mut conn = self.checkout(Role::Primary)?;
        debug!(index = index.index_name(), "Dropping index");
        self.pool
            .manager()
            .block_on(sqlx::query(index.drop_sql()).execute(&mut *conn))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Require a running Postgres: `DATABASE_URL=postgresql://... cargo test -- --ignored`

    use super::*;
    use crate::endpoint::PgEndpoint;
    use crate::password::{hash_password, verify_password};
    use chrono::NaiveDate;

    fn with_database<T: Send + 'static>(f: impl FnOnce(Database) -> T + Send + 'static) -> T {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let connector = PgConnector::new(runtime.handle().clone());
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let handle = std::thread::spawn(move || {
            let endpoint = PgEndpoint::parse(&url).unwrap();
            let node = endpoint.node("postgres", "").unwrap();
            let db = Database::connect(
                connector,
                vec![node],
                Vec::new(),
                PoolSettings::new().with_pool_size(2),
            )
            .unwrap();
            db.run_migrations().unwrap();
            f(db)
        });
        handle.join().unwrap()
    }

    fn new_user(first_name: &str, second_name: &str) -> CreateUserRow {
        CreateUserRow {
            first_name: first_name.to_string(),
            second_name: second_name.to_string(),
            birthdate: NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
            biography: "Hiking, chess".to_string(),
            city: "Kazan".to_string(),
            pwd_hash: hash_password("password123").unwrap(),
        }
    }

    #[test]
    #[ignore]
    fn test_register_then_read_back() {
        with_database(|db| {
            let id = db.create_user(new_user("Roundtrip", "Checkov")).unwrap();

            let user = db.get_user(id).unwrap().unwrap();
            assert_eq!(user.first_name, "Roundtrip");
            assert_eq!(user.city.as_deref(), Some("Kazan"));

            let credentials = db.get_credentials(id).unwrap().unwrap();
            assert!(verify_password("password123", &credentials.pwd_hash).unwrap());

            assert!(db.get_user(Uuid::now_v7()).unwrap().is_none());
            assert_eq!(db.pool().idle_count(Role::Primary, 0), Some(2));
        });
    }

    #[test]
    #[ignore]
    fn test_search_and_index_management() {
        with_database(|db| {
            db.create_index(SearchIndex::NamesSearch).unwrap();
            db.create_user(new_user("Searchable", "Prefixova")).unwrap();

            let rows = db
                .search_users(&UserSearch::new("Search", "Prefix"))
                .unwrap();
            assert!(!rows.is_empty());
            assert!(rows.windows(2).all(|w| w[0].id < w[1].id));

            db.drop_index(SearchIndex::NamesSearch).unwrap();
            db.drop_index(SearchIndex::NamesSearch).unwrap();
        });
    }
}
