// Postgres storage layer with sqlx
// Decision: Queries run on worker-pool threads, each borrowing one pooled connection
// Decision: Support both PostgreSQL (production) and in-memory (dev mode)
//
// - Database: user queries over the primary/replica ConnectionPool
// - InMemoryDatabase: HashMap-backed store with the same API
// - StorageBackend: enum dispatch between the two

pub mod backend;
pub mod connector;
pub mod endpoint;
pub mod error;
pub mod memory;
pub mod models;
pub mod password;
pub mod repositories;
pub mod schema;

pub use backend::StorageBackend;
pub use connector::PgConnector;
pub use endpoint::PgEndpoint;
pub use error::{Result, StorageError};
pub use memory::InMemoryDatabase;
pub use models::*;
pub use repositories::Database;
pub use schema::SearchIndex;
