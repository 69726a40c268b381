// Storage errors
// Decision: Keep pool errors intact so the API can tell overload (503) from failures (500)

use socnet_pool::PoolError;

pub type Result<T, E = StorageError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No connection could be borrowed (exhausted, no nodes, reconnect failed)
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("password hashing failed: {0}")]
    Password(String),

    #[error("invalid endpoint '{endpoint}': {reason}")]
    Endpoint { endpoint: String, reason: String },

    #[error("unknown index '{0}'")]
    UnknownIndex(String),

    /// Blocking database access needs a tokio runtime to drive sqlx
    #[error("no tokio runtime available: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

impl StorageError {
    /// Overload or unavailable database, as opposed to a failed query
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Pool(_))
    }
}
