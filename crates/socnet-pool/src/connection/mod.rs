//! Multi-node connection pool
//!
//! Physical connections are opened once at startup, `pool_size` per node, and
//! then only move between a node's idle queue and the task borrowing them.
//!
//! ```text
//!            borrow(Replica)                      borrow(Primary)
//!                  │                                    │
//!   cursor = (cursor + 1) % replicas          cursor = (cursor + 1) % primaries
//!                  ▼                                    ▼
//!   replica[0] [c c c]  replica[1] [c c .]       primary[0] [c . .]
//!                  │
//!                  └── no replicas configured ──► primary
//! ```
//!
//! A borrow never waits: an empty idle queue on the selected node is
//! [`PoolError::Exhausted`], even when another node still has room.

mod guard;
mod pool;

pub use guard::PooledConnection;
pub use pool::{Borrowed, ConnectionPool};

use serde::{Deserialize, Serialize};

/// Logical category of a database node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Accepts writes
    Primary,

    /// Serves read-only traffic
    Replica,
}

impl Role {
    pub(crate) fn index(self) -> usize {
        match self {
            Role::Primary => 0,
            Role::Replica => 1,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Replica => write!(f, "replica"),
        }
    }
}

/// One configured database endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Connection string handed to [`ManageConnection::connect`]
    pub dial: String,

    /// Short label (`host:port`) used in logs, errors and metrics
    pub tag: String,
}

impl NodeConfig {
    pub fn new(dial: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            dial: dial.into(),
            tag: tag.into(),
        }
    }
}

/// Connection pool settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolSettings {
    /// Connections opened per node
    pub pool_size: usize,

    /// Check liveness on every borrow and re-create dead connections
    pub validate_on_borrow: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            pool_size: 1,
            validate_on_borrow: false,
        }
    }
}

impl PoolSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of connections per node
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    /// Enable or disable borrow-time validation
    pub fn with_validate_on_borrow(mut self, enabled: bool) -> Self {
        self.validate_on_borrow = enabled;
        self
    }
}

/// Opens and checks physical connections for a [`ConnectionPool`]
pub trait ManageConnection: Send + Sync {
    type Connection: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new connection to `node`
    fn connect(&self, node: &NodeConfig) -> Result<Self::Connection, Self::Error>;

    /// Cheap liveness check, only consulted when
    /// [`PoolSettings::validate_on_borrow`] is set
    fn is_valid(&self, conn: &mut Self::Connection) -> bool;
}

/// Connection pool errors
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The selected node has no idle connection left
    #[error("no idle connection on {role} node {node}")]
    Exhausted { role: Role, node: String },

    /// No node is configured for the role
    #[error("no {role} nodes configured")]
    NoNodes { role: Role },

    /// Opening a connection failed
    #[error("failed to connect to {node}: {source}")]
    Connect {
        node: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl PoolError {
    /// Transient overload a client may retry later
    pub fn is_exhausted(&self) -> bool {
        matches!(self, PoolError::Exhausted { .. })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Primary.to_string(), "primary");
        assert_eq!(Role::Replica.to_string(), "replica");
    }

    #[test]
    fn test_settings_builder() {
        let settings = PoolSettings::new()
            .with_pool_size(0)
            .with_validate_on_borrow(true);
        assert_eq!(settings.pool_size, 1);
        assert!(settings.validate_on_borrow);
        assert!(!PoolSettings::default().validate_on_borrow);
    }

    #[test]
    fn test_error_messages() {
        let err = PoolError::Exhausted {
            role: Role::Replica,
            node: "db1:5432".into(),
        };
        assert_eq!(err.to_string(), "no idle connection on replica node db1:5432");
        assert!(err.is_exhausted());

        let err = PoolError::NoNodes {
            role: Role::Primary,
        };
        assert_eq!(err.to_string(), "no primary nodes configured");
        assert!(!err.is_exhausted());
    }
}
