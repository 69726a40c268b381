// sqlx connection manager for the pool
// Decision: Pool connections are plain PgConnections owned by the pool, not a sqlx PgPool
// Decision: Blocking calls go through the service runtime handle; callers must be on
//           worker threads or inside spawn_blocking, never on a runtime thread

use std::future::Future;
use std::time::Duration;

use socnet_pool::{ManageConnection, NodeConfig};
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection};
use tokio::runtime::Handle;
use url::Url;

use crate::error::Result;

/// Opens Postgres connections for [`socnet_pool::ConnectionPool`]
#[derive(Debug, Clone)]
pub struct PgConnector {
    runtime: Handle,
}

impl PgConnector {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Connector bound to the runtime of the calling context
    pub fn current() -> Result<Self> {
        Ok(Self::new(Handle::try_current()?))
    }

    /// Drive a sqlx future to completion from a blocking thread
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl ManageConnection for PgConnector {
    type Connection = PgConnection;
    type Error = sqlx::Error;

    fn connect(&self, node: &NodeConfig) -> Result<PgConnection, sqlx::Error> {
        let (options, timeout) = connect_options(&node.dial)?;
        tracing::debug!(node = %node.tag, "Opening database connection");

        self.block_on(async {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, PgConnection::connect_with(&options))
                    .await
                    .map_err(|_| {
                        sqlx::Error::Io(std::io::Error::new(
                            std::io::ErrorKind::TimedOut,
                            format!("connect timed out after {}s", limit.as_secs()),
                        ))
                    })?,
                None => PgConnection::connect_with(&options).await,
            }
        })
    }

    fn is_valid(&self, conn: &mut PgConnection) -> bool {
        self.block_on(conn.ping()).is_ok()
    }
}

/// Split libpq's `connect_timeout` off the dial URL; sqlx does not know it
fn connect_options(dial: &str) -> Result<(PgConnectOptions, Option<Duration>), sqlx::Error> {
    let mut url = Url::parse(dial).map_err(|e| sqlx::Error::Configuration(Box::new(e)))?;

    let mut timeout = None;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(key, value)| {
            if key == "connect_timeout" {
                timeout = value.parse::<u64>().ok().filter(|s| *s > 0).map(Duration::from_secs);
                None
            } else {
                Some((key.into_owned(), value.into_owned()))
            }
        })
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let options = PgConnectOptions::from_url(&url)?;
    Ok((options, timeout))
}
