use std::ops::{Deref, DerefMut};

use super::pool::{Borrowed, ConnectionPool};
use super::{ManageConnection, Role};

/// Borrowed connection that goes back to its node when dropped
///
/// Release happens on every exit path, including `?` returns and panics.
/// The guard borrows the pool, so it cannot outlive it.
pub struct PooledConnection<'a, M: ManageConnection> {
    pool: &'a ConnectionPool<M>,
    // Always `Some` until drop
    borrowed: Option<Borrowed<M::Connection>>,
}

impl<'a, M: ManageConnection> PooledConnection<'a, M> {
    pub(super) fn new(pool: &'a ConnectionPool<M>, borrowed: Borrowed<M::Connection>) -> Self {
        Self {
            pool,
            borrowed: Some(borrowed),
        }
    }

    fn inner(&self) -> &Borrowed<M::Connection> {
        match &self.borrowed {
            Some(borrowed) => borrowed,
            None => unreachable!("connection already released"),
        }
    }

    pub fn role(&self) -> Role {
        self.inner().role
    }

    pub fn node_index(&self) -> usize {
        self.inner().node_index
    }

    /// `host:port` of the node serving this connection
    pub fn node_tag(&self) -> &str {
        &self.inner().node_tag
    }
}

impl<M: ManageConnection> Deref for PooledConnection<'_, M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        &self.inner().connection
    }
}

impl<M: ManageConnection> DerefMut for PooledConnection<'_, M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.borrowed {
            Some(borrowed) => &mut borrowed.connection,
            None => unreachable!("connection already released"),
        }
    }
}

impl<M: ManageConnection> Drop for PooledConnection<'_, M> {
    fn drop(&mut self) {
        if let Some(borrowed) = self.borrowed.take() {
            self.pool
                .release(borrowed.role, borrowed.node_index, borrowed.connection);
        }
    }
}

impl<M: ManageConnection> std::fmt::Debug for PooledConnection<'_, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("role", &self.role())
            .field("node", &self.node_tag())
            .finish()
    }
}
