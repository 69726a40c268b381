use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::guard::PooledConnection;
use super::{ManageConnection, NodeConfig, PoolError, PoolSettings, Role};

/// A connection taken out of the pool, with the node it must go back to
#[derive(Debug)]
pub struct Borrowed<C> {
    pub role: Role,
    pub node_index: usize,
    pub node_tag: Arc<str>,
    pub connection: C,
}

struct Node {
    config: NodeConfig,
    tag: Arc<str>,
}

struct PoolState<C> {
    // idle[role][node]
    idle: [Vec<VecDeque<C>>; 2],
    cursors: [usize; 2],
}

/// Fixed-size connection pool over primary and replica nodes
pub struct ConnectionPool<M: ManageConnection> {
    manager: M,
    settings: PoolSettings,
    nodes: [Vec<Node>; 2],
    state: Mutex<PoolState<M::Connection>>,
}

impl<M: ManageConnection> ConnectionPool<M> {
    /// Open `settings.pool_size` connections to every node, in node order
    ///
    /// Fails on the first connection that cannot be opened.
    pub fn new(
        manager: M,
        primaries: Vec<NodeConfig>,
        replicas: Vec<NodeConfig>,
        settings: PoolSettings,
    ) -> Result<Self, PoolError> {
        let mut idle: [Vec<VecDeque<M::Connection>>; 2] = [Vec::new(), Vec::new()];

        for (role, configs) in [(Role::Primary, &primaries), (Role::Replica, &replicas)] {
            for config in configs {
                let mut queue = VecDeque::with_capacity(settings.pool_size);
                for _ in 0..settings.pool_size {
                    let conn = manager
                        .connect(config)
                        .map_err(|e| PoolError::Connect {
                            node: config.tag.clone(),
                            source: Box::new(e),
                        })?;
                    queue.push_back(conn);
                }
                info!(
                    role = %role,
                    node = %config.tag,
                    connections = settings.pool_size,
                    "Connection pool node ready"
                );
                idle[role.index()].push(queue);
            }
        }

        let into_nodes = |configs: Vec<NodeConfig>| -> Vec<Node> {
            configs
                .into_iter()
                .map(|config| Node {
                    tag: Arc::from(config.tag.as_str()),
                    config,
                })
                .collect()
        };

        Ok(Self {
            manager,
            settings,
            nodes: [into_nodes(primaries), into_nodes(replicas)],
            state: Mutex::new(PoolState {
                idle,
                cursors: [0, 0],
            }),
        })
    }

    /// Borrow a scoped connection that is returned when dropped
    pub fn get(&self, preferred: Role) -> Result<PooledConnection<'_, M>, PoolError> {
        let borrowed = self.borrow(preferred)?;
        Ok(PooledConnection::new(self, borrowed))
    }

    /// Take one idle connection from the next node of the role
    ///
    /// Replica requests fall back to the primary when no replica is
    /// configured. The caller owes a [`release`](Self::release).
    pub fn borrow(&self, preferred: Role) -> Result<Borrowed<M::Connection>, PoolError> {
        let role = self.effective_role(preferred);
        let nodes = &self.nodes[role.index()];
        if nodes.is_empty() {
            return Err(PoolError::NoNodes { role });
        }

        let (node_index, connection) = {
            let mut state = self.state.lock();
            let cursor = &mut state.cursors[role.index()];
            *cursor = (*cursor + 1) % nodes.len();
            let node_index = *cursor;

            match state.idle[role.index()][node_index].pop_front() {
                Some(conn) => (node_index, conn),
                None => {
                    return Err(PoolError::Exhausted {
                        role,
                        node: nodes[node_index].config.tag.clone(),
                    })
                }
            }
        };

        let borrowed = Borrowed {
            role,
            node_index,
            node_tag: Arc::clone(&nodes[node_index].tag),
            connection,
        };

        if self.settings.validate_on_borrow {
            self.revalidate(borrowed)
        } else {
            Ok(borrowed)
        }
    }

    /// Put a connection back on the node it was borrowed from
    ///
    /// No validity check is made; a connection that failed a query is
    /// returned all the same.
    pub fn release(&self, role: Role, node_index: usize, connection: M::Connection) {
        let mut state = self.state.lock();
        match state.idle[role.index()].get_mut(node_index) {
            Some(queue) => queue.push_back(connection),
            None => warn!(role = %role, node_index, "released connection for unknown node"),
        }
    }

    /// Idle connections currently held by a node
    pub fn idle_count(&self, role: Role, node_index: usize) -> Option<usize> {
        let state = self.state.lock();
        state.idle[role.index()].get(node_index).map(VecDeque::len)
    }

    pub fn node_count(&self, role: Role) -> usize {
        self.nodes[role.index()].len()
    }

    /// Index of the node that served the most recent borrow of the role
    pub fn cursor(&self, role: Role) -> usize {
        self.state.lock().cursors[role.index()]
    }

    pub fn reset_cursors(&self) {
        self.state.lock().cursors = [0, 0];
    }

    /// Node tags of a role, in round-robin order
    pub fn tags(&self, role: Role) -> Vec<&str> {
        self.nodes[role.index()]
            .iter()
            .map(|node| node.config.tag.as_str())
            .collect()
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    fn effective_role(&self, preferred: Role) -> Role {
        match preferred {
            Role::Replica if !self.nodes[Role::Replica.index()].is_empty() => Role::Replica,
            _ => Role::Primary,
        }
    }

    /// Replace a dead connection; runs without the pool lock
    fn revalidate(
        &self,
        mut borrowed: Borrowed<M::Connection>,
    ) -> Result<Borrowed<M::Connection>, PoolError> {
        if self.manager.is_valid(&mut borrowed.connection) {
            return Ok(borrowed);
        }

        let node = &self.nodes[borrowed.role.index()][borrowed.node_index];
        warn!(node = %node.tag, "Dead connection found on borrow, reconnecting");

        match self.manager.connect(&node.config) {
            Ok(fresh) => {
                debug!(node = %node.tag, "Connection re-created");
                borrowed.connection = fresh;
                Ok(borrowed)
            }
            Err(e) => {
                // Keep node capacity: the dead connection goes back
                self.release(borrowed.role, borrowed.node_index, borrowed.connection);
                Err(PoolError::Connect {
                    node: node.config.tag.clone(),
                    source: Box::new(e),
                })
            }
        }
    }
}

impl<M: ManageConnection> std::fmt::Debug for ConnectionPool<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("primaries", &self.tags(Role::Primary))
            .field("replicas", &self.tags(Role::Replica))
            .field("settings", &self.settings)
            .finish()
    }
}
