use crate::catalog::{BuildingDefinition, Catalog, CatalogError};
use crate::id::*;
use crate::ledger::Ledger;
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),
    #[error("cannot connect {0} to itself")]
    SelfConnection(NodeId),
    #[error("{from} is already connected to {to}")]
    DuplicateConnection { from: NodeId, to: NodeId },
    #[error("{from} produces nothing that {to} consumes")]
    IncompatibleNodes { from: NodeId, to: NodeId },
    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),
    #[error("duplicate connection id: {0}")]
    DuplicateConnectionId(ConnectionId),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl GraphError {
    /// True for the rejections a connect attempt can produce from user input.
    pub fn is_invalid_connection(&self) -> bool {
        matches!(
            self,
            GraphError::SelfConnection(_)
                | GraphError::DuplicateConnection { .. }
                | GraphError::IncompatibleNodes { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Core data structures
// ---------------------------------------------------------------------------

/// Canvas position of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A placed building.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionNode {
    pub id: NodeId,
    pub building: BuildingId,
    pub position: Position,
    level: u32,
    /// Nodes with a connection into this node.
    inputs: BTreeSet<NodeId>,
    /// Nodes this node has a connection into.
    outputs: BTreeSet<NodeId>,
    /// Derived every tick; never persisted.
    stalled: bool,
}

impl ProductionNode {
    fn new(id: NodeId, building: BuildingId, position: Position, level: u32) -> Self {
        Self {
            id,
            building,
            position,
            level,
            inputs: BTreeSet::new(),
            outputs: BTreeSet::new(),
            stalled: false,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn inputs(&self) -> &BTreeSet<NodeId> {
        &self.inputs
    }

    pub fn outputs(&self) -> &BTreeSet<NodeId> {
        &self.outputs
    }

    pub fn is_stalled(&self) -> bool {
        self.stalled
    }
}

/// A directed link asserting that `from` produces something `to` consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub from: NodeId,
    pub to: NodeId,
    /// Chosen at creation time and never re-validated.
    pub resource: ResourceId,
}

/// A node whose stall state changed during an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StallChange {
    pub node: NodeId,
    pub stalled: bool,
}

/// Outcome of one graph evaluation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub producing: usize,
    pub stalled: usize,
    pub transitions: Vec<StallChange>,
}

// ---------------------------------------------------------------------------
// ProductionGraph
// ---------------------------------------------------------------------------

/// The production graph: placed nodes and the connections between them.
///
/// Resources are pooled in the session's [`Ledger`]; connections only gate
/// whether a consumer may run, they never meter how much flows along them.
#[derive(Debug, Clone, Default)]
pub struct ProductionGraph {
    nodes: BTreeMap<NodeId, ProductionNode>,
    connections: BTreeMap<ConnectionId, Connection>,
    next_node: u64,
    next_connection: u64,
}

impl ProductionGraph {
    /// Create a new, empty production graph.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Add a level-1 node. Cost and catalog checks are the caller's job.
    pub(crate) fn insert_node(&mut self, building: BuildingId, position: Position) -> NodeId {
        self.next_node += 1;
        let id = NodeId(self.next_node);
        self.nodes
            .insert(id, ProductionNode::new(id, building, position, 1));
        id
    }

    /// Add a node with a known id, as read from a save. The id allocator
    /// moves past it.
    pub(crate) fn restore_node(
        &mut self,
        id: NodeId,
        building: BuildingId,
        position: Position,
        level: u32,
    ) -> Result<(), GraphError> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNode(id));
        }
        self.nodes
            .insert(id, ProductionNode::new(id, building, position, level));
        self.next_node = self.next_node.max(id.0);
        Ok(())
    }

    /// Remove a node and every connection touching it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(ProductionNode, Vec<Connection>), GraphError> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::NodeNotFound(id));
        }
        let touching: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|c| c.from == id || c.to == id)
            .map(|c| c.id)
            .collect();
        let mut removed = Vec::with_capacity(touching.len());
        for conn in touching {
            removed.push(self.delete_connection(conn)?);
        }
        let node = self.nodes.remove(&id).ok_or(GraphError::NodeNotFound(id))?;
        Ok((node, removed))
    }

    pub(crate) fn set_level(&mut self, id: NodeId, level: u32) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        node.level = level;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    /// Connect `from` to `to`.
    ///
    /// The connection carries the first resource in `from`'s declared
    /// production that `to` consumes.
    pub fn try_connect(
        &mut self,
        catalog: &Catalog,
        from: NodeId,
        to: NodeId,
    ) -> Result<Connection, GraphError> {
        if from == to {
            return Err(GraphError::SelfConnection(from));
        }
        let from_node = self.nodes.get(&from).ok_or(GraphError::NodeNotFound(from))?;
        let to_node = self.nodes.get(&to).ok_or(GraphError::NodeNotFound(to))?;
        if self.connection_between(from, to).is_some() {
            return Err(GraphError::DuplicateConnection { from, to });
        }

        let from_def = catalog.get_definition(from_node.building.as_str())?;
        let to_def = catalog.get_definition(to_node.building.as_str())?;
        let resource = from_def
            .production
            .keys()
            .find(|r| to_def.consumes(r.as_str()))
            .cloned()
            .ok_or(GraphError::IncompatibleNodes { from, to })?;

        self.next_connection += 1;
        let conn = Connection {
            id: ConnectionId(self.next_connection),
            from,
            to,
            resource,
        };
        self.link(conn.clone());
        Ok(conn)
    }

    /// Add a connection with a known id, as read from a save. Only structural
    /// rules are checked; the resource type is taken as stored.
    pub(crate) fn restore_connection(&mut self, conn: Connection) -> Result<(), GraphError> {
        if conn.from == conn.to {
            return Err(GraphError::SelfConnection(conn.from));
        }
        for endpoint in [conn.from, conn.to] {
            if !self.nodes.contains_key(&endpoint) {
                return Err(GraphError::NodeNotFound(endpoint));
            }
        }
        if self.connections.contains_key(&conn.id) {
            return Err(GraphError::DuplicateConnectionId(conn.id));
        }
        if self.connection_between(conn.from, conn.to).is_some() {
            return Err(GraphError::DuplicateConnection {
                from: conn.from,
                to: conn.to,
            });
        }
        self.next_connection = self.next_connection.max(conn.id.0);
        self.link(conn);
        Ok(())
    }

    fn link(&mut self, conn: Connection) {
        if let Some(node) = self.nodes.get_mut(&conn.from) {
            node.outputs.insert(conn.to);
        }
        if let Some(node) = self.nodes.get_mut(&conn.to) {
            node.inputs.insert(conn.from);
        }
        self.connections.insert(conn.id, conn);
    }

    /// Remove a connection and unlink both endpoints.
    pub fn delete_connection(&mut self, id: ConnectionId) -> Result<Connection, GraphError> {
        let conn = self
            .connections
            .remove(&id)
            .ok_or(GraphError::ConnectionNotFound(id))?;
        // At most one connection per ordered pair, so the id-set entries
        // belong to this connection alone.
        if let Some(node) = self.nodes.get_mut(&conn.from) {
            node.outputs.remove(&conn.to);
        }
        if let Some(node) = self.nodes.get_mut(&conn.to) {
            node.inputs.remove(&conn.from);
        }
        Ok(conn)
    }

    // -----------------------------------------------------------------------
    // Evaluation
    // -----------------------------------------------------------------------

    /// Recompute every node's stall state and write the resulting net rates
    /// into the ledger. Amounts are not touched.
    pub fn evaluate(&mut self, catalog: &Catalog, ledger: &mut Ledger) -> TickReport {
        ledger.reset_rates();

        let decisions: Vec<(NodeId, Option<&BuildingDefinition>, bool)> = self
            .nodes
            .values()
            .map(|node| match catalog.get_definition(node.building.as_str()) {
                Ok(def) => (node.id, Some(def), self.is_eligible(node, def, catalog, ledger)),
                Err(e) => {
                    tracing::error!(node = %node.id, error = %e, "node has no definition");
                    (node.id, None, false)
                }
            })
            .collect();

        let mut report = TickReport::default();
        for (id, def, eligible) in decisions {
            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            if node.stalled == eligible {
                report.transitions.push(StallChange {
                    node: id,
                    stalled: !eligible,
                });
            }
            node.stalled = !eligible;

            let Some(def) = def.filter(|_| eligible) else {
                report.stalled += 1;
                continue;
            };
            report.producing += 1;
            let level = f64::from(node.level);
            for (resource, rate) in def.production.iter() {
                ledger.adjust_rate(resource.as_str(), rate * level);
            }
            for (resource, rate) in def.consumption.iter() {
                ledger.adjust_rate(resource.as_str(), -rate * level);
            }
        }

        for change in &report.transitions {
            if change.stalled {
                tracing::debug!(node = %change.node, "node stalled");
            } else {
                tracing::debug!(node = %change.node, "node resumed");
            }
        }
        report
    }

    /// A consumer may run only if every consumed resource is produced by at
    /// least one input node's definition and the ledger can cover one
    /// second of its consumption at its current level.
    fn is_eligible(
        &self,
        node: &ProductionNode,
        def: &BuildingDefinition,
        catalog: &Catalog,
        ledger: &Ledger,
    ) -> bool {
        if !def.is_consumer() {
            return true;
        }
        let wired = def.consumption.keys().all(|resource| {
            node.inputs.iter().any(|input| {
                self.nodes
                    .get(input)
                    .and_then(|n| catalog.get_definition(n.building.as_str()).ok())
                    .is_some_and(|d| d.produces(resource.as_str()))
            })
        });
        wired && ledger.can_afford(&def.consumption.scaled(f64::from(node.level)))
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&ProductionNode> {
        self.nodes.get(&id)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// The connection from `from` to `to`, if any.
    pub fn connection_between(&self, from: NodeId, to: NodeId) -> Option<&Connection> {
        self.connections
            .values()
            .find(|c| c.from == from && c.to == to)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ProductionNode> {
        self.nodes.values()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn stalled_count(&self) -> usize {
        self.nodes.values().filter(|n| n.stalled).count()
    }
}
