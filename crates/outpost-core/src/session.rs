//! The game session: one catalog handle, one ledger, one production graph.
//!
//! Every user action is a `&mut self` command method that either applies in
//! full or returns an error without mutating anything.

use crate::catalog::{Catalog, CatalogError};
use crate::config::GameConfig;
use crate::graph::{Connection, GraphError, Position, ProductionGraph, ProductionNode, TickReport};
use crate::id::{BuildingId, ConnectionId, NodeId, ResourceId};
use crate::ledger::{CostMap, Ledger};
use crate::sim::{sanitize_delta, SimClock};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Rejections of a player action. None of these leave partial state behind.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("insufficient funds: need {}", describe_cost(.cost))]
    InsufficientFunds { cost: CostMap },
    #[error("node is already at max level {level}")]
    MaxLevelReached { level: u32 },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// `"50 credits, 2 ore"`.
pub fn describe_cost(cost: &CostMap) -> String {
    let mut out = String::new();
    for (i, (resource, amount)) in cost.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{amount} {resource}");
    }
    out
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single running game.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) config: GameConfig,
    pub(crate) ledger: Ledger,
    pub(crate) graph: ProductionGraph,
    pub(crate) building_counts: BTreeMap<BuildingId, u32>,
    pub(crate) capacity_upgrades: BTreeMap<ResourceId, u32>,
    pub(crate) clock: SimClock,
    /// Save timestamp the session was loaded from, in epoch milliseconds.
    pub(crate) loaded_at_ms: Option<u64>,
    pub(crate) offline_applied: bool,
}

impl Session {
    /// Start a fresh game: every resource at its initial amount, no nodes.
    pub fn new(catalog: Arc<Catalog>, config: GameConfig) -> Self {
        let ledger = Ledger::from_catalog(&catalog);
        let clock = SimClock::new(config.debug_log_interval);
        Self {
            catalog,
            config,
            ledger,
            graph: ProductionGraph::new(),
            building_counts: BTreeMap::new(),
            capacity_upgrades: BTreeMap::new(),
            clock,
            loaded_at_ms: None,
            offline_applied: false,
        }
    }

    /// A fresh game on the stock catalog and default config.
    pub fn standard() -> Self {
        Self::new(Arc::new(Catalog::standard()), GameConfig::default())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn graph(&self) -> &ProductionGraph {
        &self.graph
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn building_counts(&self) -> &BTreeMap<BuildingId, u32> {
        &self.building_counts
    }

    /// How many `building`s have been bought and not demolished.
    pub fn building_count(&self, building: &str) -> u32 {
        self.building_counts.get(building).copied().unwrap_or(0)
    }

    pub fn capacity_upgrades(&self, resource: &str) -> u32 {
        self.capacity_upgrades.get(resource).copied().unwrap_or(0)
    }

    /// Price of the next `building`.
    pub fn next_cost(&self, building: &str) -> Result<CostMap, CatalogError> {
        self.catalog
            .compute_cost(building, self.building_count(building))
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Buy and place a building. The cost is taken from the ledger and the
    /// building count goes up by one.
    pub fn place_node(
        &mut self,
        building: &str,
        position: Position,
    ) -> Result<ProductionNode, ActionError> {
        let def = self.catalog.get_definition(building)?;
        let owned = self.building_count(building);
        let cost = def.cost_at(owned);
        if !self.ledger.spend(&cost) {
            tracing::debug!(building, cost = %describe_cost(&cost), "cannot afford building");
            return Err(ActionError::InsufficientFunds { cost });
        }

        let id = self.graph.insert_node(def.id.clone(), position);
        self.building_counts.insert(def.id.clone(), owned + 1);
        tracing::info!(node = %id, building, total = owned + 1, "placed building");

        let node = self.graph.node(id).ok_or(GraphError::NodeNotFound(id))?;
        Ok(node.clone())
    }

    /// Demolish a node and its connections. Nothing is refunded; the next
    /// building of the same kind gets cheaper again.
    pub fn remove_node(&mut self, id: NodeId) -> Result<ProductionNode, ActionError> {
        let (node, removed) = self.graph.remove_node(id)?;
        if let Some(count) = self.building_counts.get_mut(&node.building) {
            *count = count.saturating_sub(1);
        }
        tracing::info!(
            node = %id,
            building = %node.building,
            connections = removed.len(),
            "removed node"
        );
        Ok(node)
    }

    /// Cost of taking `id` one level up, or `None` when it is at max level.
    pub fn upgrade_cost(&self, id: NodeId) -> Result<Option<CostMap>, ActionError> {
        let node = self.graph.node(id).ok_or(GraphError::NodeNotFound(id))?;
        if node.level() >= self.config.max_node_level {
            return Ok(None);
        }
        let def = self.catalog.get_definition(node.building.as_str())?;
        Ok(Some(
            def.upgrade_cost(node.level(), self.config.upgrade_cost_exponent),
        ))
    }

    /// Raise a node one level. Returns the new level.
    pub fn upgrade_node(&mut self, id: NodeId) -> Result<u32, ActionError> {
        let node = self.graph.node(id).ok_or(GraphError::NodeNotFound(id))?;
        let level = node.level();
        let cost = self
            .upgrade_cost(id)?
            .ok_or(ActionError::MaxLevelReached { level })?;
        if !self.ledger.spend(&cost) {
            tracing::debug!(node = %id, cost = %describe_cost(&cost), "cannot afford upgrade");
            return Err(ActionError::InsufficientFunds { cost });
        }
        self.graph.set_level(id, level + 1)?;
        tracing::info!(node = %id, level = level + 1, "upgraded node");
        Ok(level + 1)
    }

    // -----------------------------------------------------------------------
    // Connections
    // -----------------------------------------------------------------------

    pub fn try_connect(&mut self, from: NodeId, to: NodeId) -> Result<Connection, GraphError> {
        match self.graph.try_connect(&self.catalog, from, to) {
            Ok(conn) => {
                tracing::info!(
                    connection = %conn.id,
                    %from,
                    %to,
                    resource = %conn.resource,
                    "connected nodes"
                );
                Ok(conn)
            }
            Err(e) => {
                if e.is_invalid_connection() {
                    tracing::debug!(%from, %to, error = %e, "connection rejected");
                } else {
                    tracing::warn!(%from, %to, error = %e, "connection rejected");
                }
                Err(e)
            }
        }
    }

    pub fn delete_connection(&mut self, id: ConnectionId) -> Result<Connection, GraphError> {
        let conn = self.graph.delete_connection(id)?;
        tracing::info!(connection = %id, "deleted connection");
        Ok(conn)
    }

    // -----------------------------------------------------------------------
    // Simulation
    // -----------------------------------------------------------------------

    /// Advance the simulation by `dt` seconds: re-evaluate the graph, then
    /// apply the resulting rates. Large deltas are applied as-is.
    pub fn tick(&mut self, dt: f64) -> TickReport {
        let dt = sanitize_delta(dt);
        let report = self.graph.evaluate(&self.catalog, &mut self.ledger);
        self.ledger.apply_rates_over_interval(dt);
        self.clock
            .advance(dt, self.graph.node_count(), self.graph.connection_count());
        report
    }

    /// Re-derive stall flags and rates without advancing time.
    pub fn refresh_rates(&mut self) -> TickReport {
        self.graph.evaluate(&self.catalog, &mut self.ledger)
    }
}
