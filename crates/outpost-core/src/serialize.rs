//! Save documents.
//!
//! A session is persisted as one camelCase JSON document holding resource
//! amounts, nodes, connections, building counts and a save timestamp. Stall
//! flags and rates are not stored; they are re-derived right after load.
//!
//! Older documents are upgraded through the [`MigrationRegistry`] before they
//! are decoded. Documents wrapped in the desktop shell's
//! `{ "appData": { "factory": ... } }` envelope are unwrapped first.

use crate::catalog::Catalog;
use crate::config::GameConfig;
use crate::graph::{Connection, GraphError, Position};
use crate::id::{BuildingId, ConnectionId, NodeId, ResourceId};
use crate::ledger::{Capacity, LedgerError};
use crate::migration::{MigrationError, MigrationRegistry};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Current save format version. Increment when the document layout changes
/// and register a migration for the previous version.
pub const SAVE_FORMAT_VERSION: u32 = 2;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("malformed save document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("save version {0} is newer than supported version {SAVE_FORMAT_VERSION}")]
    FutureVersion(u32),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("unknown resource in save: {0}")]
    UnknownResource(ResourceId),
    #[error("unknown building in save: {0}")]
    UnknownBuilding(BuildingId),
    #[error("{node} has invalid level {level}")]
    InvalidLevel { node: NodeId, level: u32 },
    #[error("{connection} references missing node {node}")]
    DanglingConnection {
        connection: ConnectionId,
        node: NodeId,
    },
    #[error("invalid graph in save: {0}")]
    Graph(#[from] GraphError),
}

impl From<LedgerError> for SnapshotError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownResource(id) => SnapshotError::UnknownResource(id),
        }
    }
}

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedResource {
    pub current: f64,
    /// `None` (written as `null`) for unbounded resources.
    #[serde(default)]
    pub capacity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedNode {
    pub id: NodeId,
    pub building_type: BuildingId,
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_level")]
    pub level: u32,
    /// Derived from `connections` on load.
    #[serde(default)]
    pub inputs: Vec<NodeId>,
    /// Derived from `connections` on load.
    #[serde(default)]
    pub outputs: Vec<NodeId>,
}

fn default_level() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedConnection {
    pub id: ConnectionId,
    pub from_node_id: NodeId,
    pub to_node_id: NodeId,
    pub resource_type: ResourceId,
}

/// A full, self-contained save of one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSnapshot {
    pub version: u32,
    #[serde(default)]
    pub resources: BTreeMap<ResourceId, SavedResource>,
    #[serde(default)]
    pub nodes: Vec<SavedNode>,
    #[serde(default)]
    pub connections: Vec<SavedConnection>,
    #[serde(default)]
    pub building_counts: BTreeMap<BuildingId, u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub capacity_upgrades: BTreeMap<ResourceId, u32>,
    /// Epoch milliseconds at save time.
    pub timestamp: u64,
}

impl SaveSnapshot {
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a document of any supported version.
    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        Self::from_json_with_migrations(text, &MigrationRegistry::standard())
    }

    pub fn from_json_with_migrations(
        text: &str,
        migrations: &MigrationRegistry,
    ) -> Result<Self, SnapshotError> {
        let mut doc: Value = serde_json::from_str(text)?;
        if let Some(inner) = doc.pointer_mut("/appData/factory") {
            doc = inner.take();
        }

        // Unversioned documents predate versioning.
        let version = doc
            .get("version")
            .and_then(Value::as_u64)
            .map_or(1, |v| u32::try_from(v).unwrap_or(u32::MAX));
        if version > SAVE_FORMAT_VERSION {
            return Err(SnapshotError::FutureVersion(version));
        }
        if version < SAVE_FORMAT_VERSION {
            doc = migrations.migrate(doc, version, SAVE_FORMAT_VERSION)?;
        }
        Ok(serde_json::from_value(doc)?)
    }
}

/// Milliseconds since the Unix epoch, or zero if the system clock is before it.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Session save/load
// ---------------------------------------------------------------------------

impl Session {
    /// Snapshot the session, stamped with the current wall-clock time.
    pub fn get_save_snapshot(&self) -> SaveSnapshot {
        self.save_snapshot_at(unix_millis())
    }

    /// Snapshot the session with an explicit timestamp.
    pub fn save_snapshot_at(&self, timestamp: u64) -> SaveSnapshot {
        let resources = self
            .ledger
            .iter()
            .map(|res| {
                (
                    res.id.clone(),
                    SavedResource {
                        current: res.current(),
                        capacity: res.capacity().as_option(),
                    },
                )
            })
            .collect();
        let nodes = self
            .graph
            .nodes()
            .map(|node| SavedNode {
                id: node.id,
                building_type: node.building.clone(),
                x: node.position.x,
                y: node.position.y,
                level: node.level(),
                inputs: node.inputs().iter().copied().collect(),
                outputs: node.outputs().iter().copied().collect(),
            })
            .collect();
        let connections = self
            .graph
            .connections()
            .map(|conn| SavedConnection {
                id: conn.id,
                from_node_id: conn.from,
                to_node_id: conn.to,
                resource_type: conn.resource.clone(),
            })
            .collect();

        SaveSnapshot {
            version: SAVE_FORMAT_VERSION,
            resources,
            nodes,
            connections,
            building_counts: self.building_counts.clone(),
            capacity_upgrades: self.capacity_upgrades.clone(),
            timestamp,
        }
    }

    /// Rebuild a session from a snapshot. Stall flags and rates are derived
    /// immediately; no time passes.
    pub fn from_snapshot(
        catalog: Arc<Catalog>,
        config: GameConfig,
        snapshot: &SaveSnapshot,
    ) -> Result<Self, SnapshotError> {
        let mut session = Session::new(catalog, config);

        for (id, saved) in &snapshot.resources {
            session.ledger.restore(
                id.as_str(),
                saved.current,
                Capacity::from_option(saved.capacity),
            )?;
        }

        for saved in &snapshot.nodes {
            if session
                .catalog
                .get_definition(saved.building_type.as_str())
                .is_err()
            {
                return Err(SnapshotError::UnknownBuilding(saved.building_type.clone()));
            }
            if saved.level == 0 {
                return Err(SnapshotError::InvalidLevel {
                    node: saved.id,
                    level: saved.level,
                });
            }
            session.graph.restore_node(
                saved.id,
                saved.building_type.clone(),
                Position::new(saved.x, saved.y),
                saved.level,
            )?;
        }

        // Connections are authoritative; node neighbour lists are rebuilt
        // from them.
        for saved in &snapshot.connections {
            for endpoint in [saved.from_node_id, saved.to_node_id] {
                if !session.graph.contains_node(endpoint) {
                    return Err(SnapshotError::DanglingConnection {
                        connection: saved.id,
                        node: endpoint,
                    });
                }
            }
            if !session.catalog.has_resource(saved.resource_type.as_str()) {
                return Err(SnapshotError::UnknownResource(saved.resource_type.clone()));
            }
            session.graph.restore_connection(Connection {
                id: saved.id,
                from: saved.from_node_id,
                to: saved.to_node_id,
                resource: saved.resource_type.clone(),
            })?;
        }

        for (building, &count) in &snapshot.building_counts {
            if session.catalog.get_definition(building.as_str()).is_err() {
                return Err(SnapshotError::UnknownBuilding(building.clone()));
            }
            session.building_counts.insert(building.clone(), count);
        }
        for (resource, &level) in &snapshot.capacity_upgrades {
            if !session.ledger.contains(resource.as_str()) {
                return Err(SnapshotError::UnknownResource(resource.clone()));
            }
            session.capacity_upgrades.insert(resource.clone(), level);
        }

        session.loaded_at_ms = Some(snapshot.timestamp);
        session.refresh_rates();
        Ok(session)
    }

    /// Replace this session's state with a snapshot. On error the session is
    /// left untouched.
    pub fn load_from_snapshot(&mut self, snapshot: &SaveSnapshot) -> Result<(), SnapshotError> {
        let loaded = Self::from_snapshot(self.catalog.clone(), self.config.clone(), snapshot)?;
        *self = loaded;
        tracing::info!(
            nodes = self.graph.node_count(),
            connections = self.graph.connection_count(),
            "loaded save"
        );
        Ok(())
    }

    /// Load a saved JSON document, or start fresh if there is none or it
    /// cannot be used.
    pub fn load_or_fresh(catalog: Arc<Catalog>, config: GameConfig, saved: Option<&str>) -> Self {
        let Some(text) = saved else {
            tracing::info!("no save found, starting fresh");
            return Session::new(catalog, config);
        };
        let loaded = SaveSnapshot::from_json(text)
            .and_then(|snapshot| Self::from_snapshot(catalog.clone(), config.clone(), &snapshot));
        match loaded {
            Ok(session) => {
                tracing::info!(
                    nodes = session.graph.node_count(),
                    connections = session.graph.connection_count(),
                    "loaded save"
                );
                session
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load save, starting fresh");
                Session::new(catalog, config)
            }
        }
    }
}
