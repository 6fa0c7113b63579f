//! Save format migrations.
//!
//! Saves are migrated as untyped JSON before they are decoded, one version at
//! a time. Each registered function turns a version `N` document into a
//! version `N + 1` document.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Building type that was retired along with its nodes.
const RETIRED_BUILDING: &str = "market";

/// Errors that can occur during migration.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("no migration path from version {from} to version {to}")]
    NoMigrationPath { from: u32, to: u32 },
    #[error("migration from version {from} to version {to} failed: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },
}

/// A function that transforms a save document from one version to the next.
pub type MigrationFn = fn(Value) -> Result<Value, MigrationError>;

/// Upgrades old save documents step by step before they are decoded.
///
/// Each entry maps a save version to the function producing the next version,
/// so loading a version 1 save runs every step up to
/// [`SAVE_FORMAT_VERSION`](crate::serialize::SAVE_FORMAT_VERSION) in order. A gap
/// anywhere in that chain makes the save unloadable.
pub struct MigrationRegistry {
    migrations: BTreeMap<u32, MigrationFn>,
}

impl MigrationRegistry {
    pub fn new() -> Self {
        Self {
            migrations: BTreeMap::new(),
        }
    }

    /// Every migration shipped with the game.
    pub fn standard() -> Self {
        let mut reg = Self::new();
        reg.register(1, flatten_legacy_layout);
        reg
    }

    /// Register a migration function from `from_version` to `from_version + 1`.
    pub fn register(&mut self, from_version: u32, migrate: MigrationFn) {
        self.migrations.insert(from_version, migrate);
    }

    pub fn can_migrate(&self, from: u32, to: u32) -> bool {
        if from >= to {
            return from == to;
        }
        (from..to).all(|v| self.migrations.contains_key(&v))
    }

    /// Migrate a document from version `from` to version `to`, stamping the
    /// new version number after each step.
    pub fn migrate(&self, doc: Value, from: u32, to: u32) -> Result<Value, MigrationError> {
        if from > to {
            return Err(MigrationError::NoMigrationPath { from, to });
        }
        let mut doc = doc;
        for version in from..to {
            let migrate_fn = self
                .migrations
                .get(&version)
                .ok_or(MigrationError::NoMigrationPath { from, to })?;
            doc = migrate_fn(doc)?;
            if let Some(obj) = doc.as_object_mut() {
                obj.insert("version".into(), Value::from(version + 1));
            }
            tracing::info!(from = version, to = version + 1, "migrated save");
        }
        Ok(doc)
    }

    pub fn step_count(&self) -> usize {
        self.migrations.len()
    }
}

impl Default for MigrationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Version 1 -> 2
// ---------------------------------------------------------------------------

fn legacy_failure(reason: impl Into<String>) -> MigrationError {
    MigrationError::MigrationFailed {
        from: 1,
        to: 2,
        reason: reason.into(),
    }
}

/// Legacy ids were strings such as `"node_1699999999_4821"`; numbers are
/// accepted too.
fn legacy_key(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Version 1 kept nodes and connections under a `canvas` object, keyed by
/// string ids, and could contain `market` buildings. Version 2 is flat, uses
/// numeric ids and has no market buildings.
fn flatten_legacy_layout(doc: Value) -> Result<Value, MigrationError> {
    let Value::Object(mut legacy) = doc else {
        return Err(legacy_failure("document is not an object"));
    };
    if !legacy.contains_key("timestamp") {
        return Err(legacy_failure("missing timestamp"));
    }

    let mut canvas = match legacy.remove("canvas") {
        Some(Value::Object(canvas)) => canvas,
        Some(Value::Null) | None => Map::new(),
        Some(_) => return Err(legacy_failure("canvas is not an object")),
    };
    let nodes = match canvas.remove("nodes") {
        Some(Value::Array(nodes)) => nodes,
        _ => Vec::new(),
    };
    let connections = match canvas.remove("connections") {
        Some(Value::Array(conns)) => conns,
        _ => Vec::new(),
    };

    // Drop retired buildings, then number the survivors in save order.
    let mut remap: HashMap<String, u64> = HashMap::new();
    let mut kept_nodes = Vec::with_capacity(nodes.len());
    let mut dropped = 0usize;
    for node in nodes {
        let Value::Object(mut node) = node else {
            return Err(legacy_failure("node is not an object"));
        };
        if node.get("buildingType").and_then(Value::as_str) == Some(RETIRED_BUILDING) {
            dropped += 1;
            continue;
        }
        let key = node
            .get("id")
            .and_then(legacy_key)
            .ok_or_else(|| legacy_failure("node without id"))?;
        let new_id = remap.len() as u64 + 1;
        if remap.insert(key.clone(), new_id).is_some() {
            return Err(legacy_failure(format!("duplicate node id {key}")));
        }
        node.insert("id".into(), Value::from(new_id));
        if !node.contains_key("level") {
            node.insert("level".into(), Value::from(1));
        }
        kept_nodes.push(node);
    }

    // Neighbour lists may still point at dropped nodes.
    for node in &mut kept_nodes {
        for field in ["inputs", "outputs"] {
            let ids: Vec<Value> = match node.get(field) {
                Some(Value::Array(ids)) => ids
                    .iter()
                    .filter_map(legacy_key)
                    .filter_map(|k| remap.get(&k).copied())
                    .map(Value::from)
                    .collect(),
                _ => Vec::new(),
            };
            node.insert(field.into(), Value::Array(ids));
        }
    }

    let mut kept_connections = Vec::with_capacity(connections.len());
    for conn in connections {
        let Value::Object(mut conn) = conn else {
            return Err(legacy_failure("connection is not an object"));
        };
        let from = conn.get("fromNodeId").and_then(legacy_key);
        let to = conn.get("toNodeId").and_then(legacy_key);
        let (Some(from), Some(to)) = (
            from.and_then(|k| remap.get(&k).copied()),
            to.and_then(|k| remap.get(&k).copied()),
        ) else {
            continue;
        };
        conn.insert("id".into(), Value::from(kept_connections.len() as u64 + 1));
        conn.insert("fromNodeId".into(), Value::from(from));
        conn.insert("toNodeId".into(), Value::from(to));
        kept_connections.push(Value::Object(conn));
    }

    if let Some(Value::Object(counts)) = legacy.get_mut("buildingCounts") {
        counts.remove(RETIRED_BUILDING);
    }
    if dropped > 0 {
        tracing::info!(dropped, "removed retired market buildings from legacy save");
    }

    legacy.insert(
        "nodes".into(),
        Value::Array(kept_nodes.into_iter().map(Value::Object).collect()),
    );
    legacy.insert("connections".into(), Value::Array(kept_connections));
    legacy
        .entry("resources")
        .or_insert_with(|| Value::Object(Map::new()));
    legacy
        .entry("buildingCounts")
        .or_insert_with(|| Value::Object(Map::new()));
    Ok(Value::Object(legacy))
}
