//! Tunable game constants.
//!
//! Every field has a default, so a data file only needs to name the values it
//! overrides.

use crate::id::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level configuration for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Absences shorter than this (milliseconds) earn no offline progress.
    pub min_offline_ms: u64,
    /// Offline progress is computed for at most this many milliseconds.
    pub max_offline_ms: u64,
    /// Highest level a node can be upgraded to.
    pub max_node_level: u32,
    /// Upgrade cost is `floor(base_cost * level^upgrade_cost_exponent)`.
    pub upgrade_cost_exponent: f64,
    /// Log graph size every this many frames (0 disables).
    pub debug_log_interval: u64,
    pub market: MarketConfig,
    pub warehouse: WarehouseConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_offline_ms: 60_000,
            max_offline_ms: 7_200_000,
            max_node_level: 10,
            upgrade_cost_exponent: 1.5,
            debug_log_interval: 300,
            market: MarketConfig::default(),
            warehouse: WarehouseConfig::default(),
        }
    }
}

/// Prices paid by the market, per unit sold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub currency: ResourceId,
    pub prices: BTreeMap<ResourceId, f64>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            currency: ResourceId::new("credits"),
            prices: BTreeMap::from([
                (ResourceId::new("ore"), 0.5),
                (ResourceId::new("metal"), 3.0),
            ]),
        }
    }
}

/// Storage capacity upgrades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub currency: ResourceId,
    /// Cost of the first upgrade of a resource.
    pub base_cost: f64,
    /// Each further upgrade of the same resource costs this much more.
    pub cost_growth: f64,
    /// Capacity added per upgrade.
    pub capacity_step: f64,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            currency: ResourceId::new("credits"),
            base_cost: 100.0,
            cost_growth: 1.5,
            capacity_step: 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_game() {
        let c = GameConfig::default();
        assert_eq!(c.min_offline_ms, 60_000);
        assert_eq!(c.max_offline_ms, 2 * 60 * 60 * 1000);
        assert_eq!(c.max_node_level, 10);
        assert_eq!(c.market.prices[&ResourceId::new("metal")], 3.0);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let c: GameConfig =
            serde_json::from_str(r#"{ "max_node_level": 25, "warehouse": { "base_cost": 10 } }"#)
                .unwrap();
        assert_eq!(c.max_node_level, 25);
        assert_eq!(c.warehouse.base_cost, 10.0);
        assert_eq!(c.warehouse.capacity_step, 1000.0);
        assert_eq!(c.max_offline_ms, 7_200_000);
    }
}
