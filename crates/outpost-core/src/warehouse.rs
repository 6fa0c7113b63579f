//! Warehouse: storage capacity upgrades and the storage report.

use crate::display::format_number;
use crate::id::ResourceId;
use crate::ledger::{Capacity, CostMap};
use crate::session::{ActionError, Session};

/// Net rates within this band count as balanced.
const BALANCE_EPSILON: f64 = 0.01;
/// Fill ratio above which storage counts as nearly full.
const NEAR_FULL: f64 = 0.9;
const FILLING: f64 = 0.7;

#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    #[error("{0} has unlimited storage")]
    UnboundedResource(ResourceId),
    #[error("unknown resource: {0}")]
    UnknownResource(ResourceId),
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// Direction of a resource's net rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Deficit,
    Balanced,
    Surplus,
}

impl Trend {
    pub fn from_rate(net: f64) -> Self {
        if net < -BALANCE_EPSILON {
            Trend::Deficit
        } else if net > BALANCE_EPSILON {
            Trend::Surplus
        } else {
            Trend::Balanced
        }
    }
}

/// How full a store is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillLevel {
    Plenty,
    Filling,
    NearFull,
}

impl FillLevel {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio > NEAR_FULL {
            FillLevel::NearFull
        } else if ratio > FILLING {
            FillLevel::Filling
        } else {
            FillLevel::Plenty
        }
    }
}

/// Overall storage health, worst condition first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    Deficit,
    NearCapacity,
    Nominal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageLine {
    pub resource: ResourceId,
    pub current: f64,
    pub capacity: f64,
    pub fill: FillLevel,
    /// Nominal production of every placed node, stalled or not.
    pub output: f64,
    /// Nominal consumption of every placed node, stalled or not.
    pub demand: f64,
    /// Net rate from the last tick.
    pub net: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageReport {
    pub lines: Vec<StorageLine>,
    pub status: SystemStatus,
}

impl StorageReport {
    pub fn line(&self, resource: &str) -> Option<&StorageLine> {
        self.lines.iter().find(|l| l.resource.as_str() == resource)
    }
}

impl Session {
    /// Credits needed for the next capacity upgrade of `resource`.
    pub fn capacity_upgrade_cost(&self, resource: &str) -> CostMap {
        let wh = &self.config.warehouse;
        let level = self.capacity_upgrades(resource);
        let amount = (wh.base_cost * wh.cost_growth.powi(level.min(i32::MAX as u32) as i32)).floor();
        CostMap::from([(wh.currency.clone(), amount)])
    }

    /// Buy one capacity step for `resource`. Returns the new capacity.
    pub fn upgrade_capacity(&mut self, resource: &str) -> Result<f64, WarehouseError> {
        let state = self
            .ledger
            .resource(resource)
            .map_err(|_| WarehouseError::UnknownResource(ResourceId::new(resource)))?;
        let Capacity::Limited(limit) = state.capacity() else {
            return Err(WarehouseError::UnboundedResource(ResourceId::new(resource)));
        };

        let cost = self.capacity_upgrade_cost(resource);
        if !self.ledger.spend(&cost) {
            tracing::debug!(resource, "cannot afford capacity upgrade");
            return Err(ActionError::InsufficientFunds { cost }.into());
        }
        let new_limit = limit + self.config.warehouse.capacity_step;
        self.ledger
            .set_capacity(resource, Capacity::Limited(new_limit))
            .map_err(|_| WarehouseError::UnknownResource(ResourceId::new(resource)))?;
        *self
            .capacity_upgrades
            .entry(ResourceId::new(resource))
            .or_insert(0) += 1;
        tracing::info!(resource, capacity = %format_number(new_limit), "upgraded storage");
        Ok(new_limit)
    }

    /// Per-resource storage overview. Resources without a storage limit,
    /// such as the currency, are left out.
    pub fn storage_report(&self) -> StorageReport {
        let mut lines = Vec::new();
        for res in self.ledger.iter() {
            let Capacity::Limited(capacity) = res.capacity() else {
                continue;
            };
            let (output, demand) = self.nominal_flow(res.id.as_str());
            lines.push(StorageLine {
                resource: res.id.clone(),
                current: res.current(),
                capacity,
                fill: FillLevel::from_ratio(res.fill_ratio().unwrap_or(0.0)),
                output,
                demand,
                net: res.rate(),
                trend: Trend::from_rate(res.rate()),
            });
        }

        let status = if lines.iter().any(|l| l.trend == Trend::Deficit) {
            SystemStatus::Deficit
        } else if lines.iter().any(|l| l.fill == FillLevel::NearFull) {
            SystemStatus::NearCapacity
        } else {
            SystemStatus::Nominal
        };
        StorageReport { lines, status }
    }

    /// Production and consumption of `resource` summed over every node at its
    /// level, ignoring stall state.
    fn nominal_flow(&self, resource: &str) -> (f64, f64) {
        let mut output = 0.0;
        let mut demand = 0.0;
        for node in self.graph.nodes() {
            let Ok(def) = self.catalog.get_definition(node.building.as_str()) else {
                continue;
            };
            let level = f64::from(node.level());
            output += def.production.get(resource).unwrap_or(0.0) * level;
            demand += def.consumption.get(resource).unwrap_or(0.0) * level;
        }
        (output, demand)
    }
}
