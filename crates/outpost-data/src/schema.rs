//! Serde data file structs for game content definitions.
//!
//! These structs define the on-disk format for resources and buildings. They
//! are deserialized from RON, JSON or TOML files and then converted into
//! catalog definitions.

use outpost_core::catalog::{BuildingDefinition, Footprint, RateTable, ResourceDefinition};
use outpost_core::id::{BuildingId, ResourceId};
use outpost_core::ledger::{Capacity, CostMap};
use serde::Deserialize;

// ===========================================================================
// Resources
// ===========================================================================

/// A resource definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceData {
    pub id: String,
    /// Defaults to the id.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub initial: f64,
    /// Omitted for resources with unlimited storage.
    #[serde(default)]
    pub capacity: Option<f64>,
}

impl ResourceData {
    pub fn into_definition(self) -> ResourceDefinition {
        ResourceDefinition {
            display_name: self.name.unwrap_or_else(|| self.id.clone()),
            id: ResourceId::new(self.id),
            initial_amount: self.initial,
            initial_capacity: Capacity::from_option(self.capacity),
        }
    }
}

// ===========================================================================
// Buildings
// ===========================================================================

/// A `(resource, amount)` pair. Written as a tuple so that lists keep their
/// declaration order in every format.
pub type AmountData = (String, f64);

/// A building definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildingData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cost: Vec<AmountData>,
    pub cost_growth: f64,
    #[serde(default)]
    pub produces: Vec<AmountData>,
    #[serde(default)]
    pub consumes: Vec<AmountData>,
    #[serde(default)]
    pub footprint: Option<FootprintData>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FootprintData {
    pub width: u32,
    pub height: u32,
}

fn rate_table(entries: Vec<AmountData>) -> RateTable {
    let mut table = RateTable::new();
    for (resource, rate) in entries {
        table.push(ResourceId::new(resource), rate);
    }
    table
}

impl BuildingData {
    pub fn into_definition(self) -> BuildingDefinition {
        BuildingDefinition {
            id: BuildingId::new(self.id),
            display_name: self.name,
            description: self.description,
            base_cost: self
                .cost
                .into_iter()
                .map(|(resource, amount)| (ResourceId::new(resource), amount))
                .collect::<CostMap>(),
            cost_growth: self.cost_growth,
            production: rate_table(self.produces),
            consumption: rate_table(self.consumes),
            footprint: self
                .footprint
                .map(|f| Footprint {
                    width: f.width,
                    height: f.height,
                })
                .unwrap_or_default(),
        }
    }
}
