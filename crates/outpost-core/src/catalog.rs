//! Building catalog: immutable, data-driven resource and building definitions.
//!
//! A [`Catalog`] is assembled through a [`CatalogBuilder`] and frozen by
//! [`CatalogBuilder::build`], which validates every cross reference. After
//! that it is read-only and shared between sessions behind an `Arc`.

use crate::id::{BuildingId, ResourceId};
use crate::ledger::{Capacity, CostMap};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unknown building: {0}")]
    UnknownBuilding(BuildingId),
    #[error("unknown resource {resource} referenced by {context}")]
    UnknownResource {
        resource: ResourceId,
        context: String,
    },
    #[error("duplicate resource: {0}")]
    DuplicateResource(ResourceId),
    #[error("duplicate building: {0}")]
    DuplicateBuilding(BuildingId),
    #[error("cost growth factor of {building} must be greater than 1, got {factor}")]
    InvalidGrowthFactor { building: BuildingId, factor: f64 },
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

/// A resource kind and its starting state.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDefinition {
    pub id: ResourceId,
    pub display_name: String,
    pub initial_amount: f64,
    pub initial_capacity: Capacity,
}

/// Per-second rates keyed by resource, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable(Vec<(ResourceId, f64)>);

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|&(id, rate)| (ResourceId::new(id), rate))
                .collect(),
        )
    }

    pub fn push(&mut self, resource: ResourceId, rate: f64) {
        self.0.push((resource, rate));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, f64)> {
        self.0.iter().map(|(id, rate)| (id, *rate))
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResourceId> {
        self.0.iter().map(|(id, _)| id)
    }

    pub fn get(&self, resource: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(id, _)| id.as_str() == resource)
            .map(|(_, rate)| *rate)
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.get(resource).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Every rate multiplied by `factor`, as a cost map.
    pub fn scaled(&self, factor: f64) -> CostMap {
        self.0
            .iter()
            .map(|(id, rate)| (id.clone(), rate * factor))
            .collect()
    }
}

/// Canvas footprint of a building, in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Default for Footprint {
    fn default() -> Self {
        Self {
            width: 150,
            height: 80,
        }
    }
}

/// A building kind.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildingDefinition {
    pub id: BuildingId,
    pub display_name: String,
    pub description: String,
    pub base_cost: CostMap,
    /// Multiplier applied to the cost for each building of this kind already owned.
    pub cost_growth: f64,
    pub production: RateTable,
    pub consumption: RateTable,
    pub footprint: Footprint,
}

impl BuildingDefinition {
    /// Purchase cost when `owned` buildings of this kind already exist:
    /// `floor(base * growth^owned)` per resource.
    pub fn cost_at(&self, owned: u32) -> CostMap {
        let scale = self.cost_growth.powi(owned.min(i32::MAX as u32) as i32);
        self.base_cost
            .iter()
            .map(|(id, base)| (id.clone(), (base * scale).floor()))
            .collect()
    }

    /// Cost of upgrading from `level` to `level + 1`:
    /// `floor(base * level^exponent)` per resource.
    pub fn upgrade_cost(&self, level: u32, exponent: f64) -> CostMap {
        let scale = f64::from(level).powf(exponent);
        self.base_cost
            .iter()
            .map(|(id, base)| (id.clone(), (base * scale).floor()))
            .collect()
    }

    pub fn produces(&self, resource: &str) -> bool {
        self.production.contains(resource)
    }

    pub fn consumes(&self, resource: &str) -> bool {
        self.consumption.contains(resource)
    }

    pub fn is_consumer(&self) -> bool {
        !self.consumption.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects definitions, then validates and freezes them into a [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    resources: Vec<ResourceDefinition>,
    buildings: Vec<BuildingDefinition>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_resource(&mut self, def: ResourceDefinition) -> &mut Self {
        self.resources.push(def);
        self
    }

    pub fn register_building(&mut self, def: BuildingDefinition) -> &mut Self {
        self.buildings.push(def);
        self
    }

    pub fn build(self) -> Result<Catalog, CatalogError> {
        let mut resource_index = HashMap::with_capacity(self.resources.len());
        for (slot, def) in self.resources.iter().enumerate() {
            if resource_index.insert(def.id.clone(), slot).is_some() {
                return Err(CatalogError::DuplicateResource(def.id.clone()));
            }
        }

        let mut building_index = HashMap::with_capacity(self.buildings.len());
        for (slot, def) in self.buildings.iter().enumerate() {
            if building_index.insert(def.id.clone(), slot).is_some() {
                return Err(CatalogError::DuplicateBuilding(def.id.clone()));
            }
            if def.cost_growth.is_nan() || def.cost_growth <= 1.0 {
                return Err(CatalogError::InvalidGrowthFactor {
                    building: def.id.clone(),
                    factor: def.cost_growth,
                });
            }
            let referenced = def
                .base_cost
                .keys()
                .chain(def.production.keys())
                .chain(def.consumption.keys());
            for resource in referenced {
                if !resource_index.contains_key(resource) {
                    return Err(CatalogError::UnknownResource {
                        resource: resource.clone(),
                        context: format!("building {}", def.id),
                    });
                }
            }
        }

        Ok(Catalog {
            resources: self.resources,
            resource_index,
            buildings: self.buildings,
            building_index,
        })
    }

    /// Freeze without validation. Only for data known to be consistent.
    fn assemble(self) -> Catalog {
        let resource_index = self
            .resources
            .iter()
            .enumerate()
            .map(|(slot, def)| (def.id.clone(), slot))
            .collect();
        let building_index = self
            .buildings
            .iter()
            .enumerate()
            .map(|(slot, def)| (def.id.clone(), slot))
            .collect();
        Catalog {
            resources: self.resources,
            resource_index,
            buildings: self.buildings,
            building_index,
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Immutable set of resource and building definitions.
#[derive(Debug)]
pub struct Catalog {
    resources: Vec<ResourceDefinition>,
    resource_index: HashMap<ResourceId, usize>,
    buildings: Vec<BuildingDefinition>,
    building_index: HashMap<BuildingId, usize>,
}

impl Catalog {
    /// The stock game data: ore, metal and credits; ore miners and smelters.
    pub fn standard() -> Self {
        Self::standard_builder().assemble()
    }

    fn standard_builder() -> CatalogBuilder {
        let mut b = CatalogBuilder::new();
        b.register_resource(ResourceDefinition {
            id: ResourceId::new("ore"),
            display_name: "Ore".to_string(),
            initial_amount: 0.0,
            initial_capacity: Capacity::Limited(200.0),
        })
        .register_resource(ResourceDefinition {
            id: ResourceId::new("metal"),
            display_name: "Metal".to_string(),
            initial_amount: 0.0,
            initial_capacity: Capacity::Limited(100.0),
        })
        .register_resource(ResourceDefinition {
            id: ResourceId::new("credits"),
            display_name: "Credits".to_string(),
            initial_amount: 100.0,
            initial_capacity: Capacity::Unbounded,
        });

        b.register_building(BuildingDefinition {
            id: BuildingId::new("oreMiner"),
            display_name: "Ore Miner".to_string(),
            description: "Extracts raw ore from the planet surface".to_string(),
            base_cost: CostMap::from([(ResourceId::new("credits"), 10.0)]),
            cost_growth: 1.15,
            production: RateTable::from_pairs(&[("ore", 1.0)]),
            consumption: RateTable::new(),
            footprint: Footprint::default(),
        })
        .register_building(BuildingDefinition {
            id: BuildingId::new("smelter"),
            display_name: "Smelter".to_string(),
            description: "Converts ore into refined metal".to_string(),
            base_cost: CostMap::from([(ResourceId::new("credits"), 50.0)]),
            cost_growth: 1.15,
            production: RateTable::from_pairs(&[("metal", 0.5)]),
            consumption: RateTable::from_pairs(&[("ore", 1.0)]),
            footprint: Footprint::default(),
        });

        b
    }

    pub fn get_definition(&self, id: &str) -> Result<&BuildingDefinition, CatalogError> {
        self.building_index
            .get(id)
            .map(|&slot| &self.buildings[slot])
            .ok_or_else(|| CatalogError::UnknownBuilding(BuildingId::new(id)))
    }

    /// Purchase cost of the next `id` building when `owned` already exist.
    pub fn compute_cost(&self, id: &str, owned: u32) -> Result<CostMap, CatalogError> {
        Ok(self.get_definition(id)?.cost_at(owned))
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceDefinition> {
        self.resource_index.get(id).map(|&slot| &self.resources[slot])
    }

    pub fn has_resource(&self, id: &str) -> bool {
        self.resource_index.contains_key(id)
    }

    pub fn resources(&self) -> impl Iterator<Item = &ResourceDefinition> {
        self.resources.iter()
    }

    pub fn buildings(&self) -> impl Iterator<Item = &BuildingDefinition> {
        self.buildings.iter()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credits(amount: f64) -> CostMap {
        CostMap::from([(ResourceId::new("credits"), amount)])
    }

    #[test]
    fn standard_catalog_passes_validation() {
        assert!(Catalog::standard_builder().build().is_ok());
    }

    #[test]
    fn standard_catalog_builds() {
        let c = Catalog::standard();
        assert_eq!(c.resource_count(), 3);
        assert_eq!(c.building_count(), 2);
        assert!(c.get_definition("oreMiner").is_ok());
        assert!(c.get_definition("smelter").is_ok());
    }

    #[test]
    fn cost_curve_is_geometric_and_floored() {
        let c = Catalog::standard();
        assert_eq!(c.compute_cost("oreMiner", 0).unwrap(), credits(10.0));
        assert_eq!(c.compute_cost("oreMiner", 1).unwrap(), credits(11.0));
        assert_eq!(c.compute_cost("oreMiner", 2).unwrap(), credits(13.0));
        assert_eq!(c.compute_cost("smelter", 5).unwrap(), credits(100.0));
    }

    #[test]
    fn unknown_building_lookup_fails() {
        let c = Catalog::standard();
        match c.compute_cost("market", 0) {
            Err(CatalogError::UnknownBuilding(id)) => assert_eq!(id.as_str(), "market"),
            other => panic!("expected UnknownBuilding, got: {other:?}"),
        }
    }

    #[test]
    fn upgrade_cost_uses_level_power() {
        let c = Catalog::standard();
        let miner = c.get_definition("oreMiner").unwrap();
        assert_eq!(miner.upgrade_cost(1, 1.5), credits(10.0));
        // 10 * 2^1.5 = 28.28...
        assert_eq!(miner.upgrade_cost(2, 1.5), credits(28.0));
        // 10 * 4^1.5 = 80
        assert_eq!(miner.upgrade_cost(4, 1.5), credits(80.0));
    }

    #[test]
    fn rate_table_preserves_declaration_order() {
        let t = RateTable::from_pairs(&[("metal", 1.0), ("ore", 2.0), ("credits", 3.0)]);
        let keys: Vec<_> = t.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["metal", "ore", "credits"]);
        assert_eq!(t.scaled(2.0)[&ResourceId::new("ore")], 4.0);
    }

    #[test]
    fn build_rejects_unknown_resource_reference() {
        let mut b = CatalogBuilder::new();
        b.register_building(BuildingDefinition {
            id: BuildingId::new("pump"),
            display_name: "Pump".to_string(),
            description: String::new(),
            base_cost: CostMap::new(),
            cost_growth: 1.1,
            production: RateTable::from_pairs(&[("water", 1.0)]),
            consumption: RateTable::new(),
            footprint: Footprint::default(),
        });
        let err = b.build().unwrap_err();
        assert!(matches!(err, CatalogError::UnknownResource { .. }));
        assert!(err.to_string().contains("building pump"), "got: {err}");
    }

    #[test]
    fn build_rejects_flat_growth() {
        let c = Catalog::standard();
        let mut miner = c.get_definition("oreMiner").unwrap().clone();
        miner.cost_growth = 1.0;
        let mut b = CatalogBuilder::new();
        for r in c.resources() {
            b.register_resource(r.clone());
        }
        b.register_building(miner);
        assert!(matches!(
            b.build(),
            Err(CatalogError::InvalidGrowthFactor { .. })
        ));
    }

    #[test]
    fn build_rejects_duplicates() {
        let c = Catalog::standard();
        let ore = c.resource("ore").unwrap().clone();
        let mut b = CatalogBuilder::new();
        b.register_resource(ore.clone()).register_resource(ore);
        assert!(matches!(b.build(), Err(CatalogError::DuplicateResource(_))));
    }

    #[test]
    fn empty_catalog_builds() {
        let c = CatalogBuilder::new().build().unwrap();
        assert_eq!(c.resource_count(), 0);
        assert_eq!(c.building_count(), 0);
    }
}
