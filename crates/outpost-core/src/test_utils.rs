//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::catalog::{Catalog, CatalogBuilder};
use crate::config::GameConfig;
use crate::graph::Position;
use crate::id::*;
use crate::ledger::Capacity;
use crate::session::Session;
use std::sync::Arc;

// ===========================================================================
// Catalogs
// ===========================================================================

/// The stock catalog with a replaced `ore` capacity.
pub fn catalog_with_ore_capacity(capacity: Capacity) -> Catalog {
    let stock = Catalog::standard();
    let mut builder = CatalogBuilder::new();
    for res in stock.resources() {
        let mut res = res.clone();
        if res.id.as_str() == "ore" {
            res.initial_capacity = capacity;
        }
        builder.register_resource(res);
    }
    for building in stock.buildings() {
        builder.register_building(building.clone());
    }
    builder.build().expect("stock catalog is valid")
}

// ===========================================================================
// Sessions
// ===========================================================================

pub fn standard_session() -> Session {
    Session::standard()
}

pub fn session_with_catalog(catalog: Catalog) -> Session {
    Session::new(Arc::new(catalog), GameConfig::default())
}

/// Add `amount` of `resource` without going through any game action.
pub fn grant(session: &mut Session, resource: &str, amount: f64) {
    session.ledger.add(resource, amount);
}

/// Set a resource's rate directly, as if the graph had computed it.
pub fn force_rate(session: &mut Session, resource: &str, rate: f64) {
    session.ledger.set_rate(resource, rate);
}

/// Place a building at the origin, panicking on failure.
pub fn place(session: &mut Session, building: &str) -> NodeId {
    session
        .place_node(building, Position::default())
        .expect("placement should succeed")
        .id
}

/// A miner feeding a smelter. Ore is empty, so the smelter starts stalled.
pub fn chain_session() -> Session {
    let mut s = standard_session();
    let miner = s
        .place_node("oreMiner", Position::new(0.0, 0.0))
        .expect("miner affordable");
    let smelter = s
        .place_node("smelter", Position::new(200.0, 0.0))
        .expect("smelter affordable");
    s.try_connect(miner.id, smelter.id)
        .expect("miner feeds smelter");
    s
}

/// `chains` independent miner -> smelter pairs, funded from a grant.
pub fn build_factory(chains: usize) -> Session {
    let mut s = standard_session();
    grant(&mut s, "credits", 1e300);
    s.ledger
        .set_capacity("ore", Capacity::Unbounded)
        .expect("ore exists");
    s.ledger
        .set_capacity("metal", Capacity::Unbounded)
        .expect("metal exists");
    for _ in 0..chains {
        let miner = place(&mut s, "oreMiner");
        let smelter = place(&mut s, "smelter");
        s.try_connect(miner, smelter).expect("miner feeds smelter");
    }
    s
}
