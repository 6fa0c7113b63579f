//! Cross-crate idle-game scenarios: data files -> session -> save -> reload.
//!
//! The stock data directory shipped with `outpost-data` must describe exactly
//! the built-in catalog, in every supported format.

use outpost_core::catalog::Catalog;
use outpost_core::config::GameConfig;
use outpost_core::graph::Position;
use outpost_core::serialize::SaveSnapshot;
use outpost_core::session::Session;
use outpost_core::test_utils::*;
use outpost_data::{load_game_data, DataLoadError};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MINUTE: u64 = 60_000;
const HOUR: u64 = 60 * MINUTE;

fn stock_data_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../outpost-data/data")
}

fn make_test_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "outpost_integration_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn assert_same_catalog(a: &Catalog, b: &Catalog) {
    let ra: Vec<_> = a.resources().collect();
    let rb: Vec<_> = b.resources().collect();
    assert_eq!(ra, rb);
    let ba: Vec<_> = a.buildings().collect();
    let bb: Vec<_> = b.buildings().collect();
    assert_eq!(ba, bb);
}

// ===========================================================================
// Data files
// ===========================================================================

#[test]
fn stock_ron_data_matches_builtin_catalog() {
    let data = load_game_data(&stock_data_dir()).unwrap();
    assert_same_catalog(&data.catalog, &Catalog::standard());
    assert_eq!(data.config, GameConfig::default());
}

#[test]
fn json_data_matches_builtin_catalog() {
    let dir = make_test_dir("json");
    fs::write(
        dir.join("resources.json"),
        r#"[
            { "id": "ore", "name": "Ore", "capacity": 200 },
            { "id": "metal", "name": "Metal", "capacity": 100 },
            { "id": "credits", "name": "Credits", "initial": 100 }
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.join("buildings.json"),
        r#"[
            { "id": "oreMiner", "name": "Ore Miner",
              "description": "Extracts raw ore from the planet surface",
              "cost": [["credits", 10]], "cost_growth": 1.15,
              "produces": [["ore", 1.0]] },
            { "id": "smelter", "name": "Smelter",
              "description": "Converts ore into refined metal",
              "cost": [["credits", 50]], "cost_growth": 1.15,
              "produces": [["metal", 0.5]], "consumes": [["ore", 1.0]] }
        ]"#,
    )
    .unwrap();

    let data = load_game_data(&dir).unwrap();
    assert_same_catalog(&data.catalog, &Catalog::standard());
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn toml_data_matches_builtin_catalog() {
    let dir = make_test_dir("toml");
    fs::write(
        dir.join("resources.toml"),
        r#"
[[resources]]
id = "ore"
name = "Ore"
capacity = 200.0

[[resources]]
id = "metal"
name = "Metal"
capacity = 100.0

[[resources]]
id = "credits"
name = "Credits"
initial = 100.0
"#,
    )
    .unwrap();
    fs::write(
        dir.join("buildings.toml"),
        r#"
[[buildings]]
id = "oreMiner"
name = "Ore Miner"
description = "Extracts raw ore from the planet surface"
cost = [["credits", 10.0]]
cost_growth = 1.15
produces = [["ore", 1.0]]

[[buildings]]
id = "smelter"
name = "Smelter"
description = "Converts ore into refined metal"
cost = [["credits", 50.0]]
cost_growth = 1.15
produces = [["metal", 0.5]]
consumes = [["ore", 1.0]]
"#,
    )
    .unwrap();
    fs::write(dir.join("config.toml"), "max_offline_ms = 3600000\n").unwrap();

    let data = load_game_data(&dir).unwrap();
    assert_same_catalog(&data.catalog, &Catalog::standard());
    assert_eq!(data.config.max_offline_ms, HOUR);
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn conflicting_data_formats_rejected() {
    let dir = make_test_dir("conflict");
    fs::write(dir.join("resources.ron"), "[]").unwrap();
    fs::write(dir.join("resources.json"), "[]").unwrap();
    fs::write(dir.join("buildings.ron"), "[]").unwrap();
    assert!(matches!(
        load_game_data(&dir),
        Err(DataLoadError::ConflictingFormats { .. })
    ));
    let _ = fs::remove_dir_all(&dir);
}

// ===========================================================================
// Play sessions
// ===========================================================================

/// Buy the cheapest affordable building, alternating miners and smelters,
/// and wire every miner to every smelter.
fn expand(session: &mut Session) {
    let miners = session.building_count("oreMiner");
    let smelters = session.building_count("smelter");
    let building = if miners <= smelters * 2 { "oreMiner" } else { "smelter" };
    let Ok(node) = session.place_node(building, Position::default()) else {
        return;
    };
    let others: Vec<_> = session
        .graph()
        .nodes()
        .filter(|n| n.id != node.id)
        .map(|n| n.id)
        .collect();
    for other in others {
        let _ = session.try_connect(node.id, other);
        let _ = session.try_connect(other, node.id);
    }
}

#[test]
fn factory_grows_from_market_income() {
    let data = load_game_data(&stock_data_dir()).unwrap();
    let mut session = Session::new(Arc::new(data.catalog), data.config);

    for minute in 0..60 {
        for _ in 0..60 {
            session.tick(1.0);
        }
        let _ = session.sell_all("metal");
        if minute % 2 == 0 {
            let _ = session.sell_all("ore");
        }
        expand(&mut session);
    }

    assert!(session.building_count("oreMiner") >= 3);
    assert!(session.building_count("smelter") >= 1);
    assert!(session.graph().connection_count() >= 1);
    for res in session.ledger().iter() {
        assert!(res.current() >= 0.0 && res.current() <= res.capacity().limit());
    }
}

#[test]
fn save_reload_offline_then_continue() {
    let mut session = chain_session();
    grant(&mut session, "credits", 500.0);
    session.upgrade_capacity("metal").unwrap();
    for _ in 0..10 {
        session.tick(1.0);
    }

    let text = session.save_snapshot_at(HOUR).to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["capacityUpgrades"]["metal"], 1);

    let mut loaded = Session::load_or_fresh(
        session.catalog().clone(),
        session.config().clone(),
        Some(&text),
    );
    assert_eq!(loaded.capacity_upgrades("metal"), 1);
    assert_eq!(
        loaded.ledger().resource("metal").unwrap().capacity().limit(),
        1100.0
    );

    let summary = loaded
        .calculate_offline_progress(HOUR + 20 * MINUTE)
        .unwrap()
        .unwrap();
    // Smelter runs at half a metal per second for 20 minutes.
    assert_eq!(summary.gain("metal"), 600.0);

    let metal_before = loaded.ledger().amount("metal");
    loaded.tick(1.0);
    assert_eq!(loaded.ledger().amount("metal"), metal_before + 0.5);
}

#[test]
fn legacy_save_with_markets_loads() {
    let legacy = serde_json::json!({
        "version": 2,
        "timestamp": 0,
        "windows": [],
        "appData": {
            "factory": {
                "version": 1,
                "timestamp": HOUR,
                "resources": {
                    "ore": { "current": 10, "capacity": 200 },
                    "metal": { "current": 0, "capacity": 100 },
                    "credits": { "current": 5, "capacity": null }
                },
                "canvas": {
                    "nodes": [
                        { "id": "node_1_1", "buildingType": "oreMiner", "x": 0, "y": 0,
                          "level": 1, "inputs": [], "outputs": ["node_2_2", "node_3_3"] },
                        { "id": "node_2_2", "buildingType": "smelter", "x": 200, "y": 0,
                          "level": 1, "inputs": ["node_1_1"], "outputs": [] },
                        { "id": "node_3_3", "buildingType": "market", "x": 400, "y": 0,
                          "level": 1, "inputs": ["node_1_1"], "outputs": [] }
                    ],
                    "connections": [
                        { "id": "conn_a", "fromNodeId": "node_1_1", "toNodeId": "node_2_2",
                          "resourceType": "ore" },
                        { "id": "conn_b", "fromNodeId": "node_1_1", "toNodeId": "node_3_3",
                          "resourceType": "ore" }
                    ]
                },
                "buildingCounts": { "oreMiner": 1, "smelter": 1, "market": 1 }
            }
        }
    })
    .to_string();

    let snapshot = SaveSnapshot::from_json(&legacy).unwrap();
    let mut session = Session::from_snapshot(
        Arc::new(Catalog::standard()),
        GameConfig::default(),
        &snapshot,
    )
    .unwrap();
    assert_eq!(session.graph().node_count(), 2);
    assert_eq!(session.graph().connection_count(), 1);
    assert_eq!(session.building_count("smelter"), 1);
    assert_eq!(session.ledger().amount("credits"), 5.0);
    assert_eq!(session.loaded_at_ms(), Some(HOUR));

    // Ore 10 on hand, so the smelter is running after load.
    assert_eq!(session.graph().stalled_count(), 0);
    let summary = session
        .calculate_offline_progress(HOUR + 10 * MINUTE)
        .unwrap()
        .unwrap();
    assert_eq!(summary.gain("metal"), 100.0);
}
