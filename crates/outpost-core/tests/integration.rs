//! End-to-end scenarios through the public session API.

use outpost_core::graph::{GraphError, Position};
use outpost_core::ledger::Capacity;
use outpost_core::offline::OfflineError;
use outpost_core::serialize::SaveSnapshot;
use outpost_core::session::{ActionError, Session};
use outpost_core::test_utils::*;
use std::sync::Arc;

const MINUTE: u64 = 60_000;
const HOUR: u64 = 60 * MINUTE;

// ===========================================================================
// Economy
// ===========================================================================

#[test]
fn first_miner_costs_ten_then_eleven() {
    let mut s = standard_session();
    s.place_node("oreMiner", Position::default()).unwrap();
    assert_eq!(s.ledger().amount("credits"), 90.0);
    s.place_node("oreMiner", Position::default()).unwrap();
    assert_eq!(s.ledger().amount("credits"), 79.0);
}

#[test]
fn demolishing_makes_next_building_cheaper() {
    let mut s = standard_session();
    let a = place(&mut s, "oreMiner");
    place(&mut s, "oreMiner");
    let before = s.next_cost("oreMiner").unwrap();
    s.remove_node(a).unwrap();
    let after = s.next_cost("oreMiner").unwrap();
    assert!(after["credits"] < before["credits"]);
}

#[test]
fn failed_purchase_is_atomic() {
    let mut s = standard_session();
    grant(&mut s, "credits", -100.0);
    assert_eq!(s.ledger().amount("credits"), 0.0);
    let err = s.place_node("oreMiner", Position::default()).unwrap_err();
    assert!(matches!(err, ActionError::InsufficientFunds { .. }));
    assert_eq!(s.graph().node_count(), 0);
    assert_eq!(s.building_count("oreMiner"), 0);
}

// ===========================================================================
// Production
// ===========================================================================

#[test]
fn miners_sold_through_market_fund_more_miners() {
    let mut s = standard_session();
    for _ in 0..5 {
        place(&mut s, "oreMiner");
    }
    for _ in 0..40 {
        s.tick(1.0);
    }
    assert!((s.ledger().amount("ore") - 200.0).abs() < 1e-9);

    let sale = s.sell_all("ore").unwrap();
    assert_eq!(sale.earned, 100.0);
    assert!(s.place_node("oreMiner", Position::default()).is_ok());
}

#[test]
fn smelter_chain_produces_metal_steadily() {
    let mut s = chain_session();
    for _ in 0..21 {
        s.tick(1.0);
    }
    // One warm-up tick, then 20 ticks at half a metal per second.
    assert!((s.ledger().amount("metal") - 10.0).abs() < 1e-9);
    assert!((s.ledger().amount("ore") - 1.0).abs() < 1e-9);
}

#[test]
fn upgraded_miner_outruns_smelter() {
    let mut s = chain_session();
    grant(&mut s, "credits", 100.0);
    let miner = s.graph().nodes().find(|n| n.building.as_str() == "oreMiner").unwrap().id;
    s.upgrade_node(miner).unwrap();
    s.tick(1.0);
    s.tick(1.0);
    assert_eq!(s.ledger().rate("ore"), 1.0);
    assert_eq!(s.ledger().rate("metal"), 0.5);
}

#[test]
fn connection_rules() {
    let mut s = standard_session();
    grant(&mut s, "credits", 1_000.0);
    let m1 = place(&mut s, "oreMiner");
    let m2 = place(&mut s, "oreMiner");
    let sm = place(&mut s, "smelter");

    assert!(matches!(s.try_connect(m1, m2), Err(GraphError::IncompatibleNodes { .. })));
    assert!(matches!(s.try_connect(sm, sm), Err(GraphError::SelfConnection(_))));
    let conn = s.try_connect(m1, sm).unwrap();
    assert_eq!(conn.resource.as_str(), "ore");
    assert!(matches!(
        s.try_connect(m1, sm),
        Err(GraphError::DuplicateConnection { .. })
    ));
    s.try_connect(m2, sm).unwrap();
    assert_eq!(s.graph().node(sm).unwrap().inputs().len(), 2);

    s.delete_connection(conn.id).unwrap();
    assert_eq!(s.graph().node(sm).unwrap().inputs().len(), 1);
}

// ===========================================================================
// Save, load and offline progress
// ===========================================================================

#[test]
fn save_load_offline_round() {
    let mut s = chain_session();
    s.tick(1.0);
    let text = s.save_snapshot_at(10 * HOUR).to_json().unwrap();

    let mut loaded = Session::load_or_fresh(s.catalog().clone(), s.config().clone(), Some(&text));
    // Ore 1 on hand, so the smelter runs after load: ore net 0, metal +0.5.
    assert_eq!(loaded.ledger().rate("metal"), 0.5);

    let summary = loaded
        .calculate_offline_progress(10 * HOUR + 30 * MINUTE)
        .unwrap()
        .unwrap();
    assert_eq!(summary.effective_ms, 30 * MINUTE);
    assert!(!summary.was_capped);
    assert_eq!(summary.gain("metal"), 100.0);
    assert_eq!(summary.gain("ore"), 0.0);
    assert_eq!(loaded.ledger().amount("metal"), 100.0);

    assert_eq!(
        loaded.calculate_offline_progress(11 * HOUR),
        Err(OfflineError::AlreadyApplied)
    );
}

#[test]
fn offline_cap_with_open_storage() {
    let mut s = session_with_catalog(catalog_with_ore_capacity(Capacity::Unbounded));
    place(&mut s, "oreMiner");
    let snapshot = s.save_snapshot_at(0);
    let mut loaded =
        Session::from_snapshot(s.catalog().clone(), s.config().clone(), &snapshot).unwrap();
    let summary = loaded.calculate_offline_progress(24 * HOUR).unwrap().unwrap();
    assert!(summary.was_capped);
    assert_eq!(summary.gain("ore"), 7200.0);
}

#[test]
fn short_absence_gives_nothing() {
    let mut s = chain_session();
    let text = s.save_snapshot_at(HOUR).to_json().unwrap();
    s.load_from_snapshot(&SaveSnapshot::from_json(&text).unwrap())
        .unwrap();
    assert_eq!(s.calculate_offline_progress(HOUR + 59_999), Ok(None));
}

#[test]
fn corrupt_save_starts_fresh() {
    let catalog = Arc::new(outpost_core::catalog::Catalog::standard());
    let s = Session::load_or_fresh(
        catalog,
        Default::default(),
        Some(r#"{"version":2,"timestamp":0,"nodes":[{"id":1}]}"#),
    );
    assert_eq!(s.graph().node_count(), 0);
    assert_eq!(s.ledger().amount("credits"), 100.0);
}
