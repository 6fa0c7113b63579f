//! Outpost Core -- the simulation core of an idle factory game.
//!
//! Players buy buildings, wire producers to consumers and let resources pile
//! up over time, including while the game is closed.
//!
//! # Tick
//!
//! Each call to [`session::Session::tick`] advances the game by `dt` seconds:
//!
//! 1. **Evaluate** -- every ledger rate is reset, then each node is checked
//!    for eligibility. A consumer runs only if every resource it consumes is
//!    produced by at least one of its input nodes and the ledger holds one
//!    second of its consumption. Running nodes add their scaled rates.
//! 2. **Apply** -- every nonzero rate is applied for `dt`, clamped into
//!    `[0, capacity]`.
//!
//! Resources live in one pooled [`ledger::Ledger`]; connections gate whether
//! a consumer may run, they do not carry items.
//!
//! # Key Types
//!
//! - [`session::Session`] -- owns the ledger, the graph and building counts,
//!   and exposes every player action.
//! - [`catalog::Catalog`] -- immutable resource and building definitions,
//!   built and validated through [`catalog::CatalogBuilder`].
//! - [`graph::ProductionGraph`] -- placed nodes and directed connections.
//! - [`offline::reconcile`] -- credits production for time spent away.
//! - [`serialize::SaveSnapshot`] -- versioned JSON save document.

pub mod catalog;
pub mod config;
pub mod display;
pub mod graph;
pub mod id;
pub mod ledger;
pub mod market;
pub mod migration;
pub mod offline;
pub mod serialize;
pub mod session;
pub mod sim;
pub mod warehouse;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
