//! The resource ledger: one global pool of every resource in a session.
//!
//! Each resource carries a stored amount, a capacity and the net rate the
//! production graph computed on the most recent tick. All mutation paths clamp
//! the stored amount into `[0, capacity]`.

use crate::catalog::{Catalog, ResourceDefinition};
use crate::id::ResourceId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A bill of resources, e.g. a building's purchase cost.
pub type CostMap = BTreeMap<ResourceId, f64>;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("unknown resource: {0}")]
    UnknownResource(ResourceId),
}

// ---------------------------------------------------------------------------
// Capacity
// ---------------------------------------------------------------------------

/// Storage limit of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Capacity {
    Limited(f64),
    Unbounded,
}

impl Capacity {
    /// `None` means unbounded. This mirrors the persisted form, where an
    /// unbounded capacity is written as `null`.
    pub fn from_option(limit: Option<f64>) -> Self {
        match limit {
            Some(limit) if limit.is_finite() => Capacity::Limited(limit),
            _ => Capacity::Unbounded,
        }
    }

    pub fn as_option(self) -> Option<f64> {
        match self {
            Capacity::Limited(limit) => Some(limit),
            Capacity::Unbounded => None,
        }
    }

    /// The limit as a float; `f64::INFINITY` when unbounded.
    pub fn limit(self) -> f64 {
        match self {
            Capacity::Limited(limit) => limit,
            Capacity::Unbounded => f64::INFINITY,
        }
    }

    /// Room left above `current`, never negative.
    pub fn headroom(self, current: f64) -> f64 {
        (self.limit() - current).max(0.0)
    }

    pub fn is_unbounded(self) -> bool {
        matches!(self, Capacity::Unbounded)
    }
}

// ---------------------------------------------------------------------------
// ResourceState
// ---------------------------------------------------------------------------

/// Live state of a single resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState {
    pub id: ResourceId,
    pub display_name: String,
    current: f64,
    capacity: Capacity,
    /// Net rate per second, recomputed every tick.
    rate: f64,
}

impl ResourceState {
    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Fill ratio in `[0, 1]`, or `None` for unbounded resources.
    pub fn fill_ratio(&self) -> Option<f64> {
        match self.capacity {
            Capacity::Limited(limit) if limit > 0.0 => Some(self.current / limit),
            Capacity::Limited(_) => Some(1.0),
            Capacity::Unbounded => None,
        }
    }

    /// Apply a signed delta, clamped into `[0, capacity]`. Returns the change
    /// actually applied.
    fn apply_delta(&mut self, delta: f64) -> f64 {
        if !delta.is_finite() {
            return 0.0;
        }
        let before = self.current;
        self.current = (self.current + delta).min(self.capacity.limit()).max(0.0);
        self.current - before
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

fn is_valid_amount(amount: f64) -> bool {
    amount >= 0.0 && amount.is_finite()
}

/// Global resource pool. Iteration follows catalog declaration order.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    resources: Vec<ResourceState>,
    index: HashMap<ResourceId, usize>,
}

impl Ledger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger holding every resource of the catalog at its initial
    /// amount and capacity.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut ledger = Self::new();
        for def in catalog.resources() {
            ledger.insert(def);
        }
        ledger
    }

    /// Register a resource from its definition. Re-registering an id resets it.
    pub fn insert(&mut self, def: &ResourceDefinition) {
        let state = ResourceState {
            id: def.id.clone(),
            display_name: def.display_name.clone(),
            current: 0.0,
            capacity: def.initial_capacity,
            rate: 0.0,
        };
        let slot = match self.index.get(def.id.as_str()) {
            Some(&slot) => {
                self.resources[slot] = state;
                slot
            }
            None => {
                self.resources.push(state);
                let slot = self.resources.len() - 1;
                self.index.insert(def.id.clone(), slot);
                slot
            }
        };
        self.resources[slot].apply_delta(def.initial_amount);
    }

    fn slot(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    fn slot_or_log(&self, id: &str, op: &'static str) -> Option<usize> {
        let slot = self.slot(id);
        if slot.is_none() {
            tracing::error!(resource = id, op, "unknown resource id");
        }
        slot
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn resource(&self, id: &str) -> Result<&ResourceState, LedgerError> {
        self.slot(id)
            .map(|slot| &self.resources[slot])
            .ok_or_else(|| LedgerError::UnknownResource(ResourceId::new(id)))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Stored amount, `0.0` for unknown ids.
    pub fn amount(&self, id: &str) -> f64 {
        self.slot(id).map(|slot| self.resources[slot].current).unwrap_or(0.0)
    }

    /// Net rate from the last tick, `0.0` for unknown ids.
    pub fn rate(&self, id: &str) -> f64 {
        self.slot(id).map(|slot| self.resources[slot].rate).unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceState> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Add `amount`, clamped to capacity. Returns the amount actually added.
    pub fn add(&mut self, id: &str, amount: f64) -> f64 {
        match self.slot_or_log(id, "add") {
            Some(slot) => self.resources[slot].apply_delta(amount),
            None => 0.0,
        }
    }

    /// Remove `amount`. Fails without mutating when the stored amount is short
    /// or `amount` is negative or NaN.
    pub fn remove(&mut self, id: &str, amount: f64) -> bool {
        let Some(slot) = self.slot_or_log(id, "remove") else {
            return false;
        };
        let res = &mut self.resources[slot];
        if !is_valid_amount(amount) || res.current < amount {
            return false;
        }
        res.current = (res.current - amount).max(0.0);
        true
    }

    /// True iff every entry of `cost` is covered. Unknown resources and
    /// negative or NaN entries are never affordable.
    pub fn can_afford(&self, cost: &CostMap) -> bool {
        cost.iter().all(|(id, &amount)| {
            is_valid_amount(amount)
                && self
                    .slot(id.as_str())
                    .is_some_and(|slot| self.resources[slot].current >= amount)
        })
    }

    /// Deduct every entry of `cost`, or nothing at all.
    pub fn spend(&mut self, cost: &CostMap) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for (id, &amount) in cost {
            self.remove(id.as_str(), amount);
        }
        true
    }

    pub fn set_rate(&mut self, id: &str, rate: f64) {
        if let Some(slot) = self.slot_or_log(id, "set_rate") {
            self.resources[slot].rate = rate;
        }
    }

    pub(crate) fn adjust_rate(&mut self, id: &str, delta: f64) {
        if let Some(slot) = self.slot_or_log(id, "adjust_rate") {
            self.resources[slot].rate += delta;
        }
    }

    pub fn reset_rates(&mut self) {
        for res in &mut self.resources {
            res.rate = 0.0;
        }
    }

    /// Advance every resource with a nonzero rate by `rate * dt`.
    ///
    /// Gains are capacity-clamped, so a full resource silently loses its
    /// production. Drains floor at zero.
    pub fn apply_rates_over_interval(&mut self, dt: f64) {
        for res in &mut self.resources {
            if res.rate != 0.0 {
                res.apply_delta(res.rate * dt);
            }
        }
    }

    /// Replace a resource's capacity. The stored amount is clamped down if it
    /// no longer fits.
    pub fn set_capacity(&mut self, id: &str, capacity: Capacity) -> Result<(), LedgerError> {
        let slot = self
            .slot(id)
            .ok_or_else(|| LedgerError::UnknownResource(ResourceId::new(id)))?;
        let res = &mut self.resources[slot];
        res.capacity = capacity;
        res.current = res.current.min(capacity.limit());
        Ok(())
    }

    /// Overwrite amount and capacity, e.g. when restoring a save. The amount is
    /// clamped into the new bounds.
    pub(crate) fn restore(
        &mut self,
        id: &str,
        current: f64,
        capacity: Capacity,
    ) -> Result<(), LedgerError> {
        self.set_capacity(id, capacity)?;
        let slot = self
            .slot(id)
            .ok_or_else(|| LedgerError::UnknownResource(ResourceId::new(id)))?;
        let res = &mut self.resources[slot];
        res.current = if current.is_finite() {
            current.clamp(0.0, capacity.limit())
        } else {
            0.0
        };
        Ok(())
    }
}
