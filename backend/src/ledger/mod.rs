//! Stock ledger
//!
//! Authoritative in-memory quantity state, keyed by (location, product).
//! The ledger is advisory for availability decisions: generators query it
//! before proposing outbound/internal/damage quantities, but the
//! orchestrator is the only writer and touches it only after an operation is
//! confirmed with the external system (or immediately in dry-run mode).
//!
//! # Critical Invariants
//!
//! 1. `add` accepts any delta, including ones producing transient negatives
//!    during out-of-order replay of existing operations.
//! 2. Non-negativity is guaranteed by the orchestrator's partial-fulfillment
//!    cap, not here.
//! 3. Single-threaded, single-writer-per-company usage; no locking.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// In-memory (location, product) → quantity map.
///
/// # Example
/// ```
/// use inventory_seeder_core_rs::StockLedger;
///
/// let mut ledger = StockLedger::new();
/// ledger.add(101, 7, 250.0);
/// ledger.add(101, 7, -30.5);
/// assert_eq!(ledger.get(101, 7), 219.5);
/// assert_eq!(ledger.get(101, 8), 0.0);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockLedger {
    qty: HashMap<(i64, i64), f64>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjust the quantity at (location, product) by `delta`. No validation.
    pub fn add(&mut self, location_id: i64, product_id: i64, delta: f64) {
        *self.qty.entry((location_id, product_id)).or_insert(0.0) += delta;
    }

    /// Current quantity at (location, product); 0.0 for unseen keys.
    pub fn get(&self, location_id: i64, product_id: i64) -> f64 {
        self.qty.get(&(location_id, product_id)).copied().unwrap_or(0.0)
    }

    /// Iterate over all (location, product, quantity) entries.
    pub fn entries(&self) -> impl Iterator<Item = (i64, i64, f64)> + '_ {
        self.qty.iter().map(|(&(loc, prod), &q)| (loc, prod, q))
    }

    /// Total positive stock per product across all locations.
    /// Used for days-of-cover estimation at the end of a run.
    pub fn ending_stock_by_product(&self) -> HashMap<i64, f64> {
        let mut ending: HashMap<i64, f64> = HashMap::new();
        for (_, product_id, qty) in self.entries() {
            if qty > 0.0 {
                *ending.entry(product_id).or_insert(0.0) += qty;
            }
        }
        ending
    }
}
