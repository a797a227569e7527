//! Per-company simulation context
//!
//! Created once per company at the start of a run, mutated throughout, and
//! discarded at the end. Never shared across companies or runs: the RNG
//! stream and the accumulators are ordering-sensitive and single-threaded.

use crate::core::calendar::HorizonCalendar;
use crate::models::company::Company;
use crate::models::movement::{MovementKind, MoveRow, PickingRow};
use crate::models::product::{Category, Product};
use crate::models::profile::WarehouseProfile;
use crate::rng::RngManager;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// All mutable state for one company's simulation.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub company: Company,
    pub calendar: HorizonCalendar,
    pub rng: RngManager,
    /// warehouse code → activity profile, fixed at context build time
    pub profiles: BTreeMap<String, WarehouseProfile>,
    pub vendor_ids_by_category: BTreeMap<Category, Vec<i64>>,

    // Anomaly state, populated by the injector before any generator runs
    pub spike_days: BTreeSet<NaiveDate>,
    pub shrink_window: BTreeSet<NaiveDate>,
    pub shrink_wh_code: Option<String>,
    pub stockout_window: BTreeSet<NaiveDate>,
    pub stockout_products: Vec<Product>,
    pub supplier_delay_window: Option<(NaiveDate, NaiveDate)>,

    // Accumulators
    pub picking_rows: Vec<PickingRow>,
    pub move_rows: Vec<MoveRow>,
    /// e.g. "OUT", "OUT:existing", "OUT:skipped_no_stock", "IN:failed"
    pub picking_counts: BTreeMap<String, u64>,
    pub outbound_qty_by_sku: BTreeMap<String, f64>,
    seq_counter: BTreeMap<(String, &'static str, NaiveDate), u32>,
}

impl SimulationContext {
    pub fn new(
        company: Company,
        calendar: HorizonCalendar,
        rng: RngManager,
        profiles: BTreeMap<String, WarehouseProfile>,
        vendor_ids_by_category: BTreeMap<Category, Vec<i64>>,
    ) -> Self {
        Self {
            company,
            calendar,
            rng,
            profiles,
            vendor_ids_by_category,
            spike_days: BTreeSet::new(),
            shrink_window: BTreeSet::new(),
            shrink_wh_code: None,
            stockout_window: BTreeSet::new(),
            stockout_products: Vec::new(),
            supplier_delay_window: None,
            picking_rows: Vec::new(),
            move_rows: Vec::new(),
            picking_counts: BTreeMap::new(),
            outbound_qty_by_sku: BTreeMap::new(),
            seq_counter: BTreeMap::new(),
        }
    }

    /// Next sequence number for (warehouse, kind, day), starting at 1.
    /// Feeds the deterministic origin key.
    pub fn next_seq(&mut self, warehouse_code: &str, kind: MovementKind, day: NaiveDate) -> u32 {
        let counter = self
            .seq_counter
            .entry((warehouse_code.to_string(), kind.code(), day))
            .or_insert(0);
        *counter += 1;
        *counter
    }

    /// Increment an outcome counter.
    pub fn bump(&mut self, key: String) {
        *self.picking_counts.entry(key).or_insert(0) += 1;
    }

    pub fn is_spike_day(&self, day: NaiveDate) -> bool {
        self.spike_days.contains(&day)
    }

    pub fn in_stockout_window(&self, day: NaiveDate) -> bool {
        self.stockout_window.contains(&day)
    }

    pub fn is_stockout_product(&self, product_id: i64) -> bool {
        self.stockout_products
            .iter()
            .any(|p| p.product_id == product_id)
    }

    pub fn in_shrink_window(&self, day: NaiveDate, warehouse_code: &str) -> bool {
        self.shrink_window.contains(&day)
            && self.shrink_wh_code.as_deref() == Some(warehouse_code)
    }

    pub fn in_supplier_delay_window(&self, day: NaiveDate) -> bool {
        match self.supplier_delay_window {
            Some((start, end)) => day >= start && day <= end,
            None => false,
        }
    }
}
