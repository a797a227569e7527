//! Movement generators
//!
//! Four independent generators (inbound, internal, damage, outbound) that
//! enumerate per-day, per-warehouse operations and submit them through a
//! [`PickingHost`]. Each generator sees only the narrow host capability
//! surface plus the mutable simulation context; the engine behind the host
//! owns the ledger and the gateway.
//!
//! # Critical Invariants
//!
//! 1. All randomness flows through `ctx.rng`; generators never create their
//!    own entropy source.
//! 2. Ledger queries go through the host; generators never mutate stock
//!    directly.

pub mod damage;
pub mod inbound;
pub mod internal;
pub mod outbound;

use crate::models::anomaly::AnomalyEvent;
use crate::models::company::LocationRole;
use crate::models::SimulationContext;
use crate::orchestrator::{PickingRequest, SeederError, SubmitOutcome};

/// Capability surface a generator needs from the engine.
pub trait PickingHost {
    /// Current ledger quantity at (location, product).
    fn available(&self, location_id: i64, product_id: i64) -> f64;

    /// Run one operation through the idempotent create/validate protocol.
    fn submit_picking(
        &mut self,
        ctx: &mut SimulationContext,
        req: PickingRequest,
    ) -> Result<SubmitOutcome, SeederError>;

    /// Record an anomaly observed while generating (e.g. a delayed receipt).
    fn record_anomaly(&mut self, event: AnomalyEvent);
}

/// Pick one location of the given role at a warehouse, uniformly at random.
pub fn pick_base_unit_location(
    ctx: &mut SimulationContext,
    warehouse_code: &str,
    role: LocationRole,
) -> Result<i64, SeederError> {
    let candidates = ctx.company.locations_for(warehouse_code, role);
    if candidates.is_empty() {
        return Err(SeederError::MissingLocations {
            warehouse: warehouse_code.to_string(),
            role,
        });
    }
    Ok(*ctx.rng.choose(&candidates))
}

/// Good locations at a warehouse holding stock of `product_id`, in random
/// order. Empty when the product is out of stock everywhere.
pub fn available_locations_for_product<H: PickingHost + ?Sized>(
    host: &H,
    ctx: &mut SimulationContext,
    warehouse_code: &str,
    product_id: i64,
) -> Vec<i64> {
    let mut good = ctx.company.locations_for(warehouse_code, LocationRole::Good);
    ctx.rng.shuffle(&mut good);
    good.into_iter()
        .filter(|&loc| host.available(loc, product_id) > 0.01)
        .collect()
}

/// Quantities are reported with two decimal places.
pub(crate) fn round2(qty: f64) -> f64 {
    (qty * 100.0).round() / 100.0
}
