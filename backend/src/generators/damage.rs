//! Damage and shrinkage generator
//!
//! Writes off a category-dependent fraction of available good stock into a
//! damaged location on a regular event-day cadence. During an active
//! shrinkage window at the flagged warehouse the damage rate is multiplied
//! sharply, which is what downstream anomaly detection should find.

use crate::anomalies::SHRINKAGE_MULTIPLIER;
use crate::generators::{pick_base_unit_location, round2, PickingHost};
use crate::models::company::LocationRole;
use crate::models::movement::{MovementKind, MovementLine};
use crate::models::product::Category;
use crate::models::SimulationContext;
use crate::orchestrator::{PickingRequest, SeederError};
use chrono::NaiveDate;

const PRODUCTS_PER_EVENT: (i64, i64) = (1, 3);

/// Per-event damage rate range (fraction of available stock) per category.
fn damage_rate_range(category: Category) -> (f64, f64) {
    match category {
        Category::Seeds | Category::Fertilizer => (0.002, 0.008),
        Category::Pesticides | Category::Packaging => (0.001, 0.004),
        Category::Tools | Category::SpareParts => (0.0005, 0.002),
    }
}

fn event_days(ctx: &SimulationContext, warehouse_code: &str) -> Vec<NaiveDate> {
    let weight = ctx.profiles[warehouse_code].weight;
    let months = ctx.calendar.months() as f64;

    let events = ((months * 4.0 * (0.8 + 0.3 * weight)).round() as usize).max(months as usize);
    let step = (ctx.calendar.len() / events).max(1);
    ctx.calendar.days().iter().copied().step_by(step).collect()
}

fn process_event<H: PickingHost + ?Sized>(
    host: &mut H,
    ctx: &mut SimulationContext,
    wh: &crate::models::Warehouse,
    day: NaiveDate,
) -> Result<(), SeederError> {
    let profile = ctx.profiles[&wh.code].clone();
    if profile.active_products.is_empty() {
        return Ok(());
    }
    let good_loc = pick_base_unit_location(ctx, &wh.code, LocationRole::Good)?;
    let damaged_loc = pick_base_unit_location(ctx, &wh.code, LocationRole::Damaged)?;

    let (min_p, max_p) = PRODUCTS_PER_EVENT;
    let sample_k =
        (ctx.rng.range_inclusive(min_p, max_p) as usize).min(profile.active_products.len());

    for prod in ctx.rng.sample(&profile.active_products, sample_k) {
        let (low, high) = damage_rate_range(prod.category);
        let mut rate = ctx.rng.uniform(low, high);
        let is_shrinkage = ctx.in_shrink_window(day, &wh.code);
        if is_shrinkage {
            rate *= SHRINKAGE_MULTIPLIER;
        }

        let base_stock = host.available(good_loc, prod.product_id).max(0.0);
        let qty = round2(base_stock * rate);
        if qty <= 0.0 {
            continue;
        }

        let note = if is_shrinkage { "damage;shrinkage" } else { "damage" };
        host.submit_picking(
            ctx,
            PickingRequest {
                warehouse_code: wh.code.clone(),
                warehouse_id: wh.warehouse_id,
                kind: MovementKind::Damage,
                day,
                picking_type_id: wh.picking_type_internal_id,
                partner_id: None,
                src_loc: good_loc,
                dst_loc: damaged_loc,
                lines: vec![MovementLine::new(prod, qty)],
                note: note.to_string(),
            },
        )?;
    }
    Ok(())
}

/// Generate all damage/shrinkage write-offs for the company.
pub fn seed_damage<H: PickingHost + ?Sized>(
    host: &mut H,
    ctx: &mut SimulationContext,
) -> Result<(), SeederError> {
    let warehouses = ctx.company.warehouses.clone();
    for wh in &warehouses {
        let days = event_days(ctx, &wh.code);
        for day in days {
            process_event(host, ctx, wh, day)?;
        }
    }
    Ok(())
}
