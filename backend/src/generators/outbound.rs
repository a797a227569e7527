//! Outbound shipment generator
//!
//! The demand side of the simulation: per warehouse and day, decide how many
//! customer shipments happen (low-activity weekdays are usually skipped
//! entirely), then build each shipment from demand intensity, category base
//! rates, the warehouse weight, and a random order-size multiplier. Spike
//! days multiply demand; a controlled stockout inflates requested quantities
//! past availability so the partial-fulfillment cap produces visible
//! backorders.

use crate::anomalies::{SPIKE_MULTIPLIER, STOCKOUT_DEMAND_MULTIPLIER};
use crate::demand::{demand_intensity, weekday_multiplier};
use crate::generators::{
    available_locations_for_product, pick_base_unit_location, round2, PickingHost,
};
use crate::models::company::{LocationRole, Warehouse};
use crate::models::movement::{MovementKind, MovementLine};
use crate::models::product::Category;
use crate::models::SimulationContext;
use crate::orchestrator::{PickingRequest, SeederError};
use chrono::NaiveDate;

/// Daily demand base rate per category (units before all multipliers).
fn base_rate(category: Category) -> f64 {
    match category {
        Category::Seeds => 18.0,
        Category::Fertilizer => 22.0,
        Category::Pesticides => 2.8,
        Category::Tools => 0.45,
        Category::SpareParts => 0.35,
        Category::Packaging => 6.0,
    }
}

/// Random order-size multiplier range per category.
fn order_size_multiplier(category: Category) -> (f64, f64) {
    match category {
        Category::Seeds | Category::Fertilizer => (5.0, 18.0),
        Category::Pesticides => (1.0, 6.0),
        Category::Packaging => (1.0, 5.0),
        Category::Tools | Category::SpareParts => (1.0, 4.0),
    }
}

/// Shipments for this warehouse today. Low-multiplier days are skipped with
/// probability 0.75; heavier warehouses occasionally ship twice.
fn picking_count(ctx: &mut SimulationContext, weight: f64, day: NaiveDate) -> usize {
    if weekday_multiplier(MovementKind::Outbound, day) < 0.35 && ctx.rng.chance(0.75) {
        return 0;
    }
    let mut count = usize::from(ctx.rng.chance((0.45 + 0.25 * weight).min(0.85)));
    if weight > 1.2 && ctx.rng.chance(0.25) {
        count += 1;
    }
    count
}

fn generate_lines(
    ctx: &mut SimulationContext,
    warehouse_code: &str,
    day: NaiveDate,
    spike_mult: f64,
) -> (Vec<MovementLine>, bool) {
    let profile = ctx.profiles[warehouse_code].clone();
    let weight = profile.weight;
    let line_n = ctx.rng.range_inclusive(2, 7) as usize;
    let sampled = ctx
        .rng
        .sample(&profile.active_products, line_n.min(profile.active_products.len()));

    let country = ctx.company.country_code.clone();
    let mut stockout_pressure = false;
    let mut lines = Vec::with_capacity(sampled.len());
    for prod in sampled {
        let intensity = demand_intensity(&country, prod.category, day, &mut ctx.rng) * spike_mult;
        let mut qty = base_rate(prod.category) * intensity * weight;

        let (low, high) = order_size_multiplier(prod.category);
        qty *= ctx.rng.uniform(low, high);

        if ctx.in_stockout_window(day) && ctx.is_stockout_product(prod.product_id) {
            qty *= STOCKOUT_DEMAND_MULTIPLIER;
            stockout_pressure = true;
        }

        let qty = round2(qty.max(0.0));
        if qty <= 0.0 {
            continue;
        }
        lines.push(MovementLine::new(prod, qty));
    }
    (lines, stockout_pressure)
}

fn post_picking<H: PickingHost + ?Sized>(
    host: &mut H,
    ctx: &mut SimulationContext,
    wh: &Warehouse,
    day: NaiveDate,
    customer_loc_id: i64,
    lines: Vec<MovementLine>,
    stockout_pressure: bool,
) -> Result<(), SeederError> {
    // Ship from the first location holding stock of any requested product;
    // fall back to an arbitrary good location when nothing is available.
    let mut candidate_srcs = Vec::new();
    for line in &lines {
        candidate_srcs.extend(available_locations_for_product(
            host,
            ctx,
            &wh.code,
            line.product.product_id,
        ));
    }
    let src_loc = match candidate_srcs.first() {
        Some(&loc) => loc,
        None => pick_base_unit_location(ctx, &wh.code, LocationRole::Good)?,
    };

    let in_window = ctx.in_stockout_window(day);
    let mut filtered = Vec::with_capacity(lines.len());
    for mut line in lines {
        let avail = host.available(src_loc, line.product.product_id);
        if avail <= 0.01 {
            continue;
        }
        // Demand past availability: the partial-fulfillment cap turns this
        // into a visible backorder.
        if in_window && ctx.is_stockout_product(line.product.product_id) {
            line.qty_requested = line.qty_requested.max(round2(avail * 1.5));
        }
        filtered.push(line);
    }
    if filtered.is_empty() {
        ctx.bump("OUT:skipped_no_stock".to_string());
        return Ok(());
    }

    let note = if in_window {
        if stockout_pressure {
            "stockout_pressure"
        } else {
            "stockout_window"
        }
    } else {
        ""
    };
    host.submit_picking(
        ctx,
        PickingRequest {
            warehouse_code: wh.code.clone(),
            warehouse_id: wh.warehouse_id,
            kind: MovementKind::Outbound,
            day,
            picking_type_id: wh.picking_type_out_id,
            partner_id: Some(ctx.company.customer_id),
            src_loc,
            dst_loc: customer_loc_id,
            lines: filtered,
            note: note.to_string(),
        },
    )?;
    Ok(())
}

/// Generate all customer shipments for the company.
pub fn seed_outbound<H: PickingHost + ?Sized>(
    host: &mut H,
    ctx: &mut SimulationContext,
    customer_loc_id: i64,
) -> Result<(), SeederError> {
    let warehouses = ctx.company.warehouses.clone();
    let days = ctx.calendar.days().to_vec();
    for wh in &warehouses {
        let weight = ctx.profiles[&wh.code].weight;
        for &day in &days {
            let spike_mult = if ctx.is_spike_day(day) { SPIKE_MULTIPLIER } else { 1.0 };
            let count = picking_count(ctx, weight, day);
            for _ in 0..count {
                let (lines, stockout_pressure) = generate_lines(ctx, &wh.code, day, spike_mult);
                if lines.is_empty() {
                    continue;
                }
                post_picking(host, ctx, wh, day, customer_loc_id, lines, stockout_pressure)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_rates_cover_all_categories() {
        for category in Category::ALL {
            assert!(base_rate(category) > 0.0);
        }
    }

    #[test]
    fn test_bulk_categories_have_widest_order_multipliers() {
        assert_eq!(order_size_multiplier(Category::Seeds), (5.0, 18.0));
        assert_eq!(order_size_multiplier(Category::Tools), (1.0, 4.0));
        assert_eq!(order_size_multiplier(Category::SpareParts), (1.0, 4.0));
    }
}
