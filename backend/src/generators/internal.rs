//! Internal redistribution generator
//!
//! Moves stock between good locations of a warehouse through a transit
//! location: step one src-good to transit on day D, step two transit to
//! dst-good on D+1 (clamped to the horizon end). The two-hop shape models a
//! real multi-leg internal move and must stay intact.

use crate::demand::weekday_multiplier;
use crate::generators::{
    available_locations_for_product, pick_base_unit_location, round2, PickingHost,
};
use crate::models::company::LocationRole;
use crate::models::movement::{MovementKind, MovementLine};
use crate::models::product::{Category, Product};
use crate::models::SimulationContext;
use crate::orchestrator::{PickingRequest, SeederError};
use chrono::{Duration, NaiveDate};

const TRANSFER_COUNT: (i64, i64) = (12, 40);
const WEEKDAY_THRESHOLD: f64 = 0.6;
const QTY_RANGE_DEFAULT: (f64, f64) = (10.0, 120.0);
const QTY_RANGE_SMALL: (f64, f64) = (1.0, 12.0);
/// Never move more than this share of the source location's stock.
const AVAILABILITY_CAP: f64 = 0.85;

fn transfer_days(ctx: &mut SimulationContext, warehouse_code: &str) -> Vec<NaiveDate> {
    let weight = ctx.profiles[warehouse_code].weight;
    let months = ctx.calendar.months() as f64;

    let (min_c, max_c) = TRANSFER_COUNT;
    let base = ctx.rng.range_inclusive(min_c, max_c) as f64;
    let count = (base * months * (0.8 + 0.4 * weight)).round() as usize;

    let mut candidates: Vec<NaiveDate> = ctx
        .calendar
        .days()
        .iter()
        .copied()
        .filter(|d| weekday_multiplier(MovementKind::Internal, *d) > WEEKDAY_THRESHOLD)
        .collect();
    if candidates.is_empty() {
        candidates = ctx.calendar.days().to_vec();
    }
    ctx.rng.sample(&candidates, count.min(candidates.len()))
}

fn quantity_to_transfer<H: PickingHost + ?Sized>(
    host: &H,
    ctx: &mut SimulationContext,
    weight: f64,
    product: &Product,
    src_loc: i64,
) -> f64 {
    let (low, high) = match product.category {
        Category::Tools | Category::SpareParts => QTY_RANGE_SMALL,
        _ => QTY_RANGE_DEFAULT,
    };
    let desired = ctx.rng.uniform(low, high) * weight;
    let avail = host.available(src_loc, product.product_id);
    round2(desired.min((avail * AVAILABILITY_CAP).max(0.0)).max(0.0))
}

struct TransferDetails {
    product: Product,
    qty: f64,
    src_loc: i64,
    transit_loc: i64,
    dst_loc: i64,
}

fn generate_transfer<H: PickingHost + ?Sized>(
    host: &H,
    ctx: &mut SimulationContext,
    warehouse_code: &str,
) -> Result<Option<TransferDetails>, SeederError> {
    let profile = ctx.profiles[warehouse_code].clone();
    if profile.active_products.is_empty() {
        return Ok(None);
    }
    let product = ctx.rng.choose(&profile.active_products).clone();

    let src_candidates =
        available_locations_for_product(host, ctx, warehouse_code, product.product_id);
    let Some(&src_loc) = src_candidates.first() else {
        ctx.bump("INT:skipped_no_stock".to_string());
        return Ok(None);
    };
    let transit_loc = pick_base_unit_location(ctx, warehouse_code, LocationRole::Transit)?;

    // A destination distinct from the source; give up after a few tries when
    // the warehouse only has one good location.
    let mut dst_loc = src_loc;
    for _ in 0..5 {
        let candidate = pick_base_unit_location(ctx, warehouse_code, LocationRole::Good)?;
        if candidate != src_loc {
            dst_loc = candidate;
            break;
        }
    }
    if dst_loc == src_loc {
        return Ok(None);
    }

    let qty = quantity_to_transfer(host, ctx, profile.weight, &product, src_loc);
    if qty <= 0.0 {
        ctx.bump("INT:skipped_no_qty".to_string());
        return Ok(None);
    }

    Ok(Some(TransferDetails {
        product,
        qty,
        src_loc,
        transit_loc,
        dst_loc,
    }))
}

fn process_transfer<H: PickingHost + ?Sized>(
    host: &mut H,
    ctx: &mut SimulationContext,
    wh: &crate::models::Warehouse,
    day: NaiveDate,
) -> Result<(), SeederError> {
    let Some(details) = generate_transfer(host, ctx, &wh.code)? else {
        return Ok(());
    };

    let outcome = host.submit_picking(
        ctx,
        PickingRequest {
            warehouse_code: wh.code.clone(),
            warehouse_id: wh.warehouse_id,
            kind: MovementKind::Internal,
            day,
            picking_type_id: wh.picking_type_internal_id,
            partner_id: None,
            src_loc: details.src_loc,
            dst_loc: details.transit_loc,
            lines: vec![MovementLine::new(details.product.clone(), details.qty)],
            note: "redistribution_step1".to_string(),
        },
    )?;
    if !outcome.applied() {
        return Ok(());
    }

    let second_day = ctx.calendar.clamp(day + Duration::days(1));
    host.submit_picking(
        ctx,
        PickingRequest {
            warehouse_code: wh.code.clone(),
            warehouse_id: wh.warehouse_id,
            kind: MovementKind::Internal,
            day: second_day,
            picking_type_id: wh.picking_type_internal_id,
            partner_id: None,
            src_loc: details.transit_loc,
            dst_loc: details.dst_loc,
            lines: vec![MovementLine::new(details.product, details.qty)],
            note: "redistribution_step2".to_string(),
        },
    )?;
    Ok(())
}

/// Generate all internal redistributions for the company.
pub fn seed_internal<H: PickingHost + ?Sized>(
    host: &mut H,
    ctx: &mut SimulationContext,
) -> Result<(), SeederError> {
    let warehouses = ctx.company.warehouses.clone();
    for wh in &warehouses {
        let days = transfer_days(ctx, &wh.code);
        for day in days {
            process_transfer(host, ctx, wh, day)?;
        }
    }
    Ok(())
}
