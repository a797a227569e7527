//! Inbound receipt generator
//!
//! Plans supplier receipts per warehouse: a per-month shipment count scaled
//! by warehouse weight, receipt days biased toward weekdays with a high
//! inbound multiplier, a subset of receipts pushed forward by a supplier
//! delay (every receipt, when planned inside an active supplier-delay
//! window), and 3-8 lines per receipt with category-specific quantity
//! ranges.
//! Inbound quantities add supply, so the ledger never constrains them; a
//! controlled stockout reduces them instead.

use crate::anomalies::STOCKOUT_INBOUND_REDUCTION;
use crate::demand::weekday_multiplier;
use crate::generators::{pick_base_unit_location, round2, PickingHost};
use crate::models::anomaly::{AnomalyEvent, AnomalyKind};
use crate::models::company::{LocationRole, Warehouse};
use crate::models::movement::{MovementKind, MovementLine};
use crate::models::product::Category;
use crate::models::SimulationContext;
use crate::orchestrator::{PickingRequest, SeederError};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

const SHIPMENTS_PER_MONTH: (i64, i64) = (2, 6);
const WEEKDAY_THRESHOLD: f64 = 0.4;
const DELAY_MONTH_MULTIPLIER: (i64, i64) = (1, 2);
const DELIVERY_DELAY_DAYS: (i64, i64) = (3, 10);
const LINES_PER_RECEIPT: (i64, i64) = (3, 8);

/// Receipt quantity range per category, before the warehouse weight.
fn category_qty_range(category: Category) -> (f64, f64) {
    match category {
        Category::Seeds | Category::Fertilizer => (150.0, 600.0),
        Category::Pesticides => (20.0, 80.0),
        Category::Tools | Category::SpareParts => (5.0, 25.0),
        Category::Packaging => (30.0, 120.0),
    }
}

struct InboundPlan {
    receipt_days: Vec<NaiveDate>,
    delayed_days: BTreeSet<NaiveDate>,
}

fn plan_warehouse(ctx: &mut SimulationContext, warehouse_code: &str) -> InboundPlan {
    let weight = ctx.profiles[warehouse_code].weight;
    let months = ctx.calendar.months() as i64;

    let (per_month_min, per_month_max) = SHIPMENTS_PER_MONTH;
    let potential = ctx.rng.range_inclusive(per_month_min, per_month_max) * months;
    let actual = ((potential as f64 * weight).round() as i64).max(1) as usize;

    let mut candidate_days: Vec<NaiveDate> = ctx
        .calendar
        .days()
        .iter()
        .copied()
        .filter(|d| weekday_multiplier(MovementKind::Inbound, *d) > WEEKDAY_THRESHOLD)
        .collect();
    if candidate_days.is_empty() {
        candidate_days = ctx.calendar.days().to_vec();
    }
    let receipt_days = ctx.rng.sample(&candidate_days, actual.min(candidate_days.len()));

    let (delay_min, delay_max) = DELAY_MONTH_MULTIPLIER;
    let delayed_n = (ctx.rng.range_inclusive(delay_min * months, delay_max * months) as usize)
        .min(receipt_days.len());
    let delayed_days = ctx.rng.sample(&receipt_days, delayed_n).into_iter().collect();

    InboundPlan {
        receipt_days,
        delayed_days,
    }
}

/// Vendor favoring the category most represented in the receipt's lines.
fn choose_vendor(ctx: &mut SimulationContext, lines: &[MovementLine]) -> Option<i64> {
    let mut category_counts: BTreeMap<Category, usize> = BTreeMap::new();
    for line in lines {
        *category_counts.entry(line.product.category).or_insert(0) += 1;
    }
    let max_count = category_counts.values().copied().max()?;
    let dominant: Vec<Category> = category_counts
        .iter()
        .filter(|(_, &n)| n == max_count)
        .map(|(&c, _)| c)
        .collect();
    let vendor_category = *ctx.rng.choose(&dominant);
    let candidates = ctx.vendor_ids_by_category.get(&vendor_category)?.clone();
    if candidates.is_empty() {
        None
    } else {
        Some(*ctx.rng.choose(&candidates))
    }
}

fn process_receipt<H: PickingHost + ?Sized>(
    host: &mut H,
    ctx: &mut SimulationContext,
    wh: &Warehouse,
    planned_day: NaiveDate,
    delayed: bool,
    supplier_loc_id: i64,
) -> Result<(), SeederError> {
    let mut day = planned_day;
    let mut note = String::new();

    if delayed {
        let (delay_min, delay_max) = DELIVERY_DELAY_DAYS;
        let delay = ctx.rng.range_inclusive(delay_min, delay_max);
        day = ctx.calendar.clamp(planned_day + Duration::days(delay));
        note = format!("supplier_delay:+{delay}d");
        host.record_anomaly(AnomalyEvent {
            kind: AnomalyKind::SupplierDelay,
            company: ctx.company.name.clone(),
            date: planned_day,
            end_date: None,
            detail: format!("Inbound delayed {delay}d for {} originally {}", wh.code, planned_day),
        });
    }

    let profile = ctx.profiles[&wh.code].clone();
    if profile.active_products.is_empty() {
        return Ok(());
    }
    let weight = profile.weight;

    let (min_lines, max_lines) = LINES_PER_RECEIPT;
    let line_n = ctx.rng.range_inclusive(min_lines, max_lines) as usize;
    let sampled = ctx
        .rng
        .sample(&profile.active_products, line_n.min(profile.active_products.len()));

    let mut had_stockout_reduction = false;
    let mut lines = Vec::with_capacity(sampled.len());
    for prod in sampled {
        let (low, high) = category_qty_range(prod.category);
        let mut qty = ctx.rng.uniform(low, high) * weight;
        if ctx.in_stockout_window(day) && ctx.is_stockout_product(prod.product_id) {
            qty *= STOCKOUT_INBOUND_REDUCTION;
            had_stockout_reduction = true;
        }
        lines.push(MovementLine::new(prod, round2(qty)));
    }
    if lines.is_empty() {
        return Ok(());
    }
    if had_stockout_reduction {
        if !note.is_empty() {
            note.push(';');
        }
        note.push_str("stockout_inbound_reduction");
    }

    let vendor_id = choose_vendor(ctx, &lines);
    let dest_good = pick_base_unit_location(ctx, &wh.code, LocationRole::Good)?;
    host.submit_picking(
        ctx,
        PickingRequest {
            warehouse_code: wh.code.clone(),
            warehouse_id: wh.warehouse_id,
            kind: MovementKind::Inbound,
            day,
            picking_type_id: wh.picking_type_in_id,
            partner_id: vendor_id,
            src_loc: supplier_loc_id,
            dst_loc: dest_good,
            lines,
            note,
        },
    )?;
    Ok(())
}

/// Generate all supplier receipts for the company.
pub fn seed_inbound<H: PickingHost + ?Sized>(
    host: &mut H,
    ctx: &mut SimulationContext,
    supplier_loc_id: i64,
) -> Result<(), SeederError> {
    let warehouses = ctx.company.warehouses.clone();
    for wh in &warehouses {
        let plan = plan_warehouse(ctx, &wh.code);
        for planned_day in &plan.receipt_days {
            // A receipt planned inside an active supplier-delay window is
            // always late, on top of the baseline random delay sample.
            let delayed = plan.delayed_days.contains(planned_day)
                || ctx.in_supplier_delay_window(*planned_day);
            process_receipt(host, ctx, wh, *planned_day, delayed, supplier_loc_id)?;
        }
    }
    Ok(())
}
