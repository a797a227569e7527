//! Anomaly injector
//!
//! Decides, once per company-run, which anomalies the run carries and
//! populates the simulation context with their windows. Each kind is gated
//! independently by its own probability; horizons shorter than the minimum
//! suppress injection (a policy choice, not an error). Every injected
//! anomaly is returned for the run report and logged.

use crate::models::anomaly::{AnomalyEvent, AnomalyKind};
use crate::models::context::SimulationContext;
use crate::models::product::Product;
use chrono::Duration;
use tracing::info;

/// Outbound demand multiplier on spike days.
pub const SPIKE_MULTIPLIER: f64 = 2.5;
/// Damage rate multiplier inside a shrinkage window at the affected warehouse.
pub const SHRINKAGE_MULTIPLIER: f64 = 6.0;
/// Outbound demand multiplier for stockout products inside the window.
pub const STOCKOUT_DEMAND_MULTIPLIER: f64 = 2.8;
/// Inbound quantities for stockout products are reduced to this share.
pub const STOCKOUT_INBOUND_REDUCTION: f64 = 0.35;
/// Extra lead-time days inside a supplier-delay window (order mode).
pub const SUPPLIER_DELAY_EXTRA_DAYS: i64 = 15;

/// Injection gates and horizon policy.
#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    pub spike_probability: f64,
    pub shrinkage_probability: f64,
    pub stockout_probability: f64,
    pub supplier_delay_probability: f64,
    /// Below this horizon no movement anomalies are injected.
    pub min_horizon_days: usize,
    /// Below this horizon no supplier-delay window is injected.
    pub min_delay_window_horizon_days: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            spike_probability: 0.8,
            shrinkage_probability: 0.6,
            stockout_probability: 0.5,
            supplier_delay_probability: 0.4,
            min_horizon_days: 14,
            min_delay_window_horizon_days: 60,
        }
    }
}

/// Run all probability gates and populate the context. Returns the recorded
/// events in injection order.
pub fn inject_all(
    ctx: &mut SimulationContext,
    products: &[Product],
    config: &AnomalyConfig,
) -> Vec<AnomalyEvent> {
    let mut events = Vec::new();
    if ctx.calendar.len() < config.min_horizon_days {
        return events;
    }
    if ctx.rng.chance(config.spike_probability) {
        events.extend(inject_demand_spikes(ctx));
    }
    if ctx.rng.chance(config.shrinkage_probability) {
        events.extend(inject_shrinkage_event(ctx));
    }
    if ctx.rng.chance(config.stockout_probability) {
        events.extend(inject_controlled_stockout(ctx, products));
    }
    if ctx.calendar.len() >= config.min_delay_window_horizon_days
        && ctx.rng.chance(config.supplier_delay_probability)
    {
        events.extend(inject_supplier_delay_window(ctx));
    }
    events
}

/// Flag 1-3 single days where outbound demand is multiplied by
/// [`SPIKE_MULTIPLIER`].
pub fn inject_demand_spikes(ctx: &mut SimulationContext) -> Vec<AnomalyEvent> {
    let k = ctx.rng.range_inclusive(1, 3) as usize;
    let days = ctx.rng.sample(ctx.calendar.days(), k);
    ctx.spike_days = days.into_iter().collect();

    let mut events = Vec::new();
    for day in ctx.spike_days.clone() {
        let evt = AnomalyEvent {
            kind: AnomalyKind::DemandSpike,
            company: ctx.company.name.clone(),
            date: day,
            end_date: None,
            detail: format!("Demand spike multiplier {SPIKE_MULTIPLIER}x on {day}"),
        };
        log_anomaly(&evt);
        events.push(evt);
    }
    events
}

/// Pick one warehouse and a contiguous 3-5 day window where its damage rate
/// is multiplied by [`SHRINKAGE_MULTIPLIER`].
pub fn inject_shrinkage_event(ctx: &mut SimulationContext) -> Vec<AnomalyEvent> {
    if ctx.company.warehouses.is_empty() {
        return Vec::new();
    }
    let wh_code = ctx.rng.choose(&ctx.company.warehouses).code.clone();
    let start = *ctx.rng.choose(ctx.calendar.days());
    let len = ctx.rng.range_inclusive(3, 5);
    ctx.shrink_window = (0..len)
        .map(|i| start + Duration::days(i))
        .filter(|d| ctx.calendar.contains(*d))
        .collect();
    ctx.shrink_wh_code = Some(wh_code.clone());

    if ctx.shrink_window.is_empty() {
        return Vec::new();
    }
    let end = *ctx.shrink_window.iter().next_back().unwrap();
    let evt = AnomalyEvent {
        kind: AnomalyKind::ShrinkageEvent,
        company: ctx.company.name.clone(),
        date: start,
        end_date: Some(end),
        detail: format!(
            "Shrinkage event at {} for {} days starting {}",
            wh_code,
            ctx.shrink_window.len(),
            start
        ),
    };
    log_anomaly(&evt);
    vec![evt]
}

/// Pick up to four products and a 10-day window with elevated outbound demand
/// and reduced inbound supply for them.
pub fn inject_controlled_stockout(
    ctx: &mut SimulationContext,
    products: &[Product],
) -> Vec<AnomalyEvent> {
    if products.is_empty() {
        return Vec::new();
    }
    ctx.stockout_products = ctx.rng.sample(products, 4.min(products.len()));
    let start = *ctx.rng.choose(ctx.calendar.days());
    ctx.stockout_window = (0..10)
        .map(|i| start + Duration::days(i))
        .filter(|d| ctx.calendar.contains(*d))
        .collect();

    if ctx.stockout_window.is_empty() {
        return Vec::new();
    }
    let end = *ctx.stockout_window.iter().next_back().unwrap();
    let codes: Vec<&str> = ctx
        .stockout_products
        .iter()
        .map(|p| p.default_code.as_str())
        .collect();
    let evt = AnomalyEvent {
        kind: AnomalyKind::ControlledStockout,
        company: ctx.company.name.clone(),
        date: start,
        end_date: Some(end),
        detail: format!(
            "Elevated outbound for SKUs [{}] for {} days from {}",
            codes.join(","),
            ctx.stockout_window.len(),
            start
        ),
    };
    log_anomaly(&evt);
    vec![evt]
}

/// Pick a contiguous window during which supplier lead times are extended by
/// [`SUPPLIER_DELAY_EXTRA_DAYS`]. Requires a long horizon so the window fits
/// comfortably away from both ends.
pub fn inject_supplier_delay_window(ctx: &mut SimulationContext) -> Vec<AnomalyEvent> {
    let days = ctx.calendar.days();
    if days.len() < 60 {
        return Vec::new();
    }
    let start_idx = ctx.rng.range(10, days.len() as i64 - 30) as usize;
    let duration = ctx.rng.range_inclusive(10, 20) as usize;
    let start = days[start_idx];
    let end = days[(start_idx + duration).min(days.len() - 1)];
    ctx.supplier_delay_window = Some((start, end));

    let evt = AnomalyEvent {
        kind: AnomalyKind::SupplierDelay,
        company: ctx.company.name.clone(),
        date: start,
        end_date: Some(end),
        detail: format!("Vendor lead times +{SUPPLIER_DELAY_EXTRA_DAYS} days until {end}"),
    };
    log_anomaly(&evt);
    vec![evt]
}

fn log_anomaly(evt: &AnomalyEvent) {
    info!(
        company = %evt.company,
        kind = %evt.kind,
        date = %evt.date,
        detail = %evt.detail,
        "anomaly injected"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::calendar::HorizonCalendar;
    use crate::models::product::Category;
    use crate::models::{Company, Warehouse};
    use crate::rng::RngManager;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn test_context(days: usize) -> SimulationContext {
        let company = Company {
            company_id: 1,
            name: "Rwanda".to_string(),
            country_code: "rw".to_string(),
            customer_id: 2,
            warehouses: vec![Warehouse {
                warehouse_id: 1,
                name: "Kigali".to_string(),
                code: "WH1".to_string(),
                view_location_id: 0,
                stock_location_id: 10,
                picking_type_in_id: 1,
                picking_type_internal_id: 2,
                picking_type_out_id: 3,
            }],
            locations: BTreeMap::new(),
        };
        let calendar =
            HorizonCalendar::ending_at(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(), days);
        SimulationContext::new(
            company,
            calendar,
            RngManager::new(42),
            BTreeMap::new(),
            BTreeMap::new(),
        )
    }

    fn products(n: usize) -> Vec<Product> {
        (0..n)
            .map(|i| Product {
                product_tmpl_id: i as i64,
                product_id: 500 + i as i64,
                default_code: format!("SKU{:03}", i),
                name: format!("Product {}", i),
                category: Category::Seeds,
                uom_id: 1,
                uom_name: "kg".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_short_horizon_suppresses_injection() {
        let mut ctx = test_context(7);
        let events = inject_all(&mut ctx, &products(20), &AnomalyConfig::default());
        assert!(events.is_empty());
        assert!(ctx.spike_days.is_empty());
        assert!(ctx.stockout_window.is_empty());
    }

    #[test]
    fn test_spike_days_inside_horizon() {
        let mut ctx = test_context(90);
        let events = inject_demand_spikes(&mut ctx);
        assert!(!events.is_empty() && events.len() <= 3);
        for day in &ctx.spike_days {
            assert!(ctx.calendar.contains(*day));
        }
        for evt in &events {
            assert_eq!(evt.kind, AnomalyKind::DemandSpike);
            assert!(evt.covers(evt.date));
        }
    }

    #[test]
    fn test_shrinkage_window_is_contiguous_and_contained() {
        let mut ctx = test_context(90);
        let events = inject_shrinkage_event(&mut ctx);
        assert_eq!(events.len(), 1);
        assert_eq!(ctx.shrink_wh_code.as_deref(), Some("WH1"));
        let window: Vec<_> = ctx.shrink_window.iter().copied().collect();
        assert!((3..=5).contains(&window.len()) || !window.is_empty());
        for pair in window.windows(2) {
            assert_eq!((pair[1] - pair[0]).num_days(), 1);
        }
        for day in &window {
            assert!(ctx.calendar.contains(*day));
        }
    }

    #[test]
    fn test_stockout_window_and_products() {
        let mut ctx = test_context(90);
        let catalog = products(30);
        let events = inject_controlled_stockout(&mut ctx, &catalog);
        assert_eq!(events.len(), 1);
        assert_eq!(ctx.stockout_products.len(), 4);
        assert!(ctx.stockout_window.len() <= 10 && !ctx.stockout_window.is_empty());
        let evt = &events[0];
        for day in &ctx.stockout_window {
            assert!(evt.covers(*day), "recorded window must contain {day}");
        }
    }

    #[test]
    fn test_stockout_with_tiny_catalog() {
        let mut ctx = test_context(90);
        let catalog = products(2);
        inject_controlled_stockout(&mut ctx, &catalog);
        assert_eq!(ctx.stockout_products.len(), 2);
    }

    #[test]
    fn test_supplier_delay_window_needs_long_horizon() {
        let mut ctx = test_context(30);
        assert!(inject_supplier_delay_window(&mut ctx).is_empty());
        let mut ctx = test_context(120);
        let events = inject_supplier_delay_window(&mut ctx);
        assert_eq!(events.len(), 1);
        let (start, end) = ctx.supplier_delay_window.unwrap();
        assert!(ctx.calendar.contains(start));
        assert!(ctx.calendar.contains(end));
        assert!(start < end);
    }
}
