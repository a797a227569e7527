//! Order-mode scheduler
//!
//! Alternate top-level mode: instead of directly seeding stock movements,
//! place purchase and sales orders against the external system and defer
//! their stock effects. Confirming an order creates its pickings remotely;
//! a pending action scheduled at `order date + lead time` later drives those
//! pickings through the shared validation flow. A stable min-heap keyed by
//! (due date, insertion sequence) keeps execution order deterministic, and
//! the horizon end force-flushes whatever is still pending so no scheduled
//! operation is silently lost.

use crate::anomalies::SUPPLIER_DELAY_EXTRA_DAYS;
use crate::core::calendar::HorizonCalendar;
use crate::gateway::{record_id, InventoryGateway};
use crate::models::anomaly::{AnomalyEvent, AnomalyKind};
use crate::models::company::Company;
use crate::models::product::{Category, Product};
use crate::orchestrator::{MovementEngine, RunConfig, SeederError};
use crate::rng::{stable_seed, RngManager};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BinaryHeap};
use tracing::{info, warn};

/// Chance per day of placing a purchase order.
const PURCHASE_PROBABILITY: f64 = 0.4;
/// Purchase lead time in days, before any supplier-delay extension.
const PURCHASE_LEAD_DAYS: (i64, i64) = (1, 7);
/// Sales fulfillment time in days.
const DELIVERY_LEAD_DAYS: (i64, i64) = (0, 3);

/// Deferred stock effect of a confirmed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionToken {
    ReceivePurchaseOrder { order_id: i64 },
    DeliverSalesOrder { order_id: i64 },
}

/// Heap entry: ordered by due date, then insertion sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAction {
    pub due: NaiveDate,
    pub seq: u64,
    pub token: ActionToken,
}

impl Ord for PendingAction {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

impl PartialOrd for PendingAction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Outcome counters for one order-mode run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderStats {
    pub po_count: u64,
    pub so_count: u64,
    pub po_lines: u64,
    pub so_lines: u64,
    pub scrap_count: u64,
    /// SKU → total ordered outbound quantity
    pub sku_outbound: BTreeMap<String, i64>,
}

impl OrderStats {
    /// Highest-volume outbound SKUs, descending, at most `n`.
    pub fn top_outbound_skus(&self, n: usize) -> Vec<(String, i64)> {
        let mut ranked: Vec<(String, i64)> =
            self.sku_outbound.iter().map(|(k, v)| (k.clone(), *v)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }
}

/// Warehouse routing data read back from the external system.
#[derive(Debug, Clone)]
struct OrderWarehouse {
    id: i64,
    in_type_id: i64,
    lot_stock_id: i64,
}

pub struct OrderSeeder<'a, G> {
    engine: &'a mut MovementEngine<G>,
    rng: RngManager,
    pending: BinaryHeap<Reverse<PendingAction>>,
    pending_seq: u64,
    customers: Vec<i64>,
    events: Vec<AnomalyEvent>,
    stats: OrderStats,
}

impl<'a, G: InventoryGateway> OrderSeeder<'a, G> {
    pub fn new(engine: &'a mut MovementEngine<G>, company_name: &str) -> Self {
        let seed = stable_seed(engine.dataset_key(), company_name, "orders");
        Self {
            engine,
            rng: RngManager::new(seed),
            pending: BinaryHeap::new(),
            pending_seq: 0,
            customers: Vec::new(),
            events: Vec::new(),
            stats: OrderStats::default(),
        }
    }

    fn schedule(&mut self, due: NaiveDate, token: ActionToken) {
        self.pending_seq += 1;
        self.pending.push(Reverse(PendingAction {
            due,
            seq: self.pending_seq,
            token,
        }));
    }

    fn execute(&mut self, company_id: i64, token: ActionToken, act_date: NaiveDate) {
        let (model, order_id, replay_into_ledger) = match token {
            ActionToken::ReceivePurchaseOrder { order_id } => ("purchase.order", order_id, true),
            ActionToken::DeliverSalesOrder { order_id } => ("sale.order", order_id, false),
        };
        let picking_ids = match self.engine.order_pickings(model, order_id, company_id) {
            Ok(ids) => ids,
            Err(err) => {
                warn!(model, order_id, error = %err, "could not read order pickings");
                return;
            }
        };
        for picking_id in picking_ids {
            if let Err(err) = self
                .engine
                .validate_picking_flow(company_id, picking_id, act_date, None)
            {
                warn!(model, order_id, picking_id, error = %err, "order picking validation failed");
                continue;
            }
            // Receipts add supply the sales caps depend on; deliveries were
            // already reserved out of the ledger at planning time.
            if replay_into_ledger {
                if let Err(err) = self.engine.apply_picking_to_ledger(company_id, picking_id) {
                    warn!(model, order_id, picking_id, error = %err, "ledger replay failed");
                }
            }
        }
    }

    fn drain_due(&mut self, company_id: i64, current: NaiveDate) {
        while let Some(Reverse(next)) = self.pending.peek().copied() {
            if next.due > current {
                break;
            }
            self.pending.pop();
            self.execute(company_id, next.token, current);
        }
    }

    fn flush(&mut self, company_id: i64, end_date: NaiveDate) {
        while let Some(Reverse(action)) = self.pending.pop() {
            self.execute(company_id, action.token, action.due.max(end_date));
        }
    }

    fn inject_anomalies(&mut self, company: &Company, calendar: &HorizonCalendar) {
        let days = calendar.days();
        if days.len() < 60 {
            return;
        }

        if self.rng.chance(0.4) {
            let start_idx = self.rng.range(10, days.len() as i64 - 30) as usize;
            let duration = self.rng.range_inclusive(10, 20) as usize;
            let end = days[(start_idx + duration).min(days.len() - 1)];
            self.record(AnomalyEvent {
                kind: AnomalyKind::SupplierDelay,
                company: company.name.clone(),
                date: days[start_idx],
                end_date: Some(end),
                detail: format!("Vendor lead times +{SUPPLIER_DELAY_EXTRA_DAYS} days until {end}"),
            });
        }

        if self.rng.chance(0.3) {
            let start_idx = self.rng.range(10, days.len() as i64 - 20) as usize;
            let duration = self.rng.range_inclusive(7, 14) as usize;
            let end = days[(start_idx + duration).min(days.len() - 1)];
            self.record(AnomalyEvent {
                kind: AnomalyKind::ControlledStockout,
                company: company.name.clone(),
                date: days[start_idx],
                end_date: Some(end),
                detail: format!("Purchasing halted until {end}"),
            });
        }

        if self.rng.chance(0.5) {
            let middle = &days[20..days.len() - 20];
            let date = *self.rng.choose(middle);
            self.record(AnomalyEvent {
                kind: AnomalyKind::ShrinkageEvent,
                company: company.name.clone(),
                date,
                end_date: None,
                detail: "Sudden inventory loss (scrap)".to_string(),
            });
        }
    }

    fn record(&mut self, event: AnomalyEvent) {
        self.events.push(event.clone());
        info!(
            company = %event.company,
            kind = %event.kind,
            date = %event.date,
            detail = %event.detail,
            "anomaly injected"
        );
        self.engine.anomalies.push(event);
    }

    fn customer_id(&mut self) -> Result<i64, SeederError> {
        if self.customers.is_empty() {
            let existing = self.engine.gateway_mut().search_read(
                "res.partner",
                &json!([["customer_rank", ">", 0]]),
                &["id"],
                Some(10),
                None,
                None,
            )?;
            self.customers = existing
                .iter()
                .filter_map(|r| r.get("id").and_then(Value::as_i64))
                .collect();
            if self.customers.is_empty() {
                let cid = self.engine.gateway_mut().create(
                    "res.partner",
                    json!({"name": "Generic Customer", "customer_rank": 1}),
                    None,
                )?;
                self.customers = vec![cid];
            }
        }
        Ok(*self.rng.choose(&self.customers))
    }

    fn load_warehouses(&mut self, company: &Company) -> Result<Vec<OrderWarehouse>, SeederError> {
        let ids: Vec<i64> = company.warehouses.iter().map(|w| w.warehouse_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let records = self.engine.gateway_mut().search_read(
            "stock.warehouse",
            &json!([["id", "in", ids]]),
            &["id", "name", "in_type_id", "lot_stock_id"],
            None,
            None,
            None,
        )?;
        Ok(records
            .iter()
            .filter_map(|r| {
                Some(OrderWarehouse {
                    id: r.get("id").and_then(Value::as_i64)?,
                    in_type_id: r.get("in_type_id").and_then(record_id)?,
                    lot_stock_id: r.get("lot_stock_id").and_then(record_id)?,
                })
            })
            .collect())
    }

    fn load_prices(
        &mut self,
        company_id: i64,
        products: &[Product],
    ) -> Result<BTreeMap<i64, (f64, f64)>, SeederError> {
        let ids: Vec<i64> = products.iter().map(|p| p.product_id).collect();
        if ids.is_empty() {
            return Ok(BTreeMap::new());
        }
        let records = self.engine.gateway_mut().search_read(
            "product.product",
            &json!([["id", "in", ids]]),
            &["id", "list_price", "standard_price"],
            None,
            None,
            Some(crate::gateway::CompanyScope::new(company_id)),
        )?;
        Ok(records
            .iter()
            .filter_map(|r| {
                let id = r.get("id").and_then(Value::as_i64)?;
                let list = r.get("list_price").and_then(Value::as_f64).unwrap_or(0.0);
                let standard = r.get("standard_price").and_then(Value::as_f64).unwrap_or(0.0);
                Some((id, (list, standard)))
            })
            .collect())
    }

    fn sale_price(prices: &BTreeMap<i64, (f64, f64)>, product_id: i64) -> f64 {
        let (list, standard) = prices.get(&product_id).copied().unwrap_or((0.0, 0.0));
        if list > 0.0 {
            list
        } else if standard > 0.0 {
            standard * 1.35
        } else {
            10.0
        }
    }

    fn purchase_price(prices: &BTreeMap<i64, (f64, f64)>, product_id: i64) -> f64 {
        let (list, standard) = prices.get(&product_id).copied().unwrap_or((0.0, 0.0));
        if standard > 0.0 {
            standard
        } else if list > 0.0 {
            list * 0.8
        } else {
            10.0
        }
    }

    fn plan_purchase(
        &mut self,
        company: &Company,
        warehouses: &[OrderWarehouse],
        products: &[Product],
        vendors: &BTreeMap<Category, Vec<i64>>,
        prices: &BTreeMap<i64, (f64, f64)>,
        date: NaiveDate,
        delay_add: i64,
    ) {
        if vendors.is_empty() || products.is_empty() || warehouses.is_empty() {
            return;
        }
        let categories: Vec<Category> = vendors.keys().copied().collect();
        let category = *self.rng.choose(&categories);
        let Some(vendor_id) = vendors
            .get(&category)
            .filter(|ids| !ids.is_empty())
            .map(|ids| *self.rng.choose(ids))
        else {
            return;
        };
        let wh = self.rng.choose(warehouses).clone();

        let num_lines = self.rng.range_inclusive(1, 5) as usize;
        let subset = self.rng.sample(products, num_lines.min(products.len()));
        if subset.is_empty() {
            return;
        }
        let mut order_lines = Vec::with_capacity(subset.len());
        for p in &subset {
            let qty = self.rng.range_inclusive(10, 100);
            order_lines.push(json!([0, 0, {
                "product_id": p.product_id,
                "product_qty": qty,
                "price_unit": Self::purchase_price(prices, p.product_id),
                "date_planned": date.format("%Y-%m-%d").to_string(),
            }]));
        }

        let scope = Some(crate::gateway::CompanyScope::new(company.company_id));
        let po_vals = json!({
            "partner_id": vendor_id,
            "company_id": company.company_id,
            "date_order": date.format("%Y-%m-%d").to_string(),
            "picking_type_id": wh.in_type_id,
            "order_line": order_lines,
        });
        let po_id = match self.engine.gateway_mut().create("purchase.order", po_vals, scope) {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "purchase order creation failed");
                return;
            }
        };
        if let Err(err) = self.engine.gateway_mut().call(
            "purchase.order",
            "button_confirm",
            json!([[po_id]]),
            json!({}),
            None,
            scope,
        ) {
            warn!(order_id = po_id, error = %err, "purchase order confirmation failed");
            return;
        }

        self.stats.po_count += 1;
        self.stats.po_lines += subset.len() as u64;

        let (lead_min, lead_max) = PURCHASE_LEAD_DAYS;
        let lead = self.rng.range_inclusive(lead_min, lead_max) + delay_add;
        self.schedule(
            date + Duration::days(lead),
            ActionToken::ReceivePurchaseOrder { order_id: po_id },
        );
    }

    fn plan_sale(
        &mut self,
        company: &Company,
        warehouses: &[OrderWarehouse],
        products: &[Product],
        prices: &BTreeMap<i64, (f64, f64)>,
        date: NaiveDate,
    ) -> Result<(), SeederError> {
        if products.is_empty() || warehouses.is_empty() {
            return Ok(());
        }
        let customer_id = self.customer_id()?;
        let wh = self.rng.choose(warehouses).clone();

        let num_lines = self.rng.range_inclusive(1, 3) as usize;
        let subset = self.rng.sample(products, num_lines.min(products.len()));

        // Cap each line by primed on-hand stock and reserve it immediately,
        // so concurrent pending sales cannot oversell the same stock.
        let mut order_lines = Vec::new();
        let mut reserved: Vec<(i64, f64)> = Vec::new();
        let mut line_count = 0u64;
        for p in &subset {
            let desired = self.rng.range_inclusive(1, 10) as f64;
            let available = self.engine.ledger.get(wh.lot_stock_id, p.product_id);
            let qty = desired.min(available.floor());
            if qty < 1.0 {
                continue;
            }
            order_lines.push(json!([0, 0, {
                "product_id": p.product_id,
                "product_uom_qty": qty,
                "price_unit": Self::sale_price(prices, p.product_id),
            }]));
            reserved.push((p.product_id, qty));
            line_count += 1;
            *self
                .stats
                .sku_outbound
                .entry(p.default_code.clone())
                .or_insert(0) += qty as i64;
        }
        if order_lines.is_empty() {
            return Ok(());
        }

        let scope = Some(crate::gateway::CompanyScope::new(company.company_id));
        let so_vals = json!({
            "partner_id": customer_id,
            "company_id": company.company_id,
            "date_order": date.format("%Y-%m-%d").to_string(),
            "warehouse_id": wh.id,
            "order_line": order_lines,
        });
        let so_id = match self.engine.gateway_mut().create("sale.order", so_vals, scope) {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "sales order creation failed");
                return Ok(());
            }
        };
        if let Err(err) = self.engine.gateway_mut().call(
            "sale.order",
            "action_confirm",
            json!([[so_id]]),
            json!({}),
            None,
            scope,
        ) {
            warn!(order_id = so_id, error = %err, "sales order confirmation failed");
            return Ok(());
        }

        for (product_id, qty) in reserved {
            self.engine.ledger.add(wh.lot_stock_id, product_id, -qty);
        }
        self.stats.so_count += 1;
        self.stats.so_lines += line_count;

        let (lead_min, lead_max) = DELIVERY_LEAD_DAYS;
        let lead = self.rng.range_inclusive(lead_min, lead_max);
        self.schedule(
            date + Duration::days(lead),
            ActionToken::DeliverSalesOrder { order_id: so_id },
        );
        Ok(())
    }

    fn plan_shrinkage(
        &mut self,
        company: &Company,
        warehouses: &[OrderWarehouse],
        products: &[Product],
        date: NaiveDate,
    ) {
        if products.is_empty() || warehouses.is_empty() {
            return;
        }
        let wh = self.rng.choose(warehouses).clone();
        let product = self.rng.choose(products).clone();
        // Losses are capped by the on-hand ledger balance so pending sales
        // caps keep reading a non-negative quantity.
        let available = self.engine.ledger.get(wh.lot_stock_id, product.product_id);
        let qty = (self.rng.range_inclusive(5, 20) as f64).min(available.floor());
        if qty < 1.0 {
            return;
        }

        let scope = Some(crate::gateway::CompanyScope::new(company.company_id));
        let scrap_vals = json!({
            "product_id": product.product_id,
            "scrap_qty": qty,
            "location_id": wh.lot_stock_id,
            "company_id": company.company_id,
        });
        let scrap_id = match self.engine.gateway_mut().create("stock.scrap", scrap_vals, scope) {
            Ok(id) => id,
            Err(err) => {
                warn!(error = %err, "scrap creation failed");
                return;
            }
        };
        if let Err(err) = self.engine.gateway_mut().call(
            "stock.scrap",
            "action_validate",
            json!([[scrap_id]]),
            json!({}),
            None,
            scope,
        ) {
            warn!(scrap_id, error = %err, "scrap validation failed");
            return;
        }
        // Backdating is best-effort.
        let _ = self.engine.gateway_mut().write(
            "stock.scrap",
            &[scrap_id],
            json!({"date_done": date.format("%Y-%m-%d").to_string()}),
            scope,
        );
        self.engine.ledger.add(wh.lot_stock_id, product.product_id, -qty);
        self.stats.scrap_count += 1;
    }

    /// Run the full order mode for one company.
    pub fn seed_orders(
        &mut self,
        company: &Company,
        products: &[Product],
        vendor_ids_by_category: &BTreeMap<Category, Vec<i64>>,
        config: &RunConfig,
    ) -> Result<OrderStats, SeederError> {
        config.validate()?;
        if products.is_empty() {
            warn!(company = %company.name, "no products provided, skipping order seeding");
            return Ok(std::mem::take(&mut self.stats));
        }
        if self.engine.dry_run() {
            return Ok(std::mem::take(&mut self.stats));
        }

        let calendar = HorizonCalendar::ending_at(config.end_date, config.days);
        let warehouses = self.load_warehouses(company)?;
        let prices = self.load_prices(company.company_id, products)?;
        self.inject_anomalies(company, &calendar);

        info!(
            company = %company.name,
            start = %calendar.start(),
            end = %calendar.end(),
            "seeding orders"
        );

        let daily_vol = config.scale.daily_order_volume();
        let events = self.events.clone();
        for &current in calendar.days() {
            self.drain_due(company.company_id, current);

            let mut is_stockout = false;
            let mut delay_add = 0;
            for event in &events {
                match event.kind {
                    AnomalyKind::ControlledStockout if event.covers(current) => is_stockout = true,
                    AnomalyKind::SupplierDelay if event.covers(current) => {
                        delay_add = SUPPLIER_DELAY_EXTRA_DAYS;
                    }
                    AnomalyKind::ShrinkageEvent if event.date == current => {
                        self.plan_shrinkage(company, &warehouses, products, current);
                    }
                    _ => {}
                }
            }

            if !is_stockout && self.rng.chance(PURCHASE_PROBABILITY) {
                self.plan_purchase(
                    company,
                    &warehouses,
                    products,
                    vendor_ids_by_category,
                    &prices,
                    current,
                    delay_add,
                );
            }

            let num_sales = self.rng.range_inclusive(0, daily_vol);
            for _ in 0..num_sales {
                self.plan_sale(company, &warehouses, products, &prices, current)?;
            }
        }

        self.flush(company.company_id, calendar.end());
        Ok(std::mem::take(&mut self.stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn company() -> Company {
        Company {
            company_id: 1,
            name: "Uganda".to_string(),
            country_code: "ug".to_string(),
            customer_id: 5,
            warehouses: vec![],
            locations: BTreeMap::new(),
        }
    }

    fn product() -> Product {
        Product {
            product_tmpl_id: 400,
            product_id: 500,
            default_code: "SKU000".to_string(),
            name: "Product 0".to_string(),
            category: Category::Seeds,
            uom_id: 1,
            uom_name: "Units".to_string(),
        }
    }

    fn warehouse() -> OrderWarehouse {
        OrderWarehouse {
            id: 30,
            in_type_id: 11,
            lot_stock_id: 10,
        }
    }

    #[test]
    fn test_heap_orders_by_due_then_sequence() {
        let mut heap: BinaryHeap<Reverse<PendingAction>> = BinaryHeap::new();
        let token = ActionToken::ReceivePurchaseOrder { order_id: 1 };
        heap.push(Reverse(PendingAction { due: d(10), seq: 2, token }));
        heap.push(Reverse(PendingAction { due: d(5), seq: 3, token }));
        heap.push(Reverse(PendingAction { due: d(10), seq: 1, token }));

        let order: Vec<(NaiveDate, u64)> = std::iter::from_fn(|| heap.pop())
            .map(|Reverse(a)| (a.due, a.seq))
            .collect();
        assert_eq!(order, vec![(d(5), 3), (d(10), 1), (d(10), 2)]);
    }

    #[test]
    fn test_shrinkage_scrap_is_capped_by_ledger_stock() {
        let mut engine = MovementEngine::new(InMemoryGateway::new(), "scrap-cap", false);
        engine.ledger.add(10, 500, 7.0);
        let mut seeder = OrderSeeder::new(&mut engine, "Uganda");

        seeder.plan_shrinkage(&company(), &[warehouse()], &[product()], d(10));

        assert_eq!(seeder.stats.scrap_count, 1);
        let remaining = seeder.engine.ledger.get(10, 500);
        assert!(remaining >= 0.0, "scrap drove the ledger to {remaining}");

        let scraps = seeder.engine.gateway_mut().records("stock.scrap").to_vec();
        assert_eq!(scraps.len(), 1);
        let qty = scraps[0].get("scrap_qty").and_then(Value::as_f64).unwrap();
        assert!((5.0..=7.0).contains(&qty), "scrap qty {qty} exceeds on-hand stock");
    }

    #[test]
    fn test_shrinkage_is_skipped_at_an_empty_location() {
        let mut engine = MovementEngine::new(InMemoryGateway::new(), "scrap-empty", false);
        let mut seeder = OrderSeeder::new(&mut engine, "Uganda");

        seeder.plan_shrinkage(&company(), &[warehouse()], &[product()], d(10));

        assert_eq!(seeder.stats.scrap_count, 0);
        assert_eq!(seeder.engine.gateway_mut().count("stock.scrap"), 0);
        assert_eq!(seeder.engine.ledger.get(10, 500), 0.0);
    }

    #[test]
    fn test_top_outbound_skus_ranked_desc() {
        let mut stats = OrderStats::default();
        stats.sku_outbound.insert("A".to_string(), 5);
        stats.sku_outbound.insert("B".to_string(), 12);
        stats.sku_outbound.insert("C".to_string(), 12);
        let top = stats.top_outbound_skus(2);
        assert_eq!(top, vec![("B".to_string(), 12), ("C".to_string(), 12)]);
    }
}
