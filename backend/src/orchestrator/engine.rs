//! Movement engine
//!
//! Owns the gateway, the stock ledger, and the anomaly log for one run, and
//! implements the per-operation protocol: sequence → origin key →
//! lookup-or-create → partial fulfillment → create → confirm/assign/fulfill/
//! validate → wizard follow-up → best-effort backdate → ledger update.
//!
//! Transient gateway failures inside one operation are logged and counted
//! (`<KIND>:failed`) without touching the ledger; the run continues. Only the
//! capability probes and base-location discovery are fatal.

use crate::anomalies::{self, AnomalyConfig};
use crate::core::calendar::{datetime_at, HorizonCalendar};
use crate::gateway::{
    probe_model_fields, record_f64, record_id, resolve_done_quantity_field, CompanyScope,
    DoneQuantityField, GatewayError, InventoryGateway,
};
use crate::generators::{self, PickingHost};
use crate::models::anomaly::AnomalyEvent;
use crate::models::company::Company;
use crate::models::movement::{MoveRow, PickingRow};
use crate::models::product::{Category, Product};
use crate::models::SimulationContext;
use crate::orchestrator::{PickingRequest, RunConfig, SeederError, SubmitOutcome};
use crate::profiles::generate_warehouse_profiles;
use crate::rng::{stable_seed, RngManager};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

/// Synthesized location ids used in dry-run mode, where no external system
/// is consulted.
const DRY_RUN_SUPPLIER_LOCATION: i64 = 900_000_001;
const DRY_RUN_CUSTOMER_LOCATION: i64 = 900_000_002;

/// Stateful driver for one run against one gateway.
pub struct MovementEngine<G> {
    gateway: G,
    dataset_key: String,
    dry_run: bool,
    pub ledger: crate::ledger::StockLedger,
    pub anomalies: Vec<AnomalyEvent>,

    // Capabilities, resolved once per run
    done_field: Option<DoneQuantityField>,
    move_fields: Option<HashSet<String>>,
    base_locations: Option<(i64, i64)>,
}

impl<G: InventoryGateway> MovementEngine<G> {
    pub fn new(gateway: G, dataset_key: impl Into<String>, dry_run: bool) -> Self {
        Self {
            gateway,
            dataset_key: dataset_key.into(),
            dry_run,
            ledger: crate::ledger::StockLedger::new(),
            anomalies: Vec::new(),
            done_field: None,
            move_fields: None,
            base_locations: None,
        }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn dataset_key(&self) -> &str {
        &self.dataset_key
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// Release the gateway, e.g. to rerun against the same record store.
    pub fn into_gateway(self) -> G {
        self.gateway
    }

    /// Deterministic origin key for one operation. Stable across runs with
    /// the same dataset key.
    pub fn origin(
        &self,
        company_code: &str,
        warehouse_code: &str,
        kind: &str,
        day: chrono::NaiveDate,
        seq: u32,
    ) -> String {
        format!(
            "SEED/{}/{}/{}/{}/{}/{:04}",
            self.dataset_key,
            company_code.to_ascii_uppercase(),
            warehouse_code,
            kind,
            day.format("%Y-%m-%d"),
            seq
        )
    }

    /// Field name the backend uses for done quantities on operation lines.
    /// Fatal if neither known variant is present (capability probe).
    pub fn done_field(&mut self) -> Result<DoneQuantityField, GatewayError> {
        if let Some(field) = self.done_field {
            return Ok(field);
        }
        let field = if self.dry_run {
            DoneQuantityField::Quantity
        } else {
            resolve_done_quantity_field(&mut self.gateway)?
        };
        self.done_field = Some(field);
        Ok(field)
    }

    fn stock_move_has_field(&mut self, name: &str) -> Result<bool, GatewayError> {
        if self.move_fields.is_none() {
            self.move_fields = Some(if self.dry_run {
                HashSet::new()
            } else {
                probe_model_fields(&mut self.gateway, "stock.move")?
            });
        }
        Ok(self.move_fields.as_ref().map(|f| f.contains(name)).unwrap_or(false))
    }

    /// Default supplier and customer virtual locations (company-agnostic).
    pub fn ensure_base_locations(&mut self) -> Result<(i64, i64), SeederError> {
        if let Some(pair) = self.base_locations {
            return Ok(pair);
        }
        let pair = if self.dry_run {
            (DRY_RUN_SUPPLIER_LOCATION, DRY_RUN_CUSTOMER_LOCATION)
        } else {
            let supplier = self.base_location_by_usage("supplier")?;
            let customer = self.base_location_by_usage("customer")?;
            (supplier, customer)
        };
        self.base_locations = Some(pair);
        Ok(pair)
    }

    fn base_location_by_usage(&mut self, usage: &str) -> Result<i64, SeederError> {
        let records = self.gateway.search_read(
            "stock.location",
            &json!([["usage", "=", usage], ["company_id", "=", false]]),
            &["id", "name", "usage"],
            Some(1),
            None,
            None,
        )?;
        records
            .first()
            .and_then(|r| r.get("id").and_then(Value::as_i64))
            .ok_or_else(|| {
                SeederError::Gateway(GatewayError::RemoteCall {
                    model: "stock.location".to_string(),
                    method: "search_read".to_string(),
                    message: format!("no default {usage} stock location"),
                })
            })
    }

    fn existing_picking_by_origin(
        &mut self,
        company_id: i64,
        origin: &str,
    ) -> Result<Option<i64>, GatewayError> {
        let scope = Some(CompanyScope::new(company_id));
        let records = self.gateway.search_read(
            "stock.picking",
            &json!([["origin", "=", origin], ["company_id", "=", company_id]]),
            &["id", "name", "state", "origin"],
            Some(1),
            None,
            scope,
        )?;
        Ok(records.first().and_then(|r| r.get("id").and_then(Value::as_i64)))
    }

    /// Replay an existing picking's recorded fulfillment into the ledger.
    pub fn apply_picking_to_ledger(
        &mut self,
        company_id: i64,
        picking_id: i64,
    ) -> Result<(), GatewayError> {
        let done_field = self.done_field()?;
        let scope = Some(CompanyScope::new(company_id));
        let lines = self.gateway.search_read(
            "stock.move.line",
            &json!([["picking_id", "=", picking_id]]),
            &["product_id", done_field.name(), "location_id", "location_dest_id"],
            None,
            None,
            scope,
        )?;
        for line in lines {
            let (Some(product_id), Some(src), Some(dst)) = (
                line.get("product_id").and_then(record_id),
                line.get("location_id").and_then(record_id),
                line.get("location_dest_id").and_then(record_id),
            ) else {
                continue;
            };
            let qty_done = record_f64(&line, done_field.name());
            self.ledger.add(src, product_id, -qty_done);
            self.ledger.add(dst, product_id, qty_done);
        }
        Ok(())
    }

    fn create_picking(
        &mut self,
        company_id: i64,
        req: &PickingRequest,
        scheduled_dt: &str,
        origin: &str,
    ) -> Result<i64, GatewayError> {
        self.gateway.create(
            "stock.picking",
            json!({
                "picking_type_id": req.picking_type_id,
                "partner_id": req.partner_id,
                "location_id": req.src_loc,
                "location_dest_id": req.dst_loc,
                "scheduled_date": scheduled_dt,
                "origin": origin,
                "company_id": company_id,
            }),
            Some(CompanyScope::new(company_id)),
        )
    }

    fn create_move(
        &mut self,
        company_id: i64,
        picking_id: i64,
        req: &PickingRequest,
        product: &Product,
        qty: f64,
    ) -> Result<i64, GatewayError> {
        let mut vals = json!({
            "name": product.name,
            "picking_id": picking_id,
            "product_id": product.product_id,
            "product_uom": product.uom_id,
            "product_uom_qty": qty,
            "location_id": req.src_loc,
            "location_dest_id": req.dst_loc,
            "company_id": company_id,
        });
        // Some backends expose warehouse attribution on moves; set it only
        // when the field exists.
        if self.stock_move_has_field("picking_type_id")? {
            vals["picking_type_id"] = json!(req.picking_type_id);
        }
        if req.warehouse_id != 0 && self.stock_move_has_field("warehouse_id")? {
            vals["warehouse_id"] = json!(req.warehouse_id);
        }
        self.gateway
            .create("stock.move", vals, Some(CompanyScope::new(company_id)))
    }

    /// Ensure every move on the picking has an operation line carrying its
    /// done quantity. `quantities` overrides per product; `None` falls back
    /// to each move's requested quantity (order-mode fulfillment).
    fn ensure_move_lines_done(
        &mut self,
        company_id: i64,
        picking_id: i64,
        quantities: Option<&BTreeMap<i64, f64>>,
    ) -> Result<(), GatewayError> {
        let done_field = self.done_field()?;
        let done_name = done_field.name();
        let scope = Some(CompanyScope::new(company_id));
        let moves = self.gateway.search_read(
            "stock.move",
            &json!([["picking_id", "=", picking_id]]),
            &["id", "product_id", "product_uom", "product_uom_qty", "location_id", "location_dest_id"],
            None,
            None,
            scope,
        )?;
        for mv in moves {
            let Some(product_id) = mv.get("product_id").and_then(record_id) else {
                continue;
            };
            let qty_done = match quantities {
                Some(map) => map.get(&product_id).copied().unwrap_or(0.0),
                None => record_f64(&mv, "product_uom_qty"),
            };
            if qty_done <= 0.0 {
                continue;
            }
            let Some(move_id) = mv.get("id").and_then(Value::as_i64) else {
                continue;
            };

            let existing = self.gateway.search_read(
                "stock.move.line",
                &json!([["move_id", "=", move_id]]),
                &["id", done_name],
                Some(1),
                None,
                scope,
            )?;
            if let Some(line_id) = existing.first().and_then(|r| r.get("id").and_then(Value::as_i64)) {
                self.gateway.write(
                    "stock.move.line",
                    &[line_id],
                    json!({ done_name: qty_done }),
                    scope,
                )?;
            } else {
                self.gateway.create(
                    "stock.move.line",
                    json!({
                        "picking_id": picking_id,
                        "move_id": move_id,
                        "product_id": product_id,
                        "product_uom_id": mv.get("product_uom").and_then(record_id),
                        done_name: qty_done,
                        "location_id": mv.get("location_id").and_then(record_id),
                        "location_dest_id": mv.get("location_dest_id").and_then(record_id),
                        "company_id": company_id,
                    }),
                    scope,
                )?;
            }
        }
        Ok(())
    }

    /// Drive a picking through confirm → assign → fulfill lines → validate,
    /// resolve the two known validation wizards, and best-effort backdate.
    pub fn validate_picking_flow(
        &mut self,
        company_id: i64,
        picking_id: i64,
        done_day: chrono::NaiveDate,
        quantities: Option<&BTreeMap<i64, f64>>,
    ) -> Result<(), GatewayError> {
        let scope = Some(CompanyScope::new(company_id));
        self.gateway.call(
            "stock.picking",
            "action_confirm",
            json!([[picking_id]]),
            json!({}),
            None,
            scope,
        )?;
        self.gateway.call(
            "stock.picking",
            "action_assign",
            json!([[picking_id]]),
            json!({}),
            None,
            scope,
        )?;

        self.ensure_move_lines_done(company_id, picking_id, quantities)?;

        let res = self.gateway.call(
            "stock.picking",
            "button_validate",
            json!([[picking_id]]),
            json!({}),
            Some(json!({"force_period_date": done_day.format("%Y-%m-%d").to_string()})),
            scope,
        )?;

        if let (Some(model), Some(res_id)) = (
            res.get("res_model").and_then(Value::as_str),
            res.get("res_id").and_then(Value::as_i64),
        ) {
            match model {
                "stock.immediate.transfer" => {
                    self.gateway.call(model, "process", json!([[res_id]]), json!({}), None, scope)?;
                }
                // Cancel backorders to keep the dataset tidy; the stockout
                // stays visible through the partial done quantity.
                "stock.backorder.confirmation" => {
                    self.gateway.call(
                        model,
                        "process_cancel_backorder",
                        json!([[res_id]]),
                        json!({}),
                        None,
                        scope,
                    )?;
                }
                _ => {}
            }
        }

        // Backdating is best-effort; not all configurations allow it.
        let done_dt = datetime_at(done_day, 16, 30);
        if self
            .gateway
            .write("stock.picking", &[picking_id], json!({"date_done": done_dt}), scope)
            .is_ok()
        {
            if let Ok(lines) = self.gateway.search_read(
                "stock.move.line",
                &json!([["picking_id", "=", picking_id]]),
                &["id"],
                None,
                None,
                scope,
            ) {
                let ids: Vec<i64> = lines
                    .iter()
                    .filter_map(|l| l.get("id").and_then(Value::as_i64))
                    .collect();
                if !ids.is_empty() {
                    let _ = self
                        .gateway
                        .write("stock.move.line", &ids, json!({"date": done_dt}), scope);
                }
            }
        }
        Ok(())
    }

    /// Picking ids generated by a confirmed purchase or sales order.
    pub fn order_pickings(
        &mut self,
        model: &str,
        order_id: i64,
        company_id: i64,
    ) -> Result<Vec<i64>, GatewayError> {
        let records = self.gateway.search_read(
            model,
            &json!([["id", "=", order_id]]),
            &["picking_ids"],
            Some(1),
            None,
            Some(CompanyScope::new(company_id)),
        )?;
        Ok(records
            .first()
            .and_then(|r| r.get("picking_ids"))
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default())
    }

    fn submit(
        &mut self,
        ctx: &mut SimulationContext,
        req: PickingRequest,
    ) -> Result<SubmitOutcome, SeederError> {
        let kind = req.kind.code();
        let seq = ctx.next_seq(&req.warehouse_code, req.kind, req.day);
        let origin = self.origin(&ctx.company.country_code, &req.warehouse_code, kind, req.day, seq);
        let company_id = ctx.company.company_id;

        // Drawn before the existing-origin lookup so a replaying run consumes
        // the RNG stream exactly like the run that created the pickings.
        let hour = ctx.rng.range_inclusive(8, 15) as u32;
        let minute = *ctx.rng.choose(&[0u32, 15, 30, 45]);
        let scheduled_dt = datetime_at(req.day, hour, minute);

        if !self.dry_run {
            match self.existing_picking_by_origin(company_id, &origin) {
                Ok(Some(existing_id)) => {
                    if let Err(err) = self.apply_picking_to_ledger(company_id, existing_id) {
                        warn!(
                            company = %ctx.company.name,
                            warehouse = %req.warehouse_code,
                            kind,
                            day = %req.day,
                            %origin,
                            error = %err,
                            "failed to replay existing picking"
                        );
                        ctx.bump(format!("{kind}:failed"));
                        return Ok(SubmitOutcome::Failed);
                    }
                    ctx.bump(format!("{kind}:existing"));
                    return Ok(SubmitOutcome::Existing);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(
                        company = %ctx.company.name,
                        warehouse = %req.warehouse_code,
                        kind,
                        day = %req.day,
                        %origin,
                        error = %err,
                        "origin lookup failed"
                    );
                    ctx.bump(format!("{kind}:failed"));
                    return Ok(SubmitOutcome::Failed);
                }
            }
        }

        // Partial fulfillment: outbound is capped at source availability,
        // the other kinds commit what they request.
        let mut qty_done_by_product: BTreeMap<i64, f64> = BTreeMap::new();
        for line in &req.lines {
            let qty_done = if req.kind.capped_by_availability() {
                let avail = self.ledger.get(req.src_loc, line.product.product_id);
                line.qty_requested.min(avail.max(0.0))
            } else {
                line.qty_requested
            };
            qty_done_by_product.insert(line.product.product_id, qty_done);
        }
        if qty_done_by_product.values().sum::<f64>() <= 0.0 {
            ctx.bump(format!("{kind}:skipped_no_qty"));
            return Ok(SubmitOutcome::SkippedNoQty);
        }

        if !self.dry_run {
            if let Err(err) =
                self.create_and_validate(company_id, &req, &scheduled_dt, &origin, &qty_done_by_product)
            {
                warn!(
                    company = %ctx.company.name,
                    warehouse = %req.warehouse_code,
                    kind,
                    day = %req.day,
                    %origin,
                    error = %err,
                    "operation failed, ledger untouched"
                );
                ctx.bump(format!("{kind}:failed"));
                return Ok(SubmitOutcome::Failed);
            }
        }

        // Validation succeeded (or dry-run): record rows and apply the ledger.
        for line in &req.lines {
            let qty_done = qty_done_by_product
                .get(&line.product.product_id)
                .copied()
                .unwrap_or(0.0);
            ctx.move_rows.push(MoveRow {
                origin: origin.clone(),
                company: ctx.company.name.clone(),
                warehouse: req.warehouse_code.clone(),
                kind: kind.to_string(),
                scheduled_date: scheduled_dt.clone(),
                product: line.product.default_code.clone(),
                product_name: line.product.name.clone(),
                category: line.product.category,
                qty_requested: line.qty_requested,
                qty_done,
                uom: line.product.uom_name.clone(),
                source_location_id: req.src_loc,
                dest_location_id: req.dst_loc,
                note: req.note.clone(),
            });
            if req.kind == crate::models::MovementKind::Outbound {
                *ctx
                    .outbound_qty_by_sku
                    .entry(line.product.default_code.clone())
                    .or_insert(0.0) += qty_done;
            }
            if qty_done > 0.0 {
                self.ledger.add(req.src_loc, line.product.product_id, -qty_done);
                self.ledger.add(req.dst_loc, line.product.product_id, qty_done);
            }
        }
        ctx.picking_rows.push(PickingRow {
            origin,
            company: ctx.company.name.clone(),
            warehouse: req.warehouse_code.clone(),
            kind: kind.to_string(),
            scheduled_date: scheduled_dt,
            source_location_id: req.src_loc,
            dest_location_id: req.dst_loc,
            lines: req.lines.len(),
            note: req.note,
        });
        ctx.bump(kind.to_string());
        Ok(SubmitOutcome::Created)
    }

    fn create_and_validate(
        &mut self,
        company_id: i64,
        req: &PickingRequest,
        scheduled_dt: &str,
        origin: &str,
        qty_done_by_product: &BTreeMap<i64, f64>,
    ) -> Result<i64, GatewayError> {
        let picking_id = self.create_picking(company_id, req, scheduled_dt, origin)?;
        for line in &req.lines {
            self.create_move(company_id, picking_id, req, &line.product, line.qty_requested)?;
        }
        self.validate_picking_flow(company_id, picking_id, req.day, Some(qty_done_by_product))?;
        Ok(picking_id)
    }

    /// Run the full movement mode for one company: profiles → anomalies →
    /// the four generators, in a fixed order. Returns the populated context
    /// for reporting.
    pub fn seed_movements(
        &mut self,
        company: &Company,
        products: &[Product],
        vendor_ids_by_category: &BTreeMap<Category, Vec<i64>>,
        config: &RunConfig,
    ) -> Result<SimulationContext, SeederError> {
        config.validate()?;
        if !self.dry_run {
            self.gateway.authenticate()?;
            self.done_field()?;
            self.stock_move_has_field("picking_type_id")?;
        }
        let (supplier_loc, customer_loc) = self.ensure_base_locations()?;

        let calendar = HorizonCalendar::ending_at(config.end_date, config.days);
        let mut rng = RngManager::new(stable_seed(&self.dataset_key, &company.name, "moves"));
        let profiles = generate_warehouse_profiles(company, products, config.scale, &mut rng);

        let mut ctx = SimulationContext::new(
            company.clone(),
            calendar,
            rng,
            profiles,
            vendor_ids_by_category.clone(),
        );

        let events = anomalies::inject_all(&mut ctx, products, &AnomalyConfig::default());
        self.anomalies.extend(events);

        info!(
            company = %company.name,
            days = config.days,
            warehouses = company.warehouses.len(),
            "seeding movements"
        );

        generators::inbound::seed_inbound(self, &mut ctx, supplier_loc)?;
        generators::internal::seed_internal(self, &mut ctx)?;
        generators::damage::seed_damage(self, &mut ctx)?;
        generators::outbound::seed_outbound(self, &mut ctx, customer_loc)?;

        Ok(ctx)
    }
}

impl<G: InventoryGateway> PickingHost for MovementEngine<G> {
    fn available(&self, location_id: i64, product_id: i64) -> f64 {
        self.ledger.get(location_id, product_id)
    }

    fn submit_picking(
        &mut self,
        ctx: &mut SimulationContext,
        req: PickingRequest,
    ) -> Result<SubmitOutcome, SeederError> {
        self.submit(ctx, req)
    }

    fn record_anomaly(&mut self, event: AnomalyEvent) {
        info!(
            company = %event.company,
            kind = %event.kind,
            date = %event.date,
            detail = %event.detail,
            "anomaly recorded"
        );
        self.anomalies.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use chrono::NaiveDate;

    fn engine() -> MovementEngine<InMemoryGateway> {
        MovementEngine::new(InMemoryGateway::new(), "demo", false)
    }

    #[test]
    fn test_origin_key_shape() {
        let engine = engine();
        let day = NaiveDate::from_ymd_opt(2025, 6, 5).unwrap();
        assert_eq!(
            engine.origin("rw", "WH1", "OUT", day, 3),
            "SEED/demo/RW/WH1/OUT/2025-06-05/0003"
        );
    }

    #[test]
    fn test_dry_run_base_locations_are_synthesized() {
        let mut engine = MovementEngine::new(InMemoryGateway::new(), "demo", true);
        let (supplier, customer) = engine.ensure_base_locations().unwrap();
        assert_eq!(supplier, DRY_RUN_SUPPLIER_LOCATION);
        assert_eq!(customer, DRY_RUN_CUSTOMER_LOCATION);
    }

    #[test]
    fn test_base_locations_resolved_from_gateway() {
        let mut engine = engine();
        let (supplier, customer) = engine.ensure_base_locations().unwrap();
        assert_ne!(supplier, customer);
        // Cached on second call.
        assert_eq!(engine.ensure_base_locations().unwrap(), (supplier, customer));
    }

    #[test]
    fn test_done_field_cached_after_probe() {
        let mut engine = engine();
        assert_eq!(engine.done_field().unwrap(), DoneQuantityField::Quantity);
        assert_eq!(engine.done_field().unwrap(), DoneQuantityField::Quantity);
    }
}
