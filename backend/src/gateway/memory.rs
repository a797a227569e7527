//! In-memory inventory gateway
//!
//! A self-contained [`InventoryGateway`] implementation with just enough
//! model and workflow emulation (pickings, moves, move lines, purchase and
//! sales orders, scrap) to run the seeder offline and to exercise the full
//! create/validate protocol in tests, including both validation side-effect
//! branches.

use crate::gateway::{CompanyScope, DoneQuantityField, GatewayError, InventoryGateway, Record};
use crate::models::Warehouse;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// What `button_validate` answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidateFollowup {
    /// Plain validation, no wizard follow-up
    #[default]
    None,
    /// An immediate-transfer wizard must be processed
    ImmediateTransfer,
    /// A backorder confirmation must be resolved (we cancel it)
    Backorder,
}

/// In-process record store keyed by model name.
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    next_id: i64,
    models: HashMap<String, Vec<Record>>,
    done_field: Option<DoneQuantityField>,
    pub validate_followup: ValidateFollowup,
    /// (model, method, record id) of every workflow call, in order.
    pub workflow_log: Vec<(String, String, i64)>,
    authenticated: bool,
}

impl InMemoryGateway {
    /// Gateway with standard base locations and the newer `quantity` done field.
    pub fn new() -> Self {
        let mut gw = Self {
            next_id: 0,
            models: HashMap::new(),
            done_field: Some(DoneQuantityField::Quantity),
            validate_followup: ValidateFollowup::None,
            workflow_log: Vec::new(),
            authenticated: false,
        };
        gw.insert(
            "stock.location",
            json!({"name": "Vendors", "usage": "supplier", "company_id": false}),
        );
        gw.insert(
            "stock.location",
            json!({"name": "Customers", "usage": "customer", "company_id": false}),
        );
        gw
    }

    /// Override which done-quantity field the emulated backend exposes.
    /// `None` makes the capability probe fail (unsupported deployment).
    pub fn with_done_field(mut self, field: Option<DoneQuantityField>) -> Self {
        self.done_field = field;
        self
    }

    /// Make `button_validate` answer with the given wizard follow-up.
    pub fn with_validate_followup(mut self, followup: ValidateFollowup) -> Self {
        self.validate_followup = followup;
        self
    }

    /// Register a warehouse so order confirmation can route its pickings.
    pub fn register_warehouse(&mut self, wh: &Warehouse) {
        self.insert(
            "stock.warehouse",
            json!({
                "id_hint": wh.warehouse_id,
                "name": wh.name,
                "in_type_id": [wh.picking_type_in_id, "Receipts"],
                "out_type_id": [wh.picking_type_out_id, "Delivery Orders"],
                "lot_stock_id": [wh.stock_location_id, format!("{}/Stock", wh.code)],
            }),
        );
    }

    /// Number of records currently stored for a model.
    pub fn count(&self, model: &str) -> usize {
        self.models.get(model).map(|r| r.len()).unwrap_or(0)
    }

    /// All records of a model (test inspection).
    pub fn records(&self, model: &str) -> &[Record] {
        self.models.get(model).map(|r| r.as_slice()).unwrap_or(&[])
    }

    fn insert(&mut self, model: &str, values: Value) -> i64 {
        let mut record = match values {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("values".to_string(), other);
                map
            }
        };
        // Explicit id hints keep registered warehouses addressable by their
        // real identifiers.
        let id = match record.remove("id_hint").and_then(|v| v.as_i64()) {
            Some(hint) => hint,
            None => {
                self.next_id += 1;
                self.next_id
            }
        };
        record.insert("id".to_string(), json!(id));
        self.models.entry(model.to_string()).or_default().push(record);
        id
    }

    fn matches(record: &Record, domain: &Value) -> bool {
        let Some(conditions) = domain.as_array() else {
            return true;
        };
        conditions.iter().all(|cond| {
            let Some(parts) = cond.as_array() else {
                return false;
            };
            let (Some(field), Some(op)) = (
                parts.first().and_then(Value::as_str),
                parts.get(1).and_then(Value::as_str),
            ) else {
                return false;
            };
            let expected = parts.get(2).unwrap_or(&Value::Null);
            let actual = record.get(field).unwrap_or(&Value::Null);
            match op {
                "=" => value_eq(actual, expected),
                "!=" => !value_eq(actual, expected),
                ">" => match (actual.as_f64(), expected.as_f64()) {
                    (Some(a), Some(b)) => a > b,
                    _ => false,
                },
                "in" => expected
                    .as_array()
                    .map(|set| set.iter().any(|v| value_eq(actual, v)))
                    .unwrap_or(false),
                _ => false,
            }
        })
    }

    fn find(&self, model: &str, domain: &Value, limit: Option<usize>) -> Vec<Record> {
        let mut found: Vec<Record> = self
            .models
            .get(model)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| Self::matches(r, domain))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(limit) = limit {
            found.truncate(limit);
        }
        found
    }

    fn record_mut(&mut self, model: &str, id: i64) -> Result<&mut Record, GatewayError> {
        self.models
            .get_mut(model)
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|r| r.get("id").and_then(Value::as_i64) == Some(id))
            })
            .ok_or_else(|| GatewayError::RecordNotFound {
                model: model.to_string(),
                id,
            })
    }

    fn fields_get(&self, model: &str) -> Result<Value, GatewayError> {
        match model {
            "stock.move.line" => {
                let mut fields = json!({
                    "id": {"type": "integer"},
                    "picking_id": {"type": "many2one"},
                    "move_id": {"type": "many2one"},
                    "product_id": {"type": "many2one"},
                    "location_id": {"type": "many2one"},
                    "location_dest_id": {"type": "many2one"},
                    "date": {"type": "datetime"},
                });
                if let Some(done) = self.done_field {
                    fields[done.name()] = json!({"type": "float"});
                }
                Ok(fields)
            }
            "stock.move" => Ok(json!({
                "id": {"type": "integer"},
                "name": {"type": "char"},
                "picking_id": {"type": "many2one"},
                "picking_type_id": {"type": "many2one"},
                "warehouse_id": {"type": "many2one"},
                "product_id": {"type": "many2one"},
                "product_uom": {"type": "many2one"},
                "product_uom_qty": {"type": "float"},
                "location_id": {"type": "many2one"},
                "location_dest_id": {"type": "many2one"},
            })),
            other => Err(GatewayError::UnknownModel(other.to_string())),
        }
    }

    /// Turn a confirmed order into one picking plus one move per line, the
    /// way the real backend's procurement run would.
    fn spawn_order_picking(
        &mut self,
        order_model: &str,
        order_id: i64,
        qty_field: &str,
    ) -> Result<(), GatewayError> {
        let order = self
            .find(order_model, &json!([["id", "=", order_id]]), Some(1))
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::RecordNotFound {
                model: order_model.to_string(),
                id: order_id,
            })?;

        let company_id = order.get("company_id").cloned().unwrap_or(Value::Null);
        let (src, dst) = self.order_route(order_model, &order)?;
        let picking_id = self.insert(
            "stock.picking",
            json!({
                "origin": format!("{}{}", if order_model == "purchase.order" { "PO" } else { "SO" }, order_id),
                "company_id": company_id,
                "location_id": src,
                "location_dest_id": dst,
                "state": "confirmed",
            }),
        );

        let lines = order
            .get("order_line")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for line in lines {
            // one2many command triple: [0, 0, {values}]
            let Some(values) = line.as_array().and_then(|t| t.get(2)).and_then(Value::as_object)
            else {
                continue;
            };
            let qty = values.get(qty_field).and_then(Value::as_f64).unwrap_or(0.0);
            let product_id = values.get("product_id").cloned().unwrap_or(Value::Null);
            self.insert(
                "stock.move",
                json!({
                    "picking_id": picking_id,
                    "product_id": product_id,
                    "product_uom": [1, "Units"],
                    "product_uom_qty": qty,
                    "location_id": src,
                    "location_dest_id": dst,
                    "company_id": company_id,
                }),
            );
        }

        let order_rec = self.record_mut(order_model, order_id)?;
        let picking_ids = order_rec
            .entry("picking_ids".to_string())
            .or_insert_with(|| json!([]));
        if let Some(ids) = picking_ids.as_array_mut() {
            ids.push(json!(picking_id));
        }
        Ok(())
    }

    /// Source/destination locations for an order's picking.
    fn order_route(&self, order_model: &str, order: &Record) -> Result<(i64, i64), GatewayError> {
        let supplier = self.base_location("supplier")?;
        let customer = self.base_location("customer")?;
        if order_model == "purchase.order" {
            // Route to the warehouse whose receipt type the order targets.
            let picking_type = order
                .get("picking_type_id")
                .and_then(Value::as_i64)
                .unwrap_or(0);
            let stock = self
                .find("stock.warehouse", &json!([]), None)
                .into_iter()
                .find(|wh| {
                    wh.get("in_type_id")
                        .and_then(|v| crate::gateway::record_id(v))
                        == Some(picking_type)
                })
                .and_then(|wh| wh.get("lot_stock_id").and_then(|v| crate::gateway::record_id(v)))
                .unwrap_or(customer);
            Ok((supplier, stock))
        } else {
            let warehouse_id = order.get("warehouse_id").and_then(Value::as_i64);
            let stock = self
                .find("stock.warehouse", &json!([]), None)
                .into_iter()
                .find(|wh| wh.get("id").and_then(Value::as_i64) == warehouse_id)
                .and_then(|wh| wh.get("lot_stock_id").and_then(|v| crate::gateway::record_id(v)))
                .unwrap_or(supplier);
            Ok((stock, customer))
        }
    }

    fn base_location(&self, usage: &str) -> Result<i64, GatewayError> {
        self.find(
            "stock.location",
            &json!([["usage", "=", usage], ["company_id", "=", false]]),
            Some(1),
        )
        .first()
        .and_then(|r| r.get("id").and_then(Value::as_i64))
        .ok_or_else(|| GatewayError::RemoteCall {
            model: "stock.location".to_string(),
            method: "search_read".to_string(),
            message: format!("no default {usage} location"),
        })
    }

    fn first_arg_ids(args: &Value) -> Vec<i64> {
        args.get(0)
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default()
    }
}

fn value_eq(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    // Relational fields are stored either as a bare id or an [id, name] pair.
    match (crate::gateway::record_id(actual), crate::gateway::record_id(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

impl InventoryGateway for InMemoryGateway {
    fn authenticate(&mut self) -> Result<(), GatewayError> {
        self.authenticated = true;
        Ok(())
    }

    fn search_read(
        &mut self,
        model: &str,
        domain: &Value,
        _fields: &[&str],
        limit: Option<usize>,
        _order: Option<&str>,
        _scope: Option<CompanyScope>,
    ) -> Result<Vec<Record>, GatewayError> {
        Ok(self.find(model, domain, limit))
    }

    fn create(
        &mut self,
        model: &str,
        values: Value,
        _scope: Option<CompanyScope>,
    ) -> Result<i64, GatewayError> {
        Ok(self.insert(model, values))
    }

    fn write(
        &mut self,
        model: &str,
        ids: &[i64],
        values: Value,
        _scope: Option<CompanyScope>,
    ) -> Result<(), GatewayError> {
        let updates = values
            .as_object()
            .cloned()
            .unwrap_or_default();
        for id in ids {
            let record = self.record_mut(model, *id)?;
            for (k, v) in &updates {
                record.insert(k.clone(), v.clone());
            }
        }
        Ok(())
    }

    fn call(
        &mut self,
        model: &str,
        method: &str,
        args: Value,
        _kwargs: Value,
        _context: Option<Value>,
        _scope: Option<CompanyScope>,
    ) -> Result<Value, GatewayError> {
        if method == "fields_get" {
            return self.fields_get(model);
        }

        let ids = Self::first_arg_ids(&args);
        for id in &ids {
            self.workflow_log
                .push((model.to_string(), method.to_string(), *id));
        }

        match (model, method) {
            ("stock.picking", "action_confirm") | ("stock.picking", "action_assign") => {
                for id in &ids {
                    let record = self.record_mut(model, *id)?;
                    record.insert("state".to_string(), json!("assigned"));
                }
                Ok(json!(true))
            }
            ("stock.picking", "button_validate") => {
                for id in &ids {
                    let record = self.record_mut(model, *id)?;
                    record.insert("state".to_string(), json!("done"));
                }
                match self.validate_followup {
                    ValidateFollowup::None => Ok(json!(true)),
                    ValidateFollowup::ImmediateTransfer => {
                        let wizard_id = self.insert("stock.immediate.transfer", json!({}));
                        Ok(json!({"res_model": "stock.immediate.transfer", "res_id": wizard_id}))
                    }
                    ValidateFollowup::Backorder => {
                        let wizard_id = self.insert("stock.backorder.confirmation", json!({}));
                        Ok(json!({"res_model": "stock.backorder.confirmation", "res_id": wizard_id}))
                    }
                }
            }
            ("stock.immediate.transfer", "process") => Ok(json!(true)),
            ("stock.backorder.confirmation", "process_cancel_backorder") => Ok(json!(true)),
            ("purchase.order", "button_confirm") => {
                for id in &ids {
                    self.spawn_order_picking(model, *id, "product_qty")?;
                    let record = self.record_mut(model, *id)?;
                    record.insert("state".to_string(), json!("purchase"));
                }
                Ok(json!(true))
            }
            ("sale.order", "action_confirm") => {
                for id in &ids {
                    self.spawn_order_picking(model, *id, "product_uom_qty")?;
                    let record = self.record_mut(model, *id)?;
                    record.insert("state".to_string(), json!("sale"));
                }
                Ok(json!(true))
            }
            ("stock.scrap", "action_validate") => {
                for id in &ids {
                    let record = self.record_mut(model, *id)?;
                    record.insert("state".to_string(), json!("done"));
                }
                Ok(json!(true))
            }
            (model, method) => Err(GatewayError::RemoteCall {
                model: model.to_string(),
                method: method.to_string(),
                message: "method not emulated".to_string(),
            }),
        }
    }
}
