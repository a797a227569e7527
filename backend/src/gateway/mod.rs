//! Inventory system gateway
//!
//! The simulation core drives the external inventory system only through the
//! [`InventoryGateway`] trait: authenticate, search-read, create, write, and
//! named workflow calls with an optional company scope. Transport concerns
//! (HTTP, retries, backoff, pagination) belong to gateway implementations,
//! not to the core; the core treats any gateway failure during an operation
//! as "operation failed, do not touch the ledger".
//!
//! Records and search domains are `serde_json` values, mirroring the wire
//! shape of a JSON-RPC backend without committing to one.

pub mod memory;

pub use memory::{InMemoryGateway, ValidateFollowup};

use serde_json::{json, Map, Value};
use thiserror::Error;

/// One remote record, as returned by `search_read`.
pub type Record = Map<String, Value>;

/// Gateway failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("remote call {model}.{method} failed: {message}")]
    RemoteCall {
        model: String,
        method: String,
        message: String,
    },

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("record not found: {model} id {id}")]
    RecordNotFound { model: String, id: i64 },

    #[error("unsupported done-quantity field on stock.move.line; expected `qty_done` or `quantity`")]
    UnsupportedDoneField,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Company override attached to scoped calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompanyScope {
    pub company_id: i64,
}

impl CompanyScope {
    pub fn new(company_id: i64) -> Self {
        Self { company_id }
    }
}

/// Minimal capability surface of the external inventory system.
pub trait InventoryGateway {
    fn authenticate(&mut self) -> Result<(), GatewayError>;

    /// `domain` is a JSON array of `[field, operator, value]` triples, all of
    /// which must match (conjunction).
    fn search_read(
        &mut self,
        model: &str,
        domain: &Value,
        fields: &[&str],
        limit: Option<usize>,
        order: Option<&str>,
        scope: Option<CompanyScope>,
    ) -> Result<Vec<Record>, GatewayError>;

    fn create(
        &mut self,
        model: &str,
        values: Value,
        scope: Option<CompanyScope>,
    ) -> Result<i64, GatewayError>;

    fn write(
        &mut self,
        model: &str,
        ids: &[i64],
        values: Value,
        scope: Option<CompanyScope>,
    ) -> Result<(), GatewayError>;

    /// Invoke a named remote method (workflow actions, capability probes,
    /// backorder cancellation) with positional args, keyword args, and an
    /// optional execution context.
    fn call(
        &mut self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
        context: Option<Value>,
        scope: Option<CompanyScope>,
    ) -> Result<Value, GatewayError>;
}

/// Field name for the done quantity on operation lines. Deployments differ:
/// older backends call it `qty_done`, newer ones `quantity`. Resolved once
/// per run via [`resolve_done_quantity_field`] and cached by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneQuantityField {
    QtyDone,
    Quantity,
}

impl DoneQuantityField {
    pub fn name(&self) -> &'static str {
        match self {
            DoneQuantityField::QtyDone => "qty_done",
            DoneQuantityField::Quantity => "quantity",
        }
    }
}

/// Capability probe: ask the backend which done-quantity field its operation
/// lines carry. Neither known variant being present is fatal for the run.
pub fn resolve_done_quantity_field<G: InventoryGateway + ?Sized>(
    gateway: &mut G,
) -> Result<DoneQuantityField, GatewayError> {
    let fields = gateway.call(
        "stock.move.line",
        "fields_get",
        json!([[]]),
        json!({"attributes": ["type"]}),
        None,
        None,
    )?;
    let has = |name: &str| fields.get(name).is_some();
    if has("qty_done") {
        Ok(DoneQuantityField::QtyDone)
    } else if has("quantity") {
        Ok(DoneQuantityField::Quantity)
    } else {
        Err(GatewayError::UnsupportedDoneField)
    }
}

/// Probe the set of fields available on a model (cached by the caller).
/// Some backends expose warehouse attribution on moves; we set it only when
/// the field exists.
pub fn probe_model_fields<G: InventoryGateway + ?Sized>(
    gateway: &mut G,
    model: &str,
) -> Result<std::collections::HashSet<String>, GatewayError> {
    let fields = gateway.call(
        model,
        "fields_get",
        json!([[]]),
        json!({"attributes": ["type"]}),
        None,
        None,
    )?;
    Ok(fields
        .as_object()
        .map(|m| m.keys().cloned().collect())
        .unwrap_or_default())
}

/// Read an i64 out of a record field, tolerating the `[id, display_name]`
/// pair shape relational fields come back as.
pub fn record_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::Array(pair) => pair.first().and_then(Value::as_i64),
        _ => None,
    }
}

/// Read an f64 out of a record field, treating null/absent as 0.0.
pub fn record_f64(record: &Record, field: &str) -> f64 {
    record.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_accepts_plain_and_pair() {
        assert_eq!(record_id(&json!(42)), Some(42));
        assert_eq!(record_id(&json!([42, "Receipts"])), Some(42));
        assert_eq!(record_id(&json!("42")), None);
        assert_eq!(record_id(&json!(null)), None);
    }

    #[test]
    fn test_record_f64_defaults_to_zero() {
        let mut rec = Record::new();
        rec.insert("qty".to_string(), json!(12.5));
        assert_eq!(record_f64(&rec, "qty"), 12.5);
        assert_eq!(record_f64(&rec, "missing"), 0.0);
        rec.insert("null_qty".to_string(), json!(null));
        assert_eq!(record_f64(&rec, "null_qty"), 0.0);
    }

    #[test]
    fn test_done_field_names() {
        assert_eq!(DoneQuantityField::QtyDone.name(), "qty_done");
        assert_eq!(DoneQuantityField::Quantity.name(), "quantity");
    }
}
