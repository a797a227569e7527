//! Movement operation types and report rows.

use crate::models::product::{Category, Product};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of warehouse movement operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementKind {
    /// Supplier receipt into a good location
    Inbound,
    /// Two-hop redistribution between good locations via transit
    Internal,
    /// Write-off from a good location into a damaged location
    Damage,
    /// Customer shipment out of a good location
    Outbound,
}

impl MovementKind {
    /// Short code used in origin keys, counters, and report rows.
    pub fn code(&self) -> &'static str {
        match self {
            MovementKind::Inbound => "IN",
            MovementKind::Internal => "INT",
            MovementKind::Damage => "DMG",
            MovementKind::Outbound => "OUT",
        }
    }

    /// Whether committed quantity is capped by source availability.
    /// Inbound/internal/damage commit what they request; only outbound is
    /// availability-capped (the stockout/backorder mechanism).
    pub fn capped_by_availability(&self) -> bool {
        matches!(self, MovementKind::Outbound)
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One (product, requested quantity) pair inside a proposed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementLine {
    pub product: Product,
    pub qty_requested: f64,
}

impl MovementLine {
    pub fn new(product: Product, qty_requested: f64) -> Self {
        Self {
            product,
            qty_requested,
        }
    }
}

/// Report row: one generated operation header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickingRow {
    pub origin: String,
    pub company: String,
    pub warehouse: String,
    pub kind: String,
    pub scheduled_date: String,
    pub source_location_id: i64,
    pub dest_location_id: i64,
    pub lines: usize,
    pub note: String,
}

/// Report row: one generated operation line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRow {
    pub origin: String,
    pub company: String,
    pub warehouse: String,
    pub kind: String,
    pub scheduled_date: String,
    pub product: String,
    pub product_name: String,
    pub category: Category,
    pub qty_requested: f64,
    pub qty_done: f64,
    pub uom: String,
    pub source_location_id: i64,
    pub dest_location_id: i64,
    pub note: String,
}
