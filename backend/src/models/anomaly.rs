//! Injected anomaly events
//!
//! Anomalies are decided at the start of a company-run, recorded here, and
//! surfaced in the run output for operator review. Generators read the
//! anomaly state from the simulation context; this type is the audit record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of injected anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    /// Outbound demand multiplied ~2.5x on flagged single days
    DemandSpike,
    /// Damage rate multiplied ~6x at one warehouse over a contiguous window
    ShrinkageEvent,
    /// Demand up ~2.8x / inbound supply cut ~65% for a product subset
    ControlledStockout,
    /// Supplier lead times extended over a contiguous window
    SupplierDelay,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnomalyKind::DemandSpike => "demand_spike",
            AnomalyKind::ShrinkageEvent => "shrinkage_event",
            AnomalyKind::ControlledStockout => "controlled_stockout",
            AnomalyKind::SupplierDelay => "supplier_delay",
        };
        f.write_str(s)
    }
}

/// One recorded anomaly with its active window and human-readable detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub kind: AnomalyKind,
    pub company: String,
    /// Window start (or the single affected day)
    pub date: NaiveDate,
    /// Window end, inclusive; None for single-day anomalies
    pub end_date: Option<NaiveDate>,
    pub detail: String,
}

impl AnomalyEvent {
    /// Whether `day` falls inside this anomaly's active window.
    pub fn covers(&self, day: NaiveDate) -> bool {
        match self.end_date {
            Some(end) => day >= self.date && day <= end,
            None => day == self.date,
        }
    }
}
