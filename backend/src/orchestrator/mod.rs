//! Idempotent picking orchestration
//!
//! Run configuration, the submit protocol types, and the [`MovementEngine`]
//! that drives the external system through the create/validate flow.
//!
//! # Critical Invariants
//!
//! 1. Origin keys are deterministic functions of (dataset key, company,
//!    warehouse, kind, day, sequence); re-running with the same dataset key
//!    finds existing pickings instead of duplicating them.
//! 2. The ledger is mutated only after external validation succeeds (or
//!    immediately in dry-run mode). A failed operation never touches it.
//! 3. Outbound committed quantity is capped at pre-operation availability;
//!    inbound/internal/damage commit what they request.

pub mod engine;

pub use engine::MovementEngine;

use crate::gateway::GatewayError;
use crate::models::company::LocationRole;
use crate::models::movement::{MovementKind, MovementLine};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Deployment scale, controlling overall activity volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    Small,
    Medium,
    Large,
}

impl Scale {
    /// Upper bound on sales orders placed per day in order mode.
    pub fn daily_order_volume(&self) -> i64 {
        match self {
            Scale::Small => 5,
            Scale::Medium => 20,
            Scale::Large => 100,
        }
    }
}

impl FromStr for Scale {
    type Err = SeederError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(Scale::Small),
            "medium" => Ok(Scale::Medium),
            "large" => Ok(Scale::Large),
            other => Err(SeederError::InvalidConfig(format!(
                "scale must be small|medium|large, got `{other}`"
            ))),
        }
    }
}

/// Which top-level mode a run uses, per movement type mutually exclusive but
/// composable across a horizon split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedMode {
    /// Day-by-day movement generators only
    Movements,
    /// Purchase/sales orders with deferred receipt/delivery only
    Orders,
    /// The first `movement_days` of the horizon in movement mode, the rest
    /// in order mode
    Split { movement_days: usize },
}

/// One run's configuration, validated before any external call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub days: usize,
    pub scale: Scale,
    pub dataset_key: String,
    pub mode: SeedMode,
    pub dry_run: bool,
    /// Last simulated day, inclusive
    pub end_date: NaiveDate,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), SeederError> {
        if self.days == 0 {
            return Err(SeederError::InvalidConfig(
                "horizon must cover at least one day".to_string(),
            ));
        }
        if self.dataset_key.is_empty() {
            return Err(SeederError::InvalidConfig(
                "dataset key must not be empty".to_string(),
            ));
        }
        if let SeedMode::Split { movement_days } = self.mode {
            if movement_days == 0 || movement_days >= self.days {
                return Err(SeederError::InvalidConfig(format!(
                    "split movement days must be in 1..{}, got {}",
                    self.days, movement_days
                )));
            }
        }
        Ok(())
    }
}

/// Seeder failures.
#[derive(Debug, Error)]
pub enum SeederError {
    #[error("invalid run configuration: {0}")]
    InvalidConfig(String),

    #[error("no {role:?} locations for warehouse {warehouse}")]
    MissingLocations {
        warehouse: String,
        role: LocationRole,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// One proposed operation, handed to the orchestrator by a generator.
#[derive(Debug, Clone)]
pub struct PickingRequest {
    pub warehouse_code: String,
    pub warehouse_id: i64,
    pub kind: MovementKind,
    pub day: NaiveDate,
    pub picking_type_id: i64,
    pub partner_id: Option<i64>,
    pub src_loc: i64,
    pub dst_loc: i64,
    pub lines: Vec<MovementLine>,
    pub note: String,
}

/// Terminal state of one submitted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Created, validated, and applied to the ledger
    Created,
    /// Found by origin key; its recorded fulfillment was replayed
    Existing,
    /// Abandoned before creation: total committed quantity was zero
    SkippedNoQty,
    /// A gateway call failed; abandoned without ledger mutation
    Failed,
}

impl SubmitOutcome {
    /// Whether the operation's stock effect is reflected in the ledger.
    pub fn applied(&self) -> bool {
        matches!(self, SubmitOutcome::Created | SubmitOutcome::Existing)
    }
}
