//! Synthetic inventory movement simulation core.
//!
//! Generates a date-ordered history of warehouse operations (supplier
//! receipts, internal redistributions, damage write-offs, customer
//! shipments) and, in order mode, purchase/sales orders with deferred stock
//! effects, against an external inventory system reached through the
//! [`gateway::InventoryGateway`] trait.
//!
//! # Critical Invariants
//!
//! 1. Determinism: every random decision flows through one seeded
//!    [`RngManager`] per (dataset key, company, stream); identical inputs
//!    produce identical output, byte for byte.
//! 2. Idempotency: operations carry deterministic origin keys, and re-runs
//!    find and replay existing records instead of duplicating them.
//! 3. The [`StockLedger`] is mutated only after the external system confirms
//!    an operation (or immediately in dry-run mode).

pub mod anomalies;
pub mod core;
pub mod demand;
pub mod gateway;
pub mod generators;
pub mod ledger;
pub mod models;
pub mod orchestrator;
pub mod profiles;
pub mod reporting;
pub mod rng;
pub mod scheduler;

pub use crate::core::calendar::HorizonCalendar;
pub use gateway::{InMemoryGateway, InventoryGateway};
pub use ledger::StockLedger;
pub use models::{
    AnomalyEvent, AnomalyKind, Category, Company, LocationRole, MovementKind, Product,
    SimulationContext, Warehouse,
};
pub use orchestrator::{MovementEngine, RunConfig, Scale, SeedMode, SeederError};
pub use reporting::RunSummary;
pub use rng::RngManager;
pub use scheduler::{OrderSeeder, OrderStats};
