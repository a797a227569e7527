//! Domain types for the inventory seeder.

pub mod anomaly;
pub mod company;
pub mod context;
pub mod movement;
pub mod product;
pub mod profile;

pub use anomaly::{AnomalyEvent, AnomalyKind};
pub use company::{Company, LocationRole, Warehouse};
pub use context::SimulationContext;
pub use movement::{MovementKind, MovementLine, MoveRow, PickingRow};
pub use product::{Category, Product};
pub use profile::{SizeClass, WarehouseProfile};
