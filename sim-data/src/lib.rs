//! Static reference data: SKU catalog, built-in production schedule,
//! microstop catalog, breakdown catalog.
//!
//! This crate is a deliberate external collaborator to the line engine: it
//! holds no state and performs no simulation, only lookups over compiled-in
//! tables.

pub mod breakdown;
pub mod microstop;
pub mod schedule;
pub mod sku;

pub use breakdown::BreakdownCode;
pub use microstop::Microstop;
pub use schedule::{ChangeoverKind, ChangeoverSpec, OrderEntry, ScheduleEntry};
pub use sku::{Sku, SKU_LIST};
