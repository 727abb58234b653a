//! The bottling line's state machine: schedule execution, per-bottle
//! processing, and the stochastic models behind microstops, breakdowns,
//! changeovers, and CIP.

pub mod engine;
pub mod error;
pub mod rng;

pub use engine::{EngineConfig, LineEngine};
pub use error::EngineError;
pub use rng::SimRng;
