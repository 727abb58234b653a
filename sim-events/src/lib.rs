//! Governed event envelope and the transaction-log emitter.

pub mod emitter;
pub mod envelope;

pub use emitter::{EnterpriseContext, EventEmitter, EventError, OrderContext};
pub use envelope::{duration_ms, BottleResult, Event, EventBody};
