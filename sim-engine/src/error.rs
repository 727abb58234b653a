//! Engine-level errors. Anything that surfaces here is fatal: the only
//! failure mode the engine can hit mid-run is the transaction log's
//! underlying disk write failing (see `SPEC_FULL.md` §5).

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("transaction log emission failed: {0}")]
    Event(#[from] sim_events::EventError),
}
