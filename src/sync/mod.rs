//! Line synchronization.
//!
//! The strategies ([`placer`], [`heuristic`] and the transcript aligner),
//! the validator that repairs their output, the [`orchestrator`] that picks
//! between them and the async [`job`] wrapper that gathers their inputs.

pub mod heuristic;
pub mod job;
pub mod orchestrator;
pub mod placer;
pub mod validate;

pub use heuristic::HeuristicTimingEstimator;
pub use job::{SyncRequest, Synchronizer};
pub use orchestrator::{
    AttemptOutcome, Capabilities, StrategyAttempt, SyncInputs, SyncOutcome, SynchronizationOrchestrator,
};
pub use placer::SegmentTimingPlacer;
pub use validate::TimingValidator;
