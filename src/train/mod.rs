//! Training loop orchestration

pub mod vpg;

pub use vpg::{EpochSummary, Trainer, VpgConfig};
