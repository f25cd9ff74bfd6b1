//! # Ascent
//!
//! Vanilla Policy Gradient (VPG) with GAE-Lambda advantage estimation.
//!
//! Ascent implements the classic on-policy policy-gradient loop: collect a
//! fixed number of timesteps per epoch into a rollout buffer, compute
//! advantages and reward-to-go targets per trajectory with GAE-Lambda, then
//! take one policy gradient step and several value-regression steps.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ascent_rl::env::cartpole::CartPole;
//! use ascent_rl::learner::{vpg::DiscreteVpg, LearnerConfig};
//! use ascent_rl::train::vpg::{Trainer, VpgConfig};
//! use ascent_rl::utils::stats::MetricTally;
//!
//! let env = CartPole::seeded(0);
//! let learner = DiscreteVpg::new(4, 2, LearnerConfig::default());
//! let config = VpgConfig::new().steps_per_epoch(4000).epochs(50);
//!
//! let mut trainer = Trainer::new(config, env, learner).unwrap();
//! let mut tally = MetricTally::new();
//! trainer.run(&mut tally).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Environment trait and built-in environments
pub mod env;

/// Learner trait and the VPG actor-critic implementation
pub mod learner;

/// Rollout buffer and advantage computation
pub mod buffer;

/// Training loop orchestration
pub mod train;

/// Statistics utilities and per-epoch reporting
pub mod utils;

/// Current version of ascent-rl
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.0");
    }
}
